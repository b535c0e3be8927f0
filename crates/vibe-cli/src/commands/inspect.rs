//! `vibe key` and `vibe prompt`

use std::path::Path;

use vibe_cache::FileCacheStore;
use vibe_runtime::VibeConfig;

use crate::declaration::DeclarationFile;

pub fn key(config: &VibeConfig, file: &Path) -> anyhow::Result<()> {
    let decl_file = DeclarationFile::load(file)?;
    let orchestrator = decl_file.orchestrator(config)?;
    let (identity, key) = orchestrator.identify(&decl_file.declaration)?;
    let path = FileCacheStore::new(&config.cache_dir).entry_path(&identity.name, &key);

    println!("function:  {}{}", identity.name, identity.signature);
    println!("policy:    {}", config.key_policy);
    println!("key:       {key}");
    println!("path:      {}", path.display());
    println!("cached:    {}", if path.is_file() { "yes" } else { "no" });
    Ok(())
}

pub fn prompt(config: &VibeConfig, file: &Path) -> anyhow::Result<()> {
    let decl_file = DeclarationFile::load(file)?;
    let orchestrator = decl_file.orchestrator(config)?;
    println!("{}", orchestrator.prompt(&decl_file.declaration)?);
    Ok(())
}
