//! `vibe cache` commands

use anyhow::{anyhow, bail};
use clap::Subcommand;
use vibe_cache::FileCacheStore;
use vibe_core::CacheKey;
use vibe_runtime::VibeConfig;

/// Cache subcommands
#[derive(Subcommand)]
pub enum CacheCommands {
    /// List cached functions
    List,

    /// Remove a cached function so the next call regenerates it
    Evict {
        /// Function name
        name: String,

        /// Cache key, or an unambiguous prefix of it
        key: String,
    },
}

/// Execute a cache command
pub fn execute(command: CacheCommands, config: &VibeConfig) -> anyhow::Result<()> {
    let store = FileCacheStore::new(&config.cache_dir);

    match command {
        CacheCommands::List => {
            let entries = store.entries()?;
            if entries.is_empty() {
                println!("No cached functions in {}", store.dir().display());
                return Ok(());
            }
            for entry in entries {
                println!(
                    "{:<24} {}  {:>8} B  {}",
                    entry.name,
                    entry.key.short(),
                    entry.size_bytes,
                    entry.path.display()
                );
            }
            Ok(())
        }
        CacheCommands::Evict { name, key } => {
            let key = match CacheKey::parse(&key) {
                Some(key) => key,
                None => resolve_prefix(&store, &name, &key)?,
            };
            if store.evict(&name, &key)? {
                println!("Evicted {name} ({})", key.short());
            } else {
                println!("No cached entry for {name} ({})", key.short());
            }
            Ok(())
        }
    }
}

fn resolve_prefix(store: &FileCacheStore, name: &str, prefix: &str) -> anyhow::Result<CacheKey> {
    if prefix.is_empty() {
        bail!("cache key must not be empty");
    }
    let mut matches = store
        .entries()?
        .into_iter()
        .filter(|entry| entry.name == name && entry.key.as_str().starts_with(prefix));

    let first = matches
        .next()
        .ok_or_else(|| anyhow!("no cached entry for '{name}' matches key '{prefix}'"))?;
    if matches.next().is_some() {
        bail!("key prefix '{prefix}' matches more than one entry for '{name}'");
    }
    Ok(first.key)
}
