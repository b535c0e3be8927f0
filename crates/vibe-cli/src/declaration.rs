//! Declaration files: a serialized `FunctionDeclaration` plus the custom
//! types its annotations may name.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use vibe_core::{ContextSource, FunctionDeclaration, TypeRegistry};
use vibe_runtime::{Orchestrator, VibeConfig};

#[derive(Debug, Deserialize)]
pub struct DeclarationFile {
    #[serde(flatten)]
    pub declaration: FunctionDeclaration,

    /// Type name to definition source
    #[serde(default)]
    pub types: TypeRegistry,
}

impl DeclarationFile {
    /// Read a declaration file. A relative context path is resolved against
    /// the file's directory.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read declaration file {}", path.display()))?;
        let mut file: Self = serde_json::from_str(&text)
            .with_context(|| format!("invalid declaration file {}", path.display()))?;

        let relative_context = match file.declaration.context() {
            Some(ContextSource::File(context)) if context.is_relative() => Some(context.clone()),
            _ => None,
        };
        if let (Some(context), Some(base)) = (relative_context, path.parent()) {
            file.declaration = file
                .declaration
                .with_context(ContextSource::File(base.join(context)));
        }

        Ok(file)
    }

    pub fn orchestrator(&self, config: &VibeConfig) -> anyhow::Result<Orchestrator> {
        let orchestrator = Orchestrator::from_config(config.clone())
            .context("failed to set up the orchestrator")?;
        Ok(orchestrator.with_type_registry(self.types.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parses_declaration_with_types() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "name": "length",
                "params": [{{"name": "head", "annotation": "Node"}}],
                "returns": "int",
                "docstring": "Count nodes.",
                "types": {{"Node": "Node = {{value: int, next: Node or nil}}"}}
            }}"#
        )
        .unwrap();

        let parsed = DeclarationFile::load(file.path()).unwrap();
        assert_eq!(parsed.declaration.name(), "length");
        assert_eq!(parsed.declaration.params().len(), 1);
        assert!(parsed.types.resolve("Node").is_some());
    }

    #[test]
    fn test_relative_context_resolves_against_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decl.json");
        std::fs::write(
            &path,
            r#"{"name": "f", "docstring": "Doc.", "context": {"kind": "file", "value": "helpers.vibe"}}"#,
        )
        .unwrap();

        let parsed = DeclarationFile::load(&path).unwrap();
        assert_eq!(
            parsed.declaration.context(),
            Some(&ContextSource::File(dir.path().join("helpers.vibe")))
        );
    }

    #[test]
    fn test_reports_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"name\": ").unwrap();
        let err = DeclarationFile::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("invalid declaration file"));
    }
}
