//! `vibe run`

use std::path::Path;

use anyhow::Context;
use tracing::{debug, info, warn};
use vibe_core::FunctionDeclaration;
use vibe_runtime::{Orchestrator, VibeConfig};
use vibe_script::{CodeLoader, Module, Value};

use crate::declaration::DeclarationFile;

/// Materialize the declaration in `file`, call it with `raw_args` and print
/// the result as JSON.
pub async fn execute(config: &VibeConfig, file: &Path, raw_args: &[String]) -> anyhow::Result<()> {
    let decl_file = DeclarationFile::load(file)?;
    let orchestrator = decl_file.orchestrator(config)?;
    let decl = &decl_file.declaration;

    let args: Vec<Value> = raw_args.iter().map(String::as_str).map(parse_arg).collect();

    let module = Module::shared(decl.name());
    load_context(&orchestrator, decl, &module)?;

    let artifact = orchestrator
        .materialize(decl, &module)
        .await
        .with_context(|| format!("could not materialize '{}'", decl.name()))?;
    info!(
        function = decl.name(),
        key = artifact.key.short(),
        resolution = %artifact.resolution,
        persisted = artifact.persisted,
        "Function ready"
    );

    let result = artifact
        .call(&args)
        .with_context(|| format!("calling '{}' failed", decl.name()))?;
    let json = result.to_json().context("result cannot be shown as JSON")?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

/// JSON when it parses, otherwise the raw text as a string.
fn parse_arg(raw: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => Value::from_json(&json),
        Err(_) => {
            debug!(argument = raw, "argument is not JSON, passing it as a string");
            Value::Str(raw.to_string())
        }
    }
}

/// Context that is valid vibescript is loaded into the module, so generated
/// code can call the helpers it was shown. Prose context only feeds the prompt.
fn load_context(
    orchestrator: &Orchestrator,
    decl: &FunctionDeclaration,
    module: &Module,
) -> anyhow::Result<()> {
    let (identity, _) = orchestrator.identify(decl)?;
    if identity.context.trim().is_empty() {
        return Ok(());
    }

    match CodeLoader::new(orchestrator.config().limits()).load_items(&identity.context, module) {
        Ok(names) => debug!(function = decl.name(), bindings = ?names, "Loaded context into module"),
        Err(err) => warn!(
            function = decl.name(),
            error = %err,
            "Context is not loadable vibescript; using it for the prompt only"
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arg() {
        assert_eq!(parse_arg("10"), Value::Int(10));
        assert_eq!(parse_arg("\"Ada\""), Value::from("Ada"));
        assert_eq!(parse_arg("Ada"), Value::from("Ada"));
        assert_eq!(
            parse_arg("[1, 2.5]"),
            Value::list(vec![Value::Int(1), Value::Float(2.5)])
        );
    }
}
