//! Function declarations: the caller-built description of a function to generate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// One declared parameter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name, must be an identifier.
    pub name: String,
    /// Type annotation text, e.g. `int` or `list[Node]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    /// Default value text, e.g. `0` or `"guest"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotation: None,
            default: None,
        }
    }

    pub fn typed(name: impl Into<String>, annotation: impl Into<String>) -> Self {
        Self::new(name).with_annotation(annotation)
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Source text of a custom type the function refers to.
///
/// The text is shown to the generator as-is; it is never executed.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub name: String,
    pub source: String,
}

impl TypeDefinition {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}

/// Where the surrounding declarations of a function come from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ContextSource {
    /// Context text supplied directly.
    Inline(String),
    /// Read the whole file when the identity is extracted.
    File(PathBuf),
}

/// A function declared without a body.
///
/// Built once with the `with_*` methods and then only read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    name: String,
    #[serde(default)]
    params: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    returns: Option<String>,
    docstring: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    custom_types: BTreeSet<TypeDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<ContextSource>,
}

impl FunctionDeclaration {
    pub fn new(name: impl Into<String>, docstring: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: None,
            docstring: docstring.into(),
            custom_types: BTreeSet::new(),
            context: None,
        }
    }

    pub fn with_param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_params(mut self, params: impl IntoIterator<Item = Parameter>) -> Self {
        self.params.extend(params);
        self
    }

    pub fn with_returns(mut self, annotation: impl Into<String>) -> Self {
        self.returns = Some(annotation.into());
        self
    }

    pub fn with_custom_type(mut self, definition: TypeDefinition) -> Self {
        self.custom_types.insert(definition);
        self
    }

    pub fn with_context(mut self, context: ContextSource) -> Self {
        self.context = Some(context);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn returns(&self) -> Option<&str> {
        self.returns.as_deref()
    }

    pub fn docstring(&self) -> &str {
        &self.docstring
    }

    pub fn custom_types(&self) -> &BTreeSet<TypeDefinition> {
        &self.custom_types
    }

    pub fn context(&self) -> Option<&ContextSource> {
        self.context.as_ref()
    }

    /// Number of parameters without a default value.
    pub fn required_arity(&self) -> usize {
        self.params.iter().filter(|p| p.default.is_none()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_fields() {
        let decl = FunctionDeclaration::new("fib", "Return the nth Fibonacci number.")
            .with_param(Parameter::typed("n", "int"))
            .with_returns("int");
        assert_eq!(decl.name(), "fib");
        assert_eq!(decl.params().len(), 1);
        assert_eq!(decl.returns(), Some("int"));
        assert_eq!(decl.required_arity(), 1);
    }

    #[test]
    fn custom_types_are_a_set() {
        let node = TypeDefinition::new("Node", "record Node { value, next }");
        let decl = FunctionDeclaration::new("walk", "Walk the list.")
            .with_custom_type(node.clone())
            .with_custom_type(node);
        assert_eq!(decl.custom_types().len(), 1);
    }

    #[test]
    fn defaults_reduce_required_arity() {
        let decl = FunctionDeclaration::new("greet", "Greet someone.")
            .with_param(Parameter::new("name"))
            .with_param(Parameter::new("greeting").with_default("\"Hello\""));
        assert_eq!(decl.required_arity(), 1);
        assert_eq!(decl.params().len(), 2);
    }

    #[test]
    fn declaration_serde() {
        let decl = FunctionDeclaration::new("fib", "Return the nth Fibonacci number.")
            .with_param(Parameter::typed("n", "int"))
            .with_context(ContextSource::Inline("let LIMIT = 10".into()));
        let json = serde_json::to_string(&decl).unwrap();
        let restored: FunctionDeclaration = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, decl);
    }

    #[test]
    fn minimal_json_declaration() {
        let decl: FunctionDeclaration =
            serde_json::from_str(r#"{"name": "greet", "docstring": "Say hi."}"#).unwrap();
        assert!(decl.params().is_empty());
        assert!(decl.context().is_none());
    }
}
