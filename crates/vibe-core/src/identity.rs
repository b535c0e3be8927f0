//! Identity extraction: turns a declaration into the normalized text that
//! keys the cache and feeds the prompt.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

use crate::declaration::{ContextSource, FunctionDeclaration, Parameter};
use crate::error::{IdentityError, IdentityResult};
use crate::normalize::{clean_docstring, identifiers, is_identifier, normalize_type_text};

/// Annotation names that never have a definition to look up.
const PRIMITIVES: &[&str] = &[
    "any", "Any", "bool", "bytes", "Callable", "dict", "Dict", "f64", "float", "fn", "i64", "int",
    "list", "List", "map", "Map", "nil", "None", "number", "object", "Option", "Optional", "set",
    "Set", "str", "string", "String", "tuple", "Tuple", "Union", "Vec", "void",
];

/// Definitions of custom types the caller can make visible to generation.
///
/// Lookups that miss are not errors; see [`IdentityExtractor::extract`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRegistry {
    definitions: BTreeMap<String, String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.register(name, source);
        self
    }

    pub fn register(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.definitions.insert(name.into(), source.into());
    }

    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.definitions.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Normalized identity of a declaration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityDescriptor {
    /// Declared function name.
    pub name: String,
    /// Canonical signature text, e.g. `(n: int, step: int = 1) -> int`.
    pub signature: String,
    /// Cleaned docstring.
    pub docstring: String,
    /// Definition text of every custom type the declaration reaches.
    pub custom_types: BTreeSet<String>,
    /// Enclosing context text, empty when there is none.
    pub context: String,
    /// Parameter names in declaration order.
    pub param_names: Vec<String>,
    /// Parameters without defaults.
    pub required_arity: usize,
}

impl IdentityDescriptor {
    /// `fn name(signature)` header as shown to the generator.
    pub fn header(&self) -> String {
        format!("fn {}{}", self.name, self.signature)
    }
}

/// Derives [`IdentityDescriptor`]s from declarations.
pub struct IdentityExtractor<'a> {
    registry: &'a TypeRegistry,
}

impl<'a> IdentityExtractor<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self { registry }
    }

    /// Validate a declaration and build its identity.
    ///
    /// Unresolvable custom types and unreadable context files are skipped
    /// rather than reported.
    pub fn extract(&self, decl: &FunctionDeclaration) -> IdentityResult<IdentityDescriptor> {
        validate(decl)?;

        let docstring = clean_docstring(decl.docstring());
        if docstring.is_empty() {
            return Err(IdentityError::MissingDocstring(decl.name().to_string()));
        }

        Ok(IdentityDescriptor {
            name: decl.name().to_string(),
            signature: render_signature(decl.params(), decl.returns()),
            docstring,
            custom_types: self.collect_custom_types(decl),
            context: read_context(decl),
            param_names: decl.params().iter().map(|p| p.name.clone()).collect(),
            required_arity: decl.required_arity(),
        })
    }

    fn collect_custom_types(&self, decl: &FunctionDeclaration) -> BTreeSet<String> {
        let mut sources: BTreeSet<String> = decl
            .custom_types()
            .iter()
            .map(|t| t.source.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let annotations = decl
            .params()
            .iter()
            .filter_map(|p| p.annotation.as_deref())
            .chain(decl.returns());

        let mut seen = HashSet::new();
        for annotation in annotations {
            let normalized = normalize_type_text(annotation);
            for name in identifiers(&normalized) {
                if PRIMITIVES.contains(&name) || !seen.insert(name.to_string()) {
                    continue;
                }
                match self.registry.resolve(name) {
                    Some(source) if !source.trim().is_empty() => {
                        sources.insert(source.trim().to_string());
                    }
                    _ => {
                        debug!(function = decl.name(), type_name = name, "no definition for custom type, skipping");
                    }
                }
            }
        }

        sources
    }
}

fn validate(decl: &FunctionDeclaration) -> IdentityResult<()> {
    if !is_identifier(decl.name()) {
        return Err(IdentityError::InvalidName(decl.name().to_string()));
    }

    let mut names = HashSet::new();
    let mut seen_default = false;
    for param in decl.params() {
        if !is_identifier(&param.name) {
            return Err(IdentityError::InvalidParameter {
                function: decl.name().to_string(),
                parameter: param.name.clone(),
            });
        }
        if !names.insert(param.name.as_str()) {
            return Err(IdentityError::DuplicateParameter {
                function: decl.name().to_string(),
                parameter: param.name.clone(),
            });
        }
        if param.default.is_some() {
            seen_default = true;
        } else if seen_default {
            return Err(IdentityError::DefaultOrder {
                function: decl.name().to_string(),
                parameter: param.name.clone(),
            });
        }
    }

    Ok(())
}

/// Canonical `(a: T, b: U = d) -> R` text.
pub fn render_signature(params: &[Parameter], returns: Option<&str>) -> String {
    let rendered: Vec<String> = params
        .iter()
        .map(|p| {
            let mut text = p.name.clone();
            if let Some(annotation) = p.annotation.as_deref() {
                let annotation = normalize_type_text(annotation);
                if !annotation.is_empty() {
                    text.push_str(": ");
                    text.push_str(&annotation);
                }
            }
            if let Some(default) = p.default.as_deref() {
                text.push_str(" = ");
                text.push_str(&normalize_type_text(default));
            }
            text
        })
        .collect();

    let mut signature = format!("({})", rendered.join(", "));
    if let Some(returns) = returns {
        let returns = normalize_type_text(returns);
        if !returns.is_empty() {
            signature.push_str(" -> ");
            signature.push_str(&returns);
        }
    }
    signature
}

fn read_context(decl: &FunctionDeclaration) -> String {
    match decl.context() {
        None => String::new(),
        Some(ContextSource::Inline(text)) => text.clone(),
        Some(ContextSource::File(path)) => match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                debug!(function = decl.name(), path = %path.display(), error = %e, "context file unavailable, using empty context");
                String::new()
            }
        },
    }
}
