//! Property tests: cache keys are deterministic, sensitive to intent, and
//! blind to formatting noise.

use proptest::prelude::*;
use vibe_core::*;

fn key_for(decl: &FunctionDeclaration, registry: &TypeRegistry, policy: KeyPolicy) -> CacheKey {
    let identity = IdentityExtractor::new(registry)
        .extract(decl)
        .expect("declaration is valid");
    CacheKeyDeriver::new(policy).derive(&identity)
}

fn arb_policy() -> impl Strategy<Value = KeyPolicy> {
    prop_oneof![
        Just(KeyPolicy::SignatureDocstring),
        Just(KeyPolicy::NameSignatureDocstring),
        Just(KeyPolicy::FullIdentity),
    ]
}

fn arb_annotation() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("int".to_string()),
        Just("list[int]".to_string()),
        Just("Dict[str, list[Node]]".to_string()),
        Just("Node".to_string()),
    ]
}

/// Same tokens with extra spaces wherever whitespace is insignificant.
fn spaced(annotation: &str) -> String {
    annotation
        .replace('[', " [ ")
        .replace(']', " ] ")
        .replace(',', "  ,   ")
}

proptest! {
    #[test]
    fn identical_declarations_share_a_key(
        name in "[a-z_][a-z0-9_]{0,12}",
        doc in "[A-Za-z][A-Za-z .,]{0,60}",
        annotation in arb_annotation(),
        policy in arb_policy(),
    ) {
        let registry = TypeRegistry::new().with_type("Node", "record Node { value, next }");
        let a = FunctionDeclaration::new(name.clone(), doc.clone())
            .with_param(Parameter::typed("x", annotation.clone()));
        let b = FunctionDeclaration::new(name, doc)
            .with_param(Parameter::typed("x", annotation));
        prop_assert_eq!(key_for(&a, &registry, policy), key_for(&b, &registry, policy));
    }

    #[test]
    fn docstring_edit_changes_key(
        doc in "[A-Za-z][A-Za-z ]{0,40}",
        suffix in "[A-Za-z]{1,8}",
        policy in arb_policy(),
    ) {
        let registry = TypeRegistry::new();
        let a = FunctionDeclaration::new("f", doc.clone());
        let b = FunctionDeclaration::new("f", format!("{doc} {suffix}"));
        prop_assert_ne!(key_for(&a, &registry, policy), key_for(&b, &registry, policy));
    }

    #[test]
    fn annotation_whitespace_is_ignored(
        annotation in arb_annotation(),
        policy in arb_policy(),
    ) {
        let registry = TypeRegistry::new().with_type("Node", "record Node { value, next }");
        let a = FunctionDeclaration::new("f", "Doc.")
            .with_param(Parameter::typed("x", annotation.clone()));
        let b = FunctionDeclaration::new("f", "Doc.")
            .with_param(Parameter::typed("x", spaced(&annotation)));
        prop_assert_eq!(key_for(&a, &registry, policy), key_for(&b, &registry, policy));
    }
}

#[test]
fn dunder_qualified_types_hash_like_plain_ones() {
    let registry = TypeRegistry::new().with_type("Node", "record Node { value, next }");
    let a = FunctionDeclaration::new("length", "Count nodes.")
        .with_param(Parameter::typed("head", "__main__.Node"));
    let b = FunctionDeclaration::new("length", "Count nodes.")
        .with_param(Parameter::typed("head", "Node"));
    for policy in [
        KeyPolicy::SignatureDocstring,
        KeyPolicy::NameSignatureDocstring,
        KeyPolicy::FullIdentity,
    ] {
        assert_eq!(key_for(&a, &registry, policy), key_for(&b, &registry, policy));
    }
}

#[test]
fn custom_type_order_is_irrelevant() {
    let registry = TypeRegistry::new();
    let a = FunctionDeclaration::new("merge", "Merge.")
        .with_custom_type(TypeDefinition::new("A", "record A {}"))
        .with_custom_type(TypeDefinition::new("B", "record B {}"));
    let b = FunctionDeclaration::new("merge", "Merge.")
        .with_custom_type(TypeDefinition::new("B", "record B {}"))
        .with_custom_type(TypeDefinition::new("A", "record A {}"));
    assert_eq!(
        key_for(&a, &registry, KeyPolicy::FullIdentity),
        key_for(&b, &registry, KeyPolicy::FullIdentity)
    );
}
