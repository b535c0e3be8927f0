//! End-to-end materialization against a mock generation service and a
//! file-backed cache.

use serde_json::json;
use vibe_cache::FileCacheStore;
use vibe_core::{FunctionDeclaration, Parameter, TypeRegistry};
use vibe_runtime::{Orchestrator, Resolution, VibeConfig, VibeError};
use vibe_script::{Module, Value};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COMPLETIONS: &str = "/v1/chat/completions";

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    })
}

fn config(server: &MockServer, dir: &std::path::Path) -> VibeConfig {
    VibeConfig::default()
        .with_cache_dir(dir)
        .with_api_url(format!("{}{}", server.uri(), COMPLETIONS))
}

fn fib_decl() -> FunctionDeclaration {
    FunctionDeclaration::new("fib", "Return the n-th Fibonacci number, with fib(0) = 0.")
        .with_param(Parameter::typed("n", "int"))
        .with_returns("int")
}

fn entry_count(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

#[tokio::test]
async fn fib_is_generated_once_and_served_from_disk() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let content = "Here you go:\n```vibescript\nfn fib(n: int) -> int {\n    if n < 2 { return n }\n    return fib(n - 1) + fib(n - 2)\n}\n```\n";
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .and(header("authorization", "Bearer dummy_key"))
        .and(body_string_contains("fn fib(n: int) -> int"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(content)))
        .expect(1)
        .mount(&server)
        .await;

    let first = Orchestrator::from_config(config(&server, dir.path())).unwrap();
    let module = Module::shared("app");
    let artifact = first.materialize(&fib_decl(), &module).await.unwrap();
    assert_eq!(artifact.resolution, Resolution::Generated);
    assert_eq!(artifact.call(&[Value::Int(10)]).unwrap(), Value::Int(55));

    let entry = FileCacheStore::new(dir.path()).entry_path("fib", &artifact.key);
    let stored = std::fs::read_to_string(&entry).unwrap();
    assert!(stored.starts_with("fn fib(n: int) -> int"));
    assert!(!stored.contains("```"));
    drop(first);

    // A new orchestrator, as after a process restart.
    let second = Orchestrator::from_config(config(&server, dir.path())).unwrap();
    let module = Module::shared("restarted");
    let cached = second.materialize(&fib_decl(), &module).await.unwrap();
    assert_eq!(cached.resolution, Resolution::CacheHit);
    assert_eq!(cached.key, artifact.key);
    assert_eq!(cached.call(&[Value::Int(10)]).unwrap(), Value::Int(55));
    assert!(module.contains("fib"));
}

#[tokio::test]
async fn server_error_leaves_cache_empty() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
        .expect(1)
        .mount(&server)
        .await;

    let orch = Orchestrator::from_config(config(&server, dir.path())).unwrap();
    let err = orch
        .materialize(&fib_decl(), &Module::shared("app"))
        .await
        .unwrap_err();

    assert!(matches!(err, VibeError::Generation(_)));
    assert!(err.to_string().contains("500"));
    assert_eq!(entry_count(dir.path()), 0);
}

#[tokio::test]
async fn custom_types_reach_the_prompt() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let node = "Node = {\"value\": int, \"next\": Node or nil}";
    let source = "fn list_length(head: Node) -> int {\n  let n = 0\n  while head != nil { n += 1; head = head.next }\n  return n\n}";
    Mock::given(method("POST"))
        .and(body_string_contains("Node or nil"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(source)))
        .expect(1)
        .mount(&server)
        .await;

    let orch = Orchestrator::from_config(config(&server, dir.path()))
        .unwrap()
        .with_type_registry(TypeRegistry::new().with_type("Node", node));
    let decl = FunctionDeclaration::new("list_length", "Count the nodes of a linked list.")
        .with_param(Parameter::typed("head", "__main__.Node"))
        .with_returns("int");

    let artifact = orch.materialize(&decl, &Module::shared("lists")).await.unwrap();
    let list = Value::from_json(&json!({"value": 1, "next": {"value": 2, "next": null}}));
    assert_eq!(artifact.call(&[list]).unwrap(), Value::Int(2));
}

#[tokio::test]
async fn docstring_change_regenerates() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion("fn double(x) { return x * 2 }")),
        )
        .expect(2)
        .mount(&server)
        .await;

    let orch = Orchestrator::from_config(config(&server, dir.path())).unwrap();
    let module = Module::shared("app");
    let v1 = FunctionDeclaration::new("double", "Double x.").with_param(Parameter::new("x"));
    let v2 = FunctionDeclaration::new("double", "Return twice x.").with_param(Parameter::new("x"));

    let a = orch.materialize(&v1, &module).await.unwrap();
    let b = orch.materialize(&v2, &module).await.unwrap();
    assert_ne!(a.key, b.key);
    assert_eq!(entry_count(dir.path()), 2);
}
