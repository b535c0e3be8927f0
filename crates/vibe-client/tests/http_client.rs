//! HttpGenerationClient against a mock generation service.

use std::time::Duration;

use serde_json::json;
use vibe_client::{CodeGenerator, GenerationError, HttpClientConfig, HttpGenerationClient};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpGenerationClient {
    let config = HttpClientConfig::new(
        format!("{}/v1/chat/completions", server.uri()),
        "test-key",
        "llama",
    )
    .with_timeout(Duration::from_secs(2));
    HttpGenerationClient::new(config).unwrap()
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

#[tokio::test]
async fn extracts_fenced_source() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "llama",
            "stream": false,
            "messages": [{"role": "user", "content": "write fib"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            "Sure:\n```vibescript\nfn fib(n) { return n }\n```\nDone.",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let source = client_for(&server).generate("write fib").await.unwrap();
    assert_eq!(source, "fn fib(n) { return n }");
}

#[tokio::test]
async fn server_error_is_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let err = client_for(&server).generate("write fib").await.unwrap_err();
    match err {
        GenerationError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "internal error");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_content_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = client_for(&server).generate("write fib").await.unwrap_err();
    assert!(matches!(err, GenerationError::MalformedResponse(_)));
}

#[tokio::test]
async fn non_json_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).generate("write fib").await.unwrap_err();
    assert!(matches!(err, GenerationError::MalformedResponse(_)));
}

#[tokio::test]
async fn slow_service_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("fn f() { return 1 }"))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = HttpClientConfig::new(format!("{}/v1/chat/completions", server.uri()), "k", "llama")
        .with_timeout(Duration::from_millis(200));
    let client = HttpGenerationClient::new(config).unwrap();

    let err = client.generate("write f").await.unwrap_err();
    assert!(matches!(err, GenerationError::Timeout(_)), "got {err:?}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unreachable_service_is_transport() {
    let config = HttpClientConfig::new("http://127.0.0.1:9/v1/chat/completions", "k", "llama")
        .with_timeout(Duration::from_secs(2));
    let client = HttpGenerationClient::new(config).unwrap();

    let err = client.generate("write f").await.unwrap_err();
    assert!(matches!(err, GenerationError::Transport(_)), "got {err:?}");
}
