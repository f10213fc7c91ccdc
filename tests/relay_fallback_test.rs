// ABOUTME: Integration tests for the completion relay's failure behavior
// ABOUTME: A dead backend must yield the fallback turn, not an error

use vivuchat::config::environment::OllamaConfig;
use vivuchat::constants::FALLBACK_ASSISTANT_MESSAGE;
use vivuchat::ollama::{ChatMessage, MessageRole, OllamaClient};

fn dead_backend_client() -> OllamaClient {
    // Port 1 is never listening; the connect fails immediately
    OllamaClient::new(OllamaConfig {
        base_url: "http://127.0.0.1:1/api".to_owned(),
        timeout_secs: 2,
        default_model: "llama3.1:8b".to_owned(),
    })
    .unwrap()
}

#[tokio::test]
async fn test_blocking_chat_degrades_to_fallback_turn() {
    let client = dead_backend_client();

    let completion = client
        .chat("llama3.1:8b", vec![ChatMessage::user("hello?")], None)
        .await;

    assert!(completion.done);
    assert_eq!(completion.message.role, MessageRole::Assistant);
    assert_eq!(completion.message.content, FALLBACK_ASSISTANT_MESSAGE);
}

#[tokio::test]
async fn test_streaming_chat_surfaces_connect_error() {
    let client = dead_backend_client();

    let result = client
        .chat_stream("llama3.1:8b", vec![ChatMessage::user("hello?")], None)
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_model_passthrough_reports_unreachable_backend() {
    let client = dead_backend_client();

    let err = client.list_models().await.unwrap_err();
    assert_eq!(
        err.code,
        vivuchat::errors::ErrorCode::ExternalServiceUnavailable
    );
}
