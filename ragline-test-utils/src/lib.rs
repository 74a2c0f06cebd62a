//! Wiremock fixtures for the http services ragline talks to.
#![allow(clippy::missing_panics_doc)]

use std::time::Duration;

use serde_json::json;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

pub use ragline_core::test_utils::*;

/// An `async_openai` client pointed at a mock server, with internal retries disabled.
pub fn openai_client(
    mock_server_uri: &str,
) -> async_openai::Client<async_openai::config::OpenAIConfig> {
    let config = async_openai::config::OpenAIConfig::new()
        .with_api_base(mock_server_uri)
        .with_api_key("test-key");

    let no_backoff = backoff::ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build();

    async_openai::Client::with_config(config).with_backoff(no_backoff)
}

pub fn chat_completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "created": 1_677_652_288,
        "model": "gpt-4o-mini",
        "system_fingerprint": "fp_44709d6fcb",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": content,
            },
            "logprobs": null,
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": 9,
            "completion_tokens": 12,
            "total_tokens": 21
        }
    })
}

/// Answers every chat completion with `content`.
pub async fn mock_chat_completion(mock_server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion_body(content)))
        .mount(mock_server)
        .await;
}

/// Fails every chat completion with an `OpenAI` style error body.
pub async fn mock_chat_error(mock_server: &MockServer, status: u16, error_type: &str) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({
            "error": {
                "message": "mocked failure",
                "type": error_type,
                "param": null,
                "code": null
            }
        })))
        .mount(mock_server)
        .await;
}

pub fn embeddings_body(embeddings: &[Vec<f32>]) -> serde_json::Value {
    let data = embeddings
        .iter()
        .enumerate()
        .map(|(i, embedding)| {
            json!({
                "object": "embedding",
                "embedding": embedding,
                "index": i
            })
        })
        .collect::<Vec<_>>();

    json!({
        "object": "list",
        "data": data,
        "model": "text-embedding-3-large",
        "usage": {
            "prompt_tokens": 8,
            "total_tokens": 8
        }
    })
}

/// Answers every embeddings request with `embeddings`.
pub async fn mock_embeddings(mock_server: &MockServer, embeddings: &[Vec<f32>]) {
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(embeddings_body(embeddings)))
        .mount(mock_server)
        .await;
}

/// Answers every transcription upload with `{"text": text}`.
pub async fn mock_transcription(mock_server: &MockServer, text: &str) {
    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": text })))
        .mount(mock_server)
        .await;
}

/// Body of a Pinecone index description.
pub fn pinecone_index_body(name: &str, dimension: u32, host: &str) -> serde_json::Value {
    json!({
        "name": name,
        "dimension": dimension,
        "metric": "dotproduct",
        "host": host,
        "spec": { "serverless": { "cloud": "aws", "region": "us-east-1" } },
        "status": { "ready": true, "state": "Ready" }
    })
}
