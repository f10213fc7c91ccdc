// ABOUTME: HTTP client for the Ollama native API with streaming and blocking completion paths
// ABOUTME: Also exposes the model lifecycle passthrough endpoints (tags, show, copy, delete, pull, push, ps)
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Ollama Client
//!
//! Thin relay over the Ollama native API. The blocking completion path
//! degrades gracefully: any backend failure becomes an apology message so a
//! conversation survives an Ollama outage. The streaming path surfaces
//! failures to the caller, who renders them as SSE error events.

use crate::config::environment::OllamaConfig;
use crate::constants::{ollama_defaults, FALLBACK_ASSISTANT_MESSAGE, SYSTEM_PROMPT};
use crate::errors::{AppError, AppResult};
use crate::ollama::ndjson::create_chunk_stream;
use crate::ollama::{
    ChatCompletion, ChatMessage, CompletionStream, MessageRole, OllamaOptions,
};
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Request body for `/chat`
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<&'a OllamaOptions>,
}

/// Client for a local Ollama server
pub struct OllamaClient {
    client: Client,
    config: OllamaConfig,
}

impl OllamaClient {
    /// Create a new client for the configured Ollama backend
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built
    pub fn new(config: OllamaConfig) -> AppResult<Self> {
        // No total timeout here: streaming generation has no known upper
        // bound. The blocking path sets its own per-request timeout.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(ollama_defaults::CONNECT_TIMEOUT_SECS))
            .read_timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Default model for conversations created without an explicit choice
    #[must_use]
    pub fn default_model(&self) -> &str {
        &self.config.default_model
    }

    /// Prepend the standing system prompt unless the transcript already
    /// carries a system message
    #[must_use]
    pub fn ensure_system_prompt(mut messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
        let has_system = messages.iter().any(|m| m.role == MessageRole::System);
        if !has_system {
            messages.insert(0, ChatMessage::system(SYSTEM_PROMPT));
        }
        messages
    }

    /// Run a blocking chat completion
    ///
    /// Never fails: any backend error is logged and replaced with a fallback
    /// assistant message, so callers always get a renderable turn.
    pub async fn chat(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        options: Option<&OllamaOptions>,
    ) -> ChatCompletion {
        let messages = Self::ensure_system_prompt(messages);

        match self.chat_inner(model, &messages, options).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!(model = %model, error = %e, "Chat completion failed, returning fallback");
                ChatCompletion {
                    model: model.to_owned(),
                    created_at: chrono::Utc::now().to_rfc3339(),
                    message: ChatMessage::assistant(FALLBACK_ASSISTANT_MESSAGE),
                    done: true,
                    total_duration: None,
                    prompt_eval_count: None,
                    eval_count: None,
                }
            }
        }
    }

    async fn chat_inner(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: Option<&OllamaOptions>,
    ) -> AppResult<ChatCompletion> {
        let body = ChatRequest {
            model,
            messages,
            stream: false,
            options,
        };

        let response = self
            .client
            .post(format!("{}/chat", self.config.base_url))
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .json(&body)
            .send()
            .await
            .map_err(|e| connection_error("chat", &e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::external_service(
                "Ollama",
                format!("chat returned {status}: {detail}"),
            ));
        }

        response
            .json::<ChatCompletion>()
            .await
            .map_err(|e| AppError::external_service("Ollama", format!("Invalid chat response: {e}")))
    }

    /// Start a streaming chat completion
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or rejects the request;
    /// mid-stream failures surface as items of the returned stream.
    pub async fn chat_stream(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        options: Option<&OllamaOptions>,
    ) -> AppResult<CompletionStream> {
        let messages = Self::ensure_system_prompt(messages);
        let body = ChatRequest {
            model,
            messages: &messages,
            stream: true,
            options,
        };

        debug!(model = %model, message_count = messages.len(), "Starting streaming completion");

        let response = self
            .client
            .post(format!("{}/chat", self.config.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| connection_error("chat", &e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::external_service(
                "Ollama",
                format!("chat returned {status}: {detail}"),
            ));
        }

        Ok(create_chunk_stream(response.bytes_stream()))
    }

    // ========================================================================
    // Model Lifecycle Passthrough
    // ========================================================================

    /// List models installed on the backend (`GET /tags`)
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or responds with a
    /// non-success status
    pub async fn list_models(&self) -> AppResult<Value> {
        self.get_json("tags").await
    }

    /// List models currently loaded in memory (`GET /ps`)
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or responds with a
    /// non-success status
    pub async fn list_running(&self) -> AppResult<Value> {
        self.get_json("ps").await
    }

    /// Show details for one model (`POST /show`)
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or responds with a
    /// non-success status
    pub async fn show_model(&self, name: &str) -> AppResult<Value> {
        self.post_json("show", &json!({ "name": name })).await
    }

    /// Copy a model to a new name (`POST /copy`)
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or responds with a
    /// non-success status
    pub async fn copy_model(&self, source: &str, destination: &str) -> AppResult<()> {
        let response = self
            .client
            .post(format!("{}/copy", self.config.base_url))
            .json(&json!({ "source": source, "destination": destination }))
            .send()
            .await
            .map_err(|e| connection_error("copy", &e))?;

        check_status("copy", response).await.map(|_| ())
    }

    /// Delete a model from the backend (`DELETE /delete`)
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or responds with a
    /// non-success status
    pub async fn delete_model(&self, name: &str) -> AppResult<()> {
        let response = self
            .client
            .delete(format!("{}/delete", self.config.base_url))
            .json(&json!({ "name": name }))
            .send()
            .await
            .map_err(|e| connection_error("delete", &e))?;

        check_status("delete", response).await.map(|_| ())
    }

    /// Pull a model onto the backend (`POST /pull`, non-streaming)
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or responds with a
    /// non-success status
    pub async fn pull_model(&self, name: &str) -> AppResult<Value> {
        self.post_json("pull", &json!({ "name": name, "stream": false }))
            .await
    }

    /// Push a model to a registry (`POST /push`, non-streaming)
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or responds with a
    /// non-success status
    pub async fn push_model(&self, name: &str) -> AppResult<Value> {
        self.post_json("push", &json!({ "name": name, "stream": false }))
            .await
    }

    async fn get_json(&self, path: &str) -> AppResult<Value> {
        let response = self
            .client
            .get(format!("{}/{path}", self.config.base_url))
            .send()
            .await
            .map_err(|e| connection_error(path, &e))?;

        let response = check_status(path, response).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| AppError::external_service("Ollama", format!("Invalid {path} response: {e}")))
    }

    async fn post_json(&self, path: &str, body: &Value) -> AppResult<Value> {
        let response = self
            .client
            .post(format!("{}/{path}", self.config.base_url))
            .json(body)
            .send()
            .await
            .map_err(|e| connection_error(path, &e))?;

        let response = check_status(path, response).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| AppError::external_service("Ollama", format!("Invalid {path} response: {e}")))
    }
}

/// Map a transport error to the right error code: connect failures mean the
/// backend is down, everything else is a backend fault
fn connection_error(operation: &str, error: &reqwest::Error) -> AppError {
    if error.is_connect() || error.is_timeout() {
        AppError::external_unavailable("Ollama", format!("{operation} failed: {error}"))
    } else {
        AppError::external_service("Ollama", format!("{operation} failed: {error}"))
    }
}

async fn check_status(operation: &str, response: reqwest::Response) -> AppResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let detail = response.text().await.unwrap_or_default();
        Err(AppError::external_service(
            "Ollama",
            format!("{operation} returned {status}: {detail}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_system_prompt_prepends_when_absent() {
        let messages = vec![ChatMessage::user("hi")];
        let with_system = OllamaClient::ensure_system_prompt(messages);

        assert_eq!(with_system.len(), 2);
        assert_eq!(with_system[0].role, MessageRole::System);
        assert_eq!(with_system[0].content, SYSTEM_PROMPT);
    }

    #[test]
    fn test_ensure_system_prompt_respects_existing() {
        let messages = vec![
            ChatMessage::system("custom instructions"),
            ChatMessage::user("hi"),
        ];
        let unchanged = OllamaClient::ensure_system_prompt(messages);

        assert_eq!(unchanged.len(), 2);
        assert_eq!(unchanged[0].content, "custom instructions");
    }

    #[test]
    fn test_ensure_system_prompt_finds_system_anywhere() {
        // A system message later in the transcript still counts
        let messages = vec![
            ChatMessage::user("hi"),
            ChatMessage::system("late instructions"),
        ];
        let unchanged = OllamaClient::ensure_system_prompt(messages);
        assert_eq!(unchanged.len(), 2);
    }
}
