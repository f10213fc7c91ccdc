// ABOUTME: Direct chat-completion relay endpoints without conversation persistence
// ABOUTME: Mirrors the backend request/response shape for callers managing their own history
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Completion Relay Routes
//!
//! Stateless relay to the backend: callers supply the full message list and
//! get the completion back in the backend's own shape, blocking or streamed.
//! Nothing is persisted here.

use crate::errors::AppError;
use crate::ollama::{ChatCompletion, ChatMessage, OllamaOptions};
use crate::resources::ServerResources;
use crate::routes::chat::{error_event, message_event};
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::post;
use axum::{Json, Router};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;

use super::authenticate;

/// Request body for a direct completion
#[derive(Debug, Deserialize)]
pub struct CompletionRequest {
    /// Model to use, defaults to the configured model
    pub model: Option<String>,
    /// Full message list; a system prompt is prepended if absent
    pub messages: Vec<ChatMessage>,
    /// Generation options forwarded to the backend
    pub options: Option<OllamaOptions>,
}

/// Completion relay routes handler
pub struct CompletionRoutes;

impl CompletionRoutes {
    /// Create the direct relay routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/chat-completions", post(Self::complete))
            .route("/api/chat-completions/stream", post(Self::complete_stream))
            .with_state(resources)
    }

    /// Blocking relay; backend failures come back as a fallback turn
    async fn complete(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Json(request): Json<CompletionRequest>,
    ) -> Result<Json<ChatCompletion>, AppError> {
        authenticate(&headers, &resources)?;

        if request.messages.is_empty() {
            return Err(AppError::invalid_input("Messages cannot be empty"));
        }

        let model = request
            .model
            .unwrap_or_else(|| resources.ollama.default_model().to_owned());

        let completion = resources
            .ollama
            .chat(&model, request.messages, request.options.as_ref())
            .await;

        Ok(Json(completion))
    }

    /// Streaming relay; each backend chunk becomes one SSE `message` event
    async fn complete_stream(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Json(request): Json<CompletionRequest>,
    ) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
        authenticate(&headers, &resources)?;

        if request.messages.is_empty() {
            return Err(AppError::invalid_input("Messages cannot be empty"));
        }

        let model = request
            .model
            .unwrap_or_else(|| resources.ollama.default_model().to_owned());

        let stream = async_stream::stream! {
            let mut chunk_stream = match resources
                .ollama
                .chat_stream(&model, request.messages, request.options.as_ref())
                .await
            {
                Ok(stream) => stream,
                Err(e) => {
                    yield Ok(error_event(&e));
                    return;
                }
            };

            while let Some(chunk_result) = chunk_stream.next().await {
                match chunk_result {
                    Ok(chunk) => {
                        let done = chunk.done;
                        yield Ok(message_event(&chunk));
                        if done {
                            return;
                        }
                    }
                    Err(e) => {
                        yield Ok(error_event(&e));
                        return;
                    }
                }
            }
        };

        Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
    }
}
