// ABOUTME: Conversation CRUD and message endpoints, including the SSE streaming relay
// ABOUTME: Persists user turns up front and assistant turns only on the terminal chunk
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Chat Routes
//!
//! JWT-protected conversation management and messaging. The streaming
//! endpoint relays backend chunks as SSE `message` events while a
//! [`ThinkSplitter`] accumulates the reasoning and answer for persistence.
//! The assistant turn is committed exactly when the terminal `done: true`
//! chunk arrives, so a client that disconnects mid-stream leaves nothing
//! half-written.

use crate::database::chat::{ChatManager, ConversationRecord, MessageRecord};
use crate::database::models::ModelRegistry;
use crate::errors::{AppError, ErrorResponse};
use crate::ollama::{CompletionStream, ThinkSplitter};
use crate::resources::ServerResources;
use crate::transcript::build_context;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, warn};

use super::authenticate;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a conversation
#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    /// Model for the conversation, defaults to the configured model
    pub model: Option<String>,
    /// Initial title, defaults to "New Chat" until the first user turn
    pub title: Option<String>,
}

/// Request body for renaming a conversation
#[derive(Debug, Deserialize)]
pub struct UpdateConversationRequest {
    /// New title
    pub title: String,
}

/// Request body for sending a message
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    /// User message content
    pub content: String,
}

/// Pagination parameters for conversation listing
#[derive(Debug, Deserialize)]
pub struct ListConversationsQuery {
    /// Maximum conversations to return
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Offset for pagination
    #[serde(default)]
    pub offset: i64,
}

const fn default_limit() -> i64 {
    20
}

/// A conversation together with its full message history
#[derive(Debug, Serialize)]
pub struct ConversationDetailResponse {
    /// The conversation record
    pub conversation: ConversationRecord,
    /// Messages in conversation order
    pub messages: Vec<MessageRecord>,
}

// ============================================================================
// Chat Routes
// ============================================================================

/// Chat routes handler
pub struct ChatRoutes;

impl ChatRoutes {
    /// Create all chat routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            // Conversation management
            .route("/api/chat/conversations", post(Self::create_conversation))
            .route("/api/chat/conversations", get(Self::list_conversations))
            .route(
                "/api/chat/conversations/:conversation_id",
                get(Self::get_conversation),
            )
            .route(
                "/api/chat/conversations/:conversation_id",
                put(Self::update_conversation),
            )
            .route(
                "/api/chat/conversations/:conversation_id",
                delete(Self::delete_conversation),
            )
            // Messages
            .route(
                "/api/chat/conversations/:conversation_id/messages",
                get(Self::get_messages),
            )
            .route(
                "/api/chat/conversations/:conversation_id/messages",
                post(Self::send_message),
            )
            // Streaming endpoint
            .route(
                "/api/chat/conversations/:conversation_id/stream",
                post(Self::send_message_stream),
            )
            .with_state(resources)
    }

    /// Create a `ChatManager` from server resources
    fn chat_manager(resources: &ServerResources) -> ChatManager {
        ChatManager::new(resources.database.pool().clone())
    }

    async fn create_conversation(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Json(request): Json<CreateConversationRequest>,
    ) -> Result<(StatusCode, Json<ConversationRecord>), AppError> {
        let auth = authenticate(&headers, &resources)?;

        let model = request
            .model
            .unwrap_or_else(|| resources.ollama.default_model().to_owned());

        let registry = ModelRegistry::new(resources.database.pool().clone());
        let known = registry
            .find_by_name(&model)
            .await?
            .ok_or_else(|| AppError::invalid_input(format!("Unknown model '{model}'")))?;
        if !known.is_active {
            return Err(AppError::invalid_input(format!(
                "Model '{model}' is not active"
            )));
        }

        let conversation = Self::chat_manager(&resources)
            .create_conversation(
                &auth.user_id.to_string(),
                request.title.as_deref(),
                &model,
            )
            .await?;

        debug!(conversation.id = %conversation.id, model = %model, "Conversation created");
        Ok((StatusCode::CREATED, Json(conversation)))
    }

    async fn list_conversations(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Query(query): Query<ListConversationsQuery>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let auth = authenticate(&headers, &resources)?;

        let conversations = Self::chat_manager(&resources)
            .list_conversations(&auth.user_id.to_string(), query.limit, query.offset)
            .await?;

        Ok(Json(serde_json::json!({ "conversations": conversations })))
    }

    async fn get_conversation(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Path(conversation_id): Path<String>,
    ) -> Result<Json<ConversationDetailResponse>, AppError> {
        let auth = authenticate(&headers, &resources)?;
        let chat_manager = Self::chat_manager(&resources);

        let conversation = chat_manager
            .get_conversation(&conversation_id, &auth.user_id.to_string())
            .await?
            .ok_or_else(|| AppError::not_found("Conversation"))?;
        let messages = chat_manager.get_messages(&conversation_id).await?;

        Ok(Json(ConversationDetailResponse {
            conversation,
            messages,
        }))
    }

    async fn update_conversation(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Path(conversation_id): Path<String>,
        Json(request): Json<UpdateConversationRequest>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let auth = authenticate(&headers, &resources)?;

        if request.title.trim().is_empty() {
            return Err(AppError::invalid_input("Title cannot be empty"));
        }

        Self::chat_manager(&resources)
            .update_conversation_title(&conversation_id, &auth.user_id.to_string(), &request.title)
            .await?;

        Ok(Json(serde_json::json!({ "status": "updated" })))
    }

    async fn delete_conversation(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Path(conversation_id): Path<String>,
    ) -> Result<StatusCode, AppError> {
        let auth = authenticate(&headers, &resources)?;

        Self::chat_manager(&resources)
            .delete_conversation(&conversation_id, &auth.user_id.to_string())
            .await?;

        Ok(StatusCode::NO_CONTENT)
    }

    async fn get_messages(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Path(conversation_id): Path<String>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        let auth = authenticate(&headers, &resources)?;
        let chat_manager = Self::chat_manager(&resources);

        // Ownership check before exposing messages
        chat_manager
            .get_conversation(&conversation_id, &auth.user_id.to_string())
            .await?
            .ok_or_else(|| AppError::not_found("Conversation"))?;

        let messages = chat_manager.get_messages(&conversation_id).await?;
        Ok(Json(serde_json::json!({ "messages": messages })))
    }

    /// Blocking send: persist the user turn, relay to the backend, persist
    /// and return the assistant turn. Backend failures surface as a fallback
    /// assistant turn, never as an error.
    async fn send_message(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Path(conversation_id): Path<String>,
        Json(request): Json<SendMessageRequest>,
    ) -> Result<Json<MessageRecord>, AppError> {
        let auth = authenticate(&headers, &resources)?;
        let user_id = auth.user_id.to_string();
        let chat_manager = Self::chat_manager(&resources);

        let conversation = chat_manager
            .get_conversation(&conversation_id, &user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Conversation"))?;

        // History before this turn; the new user message goes last in context
        let history = chat_manager.get_messages(&conversation_id).await?;
        chat_manager
            .record_user_turn(&conversation_id, &user_id, &request.content)
            .await?;

        let context = build_context(&history, &request.content);
        let completion = resources
            .ollama
            .chat(&conversation.model, context, None)
            .await;

        let mut splitter = ThinkSplitter::new();
        splitter.push(&completion.message.content);
        splitter.finish();

        let reasoning = (!splitter.thinking().is_empty()).then(|| splitter.thinking().to_owned());
        let assistant = chat_manager
            .record_assistant_turn(
                &conversation_id,
                splitter.answer(),
                reasoning.as_deref(),
                splitter.thinking_duration_ms().and_then(|ms| i64::try_from(ms).ok()),
                completion.eval_count,
            )
            .await?;

        Ok(Json(assistant))
    }

    /// Streaming send: persist the user turn, then relay backend chunks as
    /// SSE `message` events. The assistant turn is committed when the
    /// terminal chunk arrives; failures become a single `error` event.
    async fn send_message_stream(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Path(conversation_id): Path<String>,
        Json(request): Json<SendMessageRequest>,
    ) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
        let auth = authenticate(&headers, &resources)?;
        let user_id = auth.user_id.to_string();
        let chat_manager = Self::chat_manager(&resources);

        let conversation = chat_manager
            .get_conversation(&conversation_id, &user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Conversation"))?;

        let history = chat_manager.get_messages(&conversation_id).await?;
        chat_manager
            .record_user_turn(&conversation_id, &user_id, &request.content)
            .await?;

        let context = build_context(&history, &request.content);
        let conv_id = conversation_id.clone();
        let model = conversation.model.clone();

        // The backend call happens inside the generator so connect failures
        // also surface as SSE error events rather than an HTTP error after
        // headers are already committed.
        let stream = async_stream::stream! {
            match resources.ollama.chat_stream(&model, context, None).await {
                Ok(chunks) => {
                    let relay = relay_completion_stream(
                        chunks,
                        Self::chat_manager(&resources),
                        conv_id,
                    );
                    futures_util::pin_mut!(relay);
                    while let Some(event) = relay.next().await {
                        yield event;
                    }
                }
                Err(e) => {
                    yield Ok(error_event(&e));
                }
            }
        };

        Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
    }
}

/// Relay a completion chunk stream as SSE `message` events, committing the
/// assistant turn to the conversation when the terminal chunk arrives.
///
/// Persistence happens exactly once, at the `done: true` chunk, before that
/// frame is emitted. If the stream ends or the consumer drops the relay
/// earlier (a client disconnect drops the whole generator chain), nothing is
/// written.
pub fn relay_completion_stream(
    mut chunks: CompletionStream,
    chat_manager: ChatManager,
    conversation_id: String,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        let mut splitter = ThinkSplitter::new();

        while let Some(chunk_result) = chunks.next().await {
            match chunk_result {
                Ok(chunk) => {
                    splitter.push(chunk.delta());

                    if chunk.done {
                        splitter.finish();
                        let reasoning = (!splitter.thinking().is_empty())
                            .then(|| splitter.thinking().to_owned());
                        let thinking_ms = splitter
                            .thinking_duration_ms()
                            .and_then(|ms| i64::try_from(ms).ok());

                        if let Err(e) = chat_manager
                            .record_assistant_turn(
                                &conversation_id,
                                splitter.answer(),
                                reasoning.as_deref(),
                                thinking_ms,
                                chunk.eval_count,
                            )
                            .await
                        {
                            warn!(conversation.id = %conversation_id, error = %e, "Failed to persist assistant turn");
                            yield Ok(error_event(&e));
                            return;
                        }
                    }

                    yield Ok(message_event(&chunk));
                    if chunk.done {
                        return;
                    }
                }
                Err(e) => {
                    yield Ok(error_event(&e));
                    return;
                }
            }
        }
    }
}

/// Serialize a completion chunk as an SSE `message` event
pub(crate) fn message_event(chunk: &crate::ollama::CompletionChunk) -> Event {
    match serde_json::to_string(chunk) {
        Ok(data) => Event::default().event("message").data(data),
        Err(e) => {
            warn!(error = %e, "Failed to serialize completion chunk");
            error_event(&AppError::internal("Failed to serialize chunk"))
        }
    }
}

/// Serialize an application error as an SSE `error` event
pub(crate) fn error_event(error: &AppError) -> Event {
    let body = ErrorResponse {
        error: crate::errors::ErrorResponseDetails {
            code: error.code,
            message: error.message.clone(),
        },
    };
    let data = serde_json::to_string(&body)
        .unwrap_or_else(|_| r#"{"error":{"code":"INTERNAL_ERROR","message":"unknown"}}"#.to_owned());
    Event::default().event("error").data(data)
}
