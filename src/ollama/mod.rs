// ABOUTME: Ollama relay layer with wire types, NDJSON stream parsing, and think-block splitting
// ABOUTME: Defines the chat message and completion chunk types shared across the crate
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Ollama Relay
//!
//! Types and client for talking to a local Ollama server over its native API.
//! Completions stream back as newline-delimited JSON; [`ndjson`] handles the
//! framing and [`thinking`] splits `<think>` blocks out of assistant output.

/// HTTP client for the Ollama native API
pub mod client;
/// Newline-delimited JSON stream parsing
pub mod ndjson;
/// `<think>` block splitter for reasoning models
pub mod thinking;

pub use client::OllamaClient;
pub use thinking::ThinkSplitter;

use crate::errors::AppError;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions
    System,
    /// End-user input
    User,
    /// Model output
    Assistant,
}

impl MessageRole {
    /// Wire representation of the role
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Parse a stored role string, returning `None` for unknown roles
    #[must_use]
    pub fn parse(role: &str) -> Option<Self> {
        match role {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// A single chat message in the Ollama wire format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Sender role
    pub role: MessageRole,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Build a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Build a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Build an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Generation options forwarded to Ollama
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OllamaOptions {
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling cutoff
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i64>,
}

/// One NDJSON chunk of a streaming completion
///
/// Intermediate chunks carry a message delta with `done: false`. The final
/// chunk has `done: true` and carries the generation metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionChunk {
    /// Model that produced this chunk
    pub model: String,
    /// Backend timestamp for this chunk
    #[serde(default)]
    pub created_at: String,
    /// Message delta, absent on some terminal chunks
    #[serde(default)]
    pub message: Option<ChatMessage>,
    /// Whether this is the terminal chunk
    pub done: bool,
    /// Total wall-clock generation time in nanoseconds (terminal chunk only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,
    /// Prompt token count (terminal chunk only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<i64>,
    /// Completion token count (terminal chunk only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<i64>,
}

impl CompletionChunk {
    /// Text carried by this chunk, empty when the message is absent
    #[must_use]
    pub fn delta(&self) -> &str {
        self.message.as_ref().map_or("", |m| m.content.as_str())
    }
}

/// A complete (non-streaming) chat completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletion {
    /// Model that produced the completion
    pub model: String,
    /// Backend timestamp
    #[serde(default)]
    pub created_at: String,
    /// The assistant message
    pub message: ChatMessage,
    /// Always true for non-streaming responses
    pub done: bool,
    /// Total wall-clock generation time in nanoseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,
    /// Prompt token count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<i64>,
    /// Completion token count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<i64>,
}

/// Stream of completion chunks from the backend
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<CompletionChunk, AppError>> + Send>>;
