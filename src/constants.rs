// ABOUTME: Application constants shared across the relay, persistence, and route layers
// ABOUTME: Centralizes prompt text, conversation limits, and Ollama defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Application-wide constants.

/// Service identity used for logging and JWT audience
pub mod service_names {
    /// Primary service name
    pub const VIVUCHAT_SERVER: &str = "vivuchat-server";
}

/// Chat behavior limits
pub mod limits {
    /// Maximum number of persisted turns sent to the model as context
    pub const HISTORY_CAP: usize = 20;

    /// Conversation titles longer than this are truncated
    pub const TITLE_MAX_CHARS: usize = 30;

    /// Truncated titles keep this many characters before the ellipsis
    pub const TITLE_TRUNCATE_AT: usize = 27;

    /// JWT session lifetime in hours
    pub const USER_SESSION_EXPIRY_HOURS: i64 = 24;
}

/// Defaults for talking to the Ollama backend
pub mod ollama_defaults {
    /// Base URL of the Ollama native API
    pub const BASE_URL: &str = "http://localhost:11434/api";

    /// Hard timeout for the non-streaming completion path
    pub const TIMEOUT_SECS: u64 = 120;

    /// Connect timeout for the shared HTTP client
    pub const CONNECT_TIMEOUT_SECS: u64 = 30;

    /// Model assigned to new conversations when none is requested
    pub const DEFAULT_MODEL: &str = "llama3.1:8b";
}

/// Title given to conversations before the first user turn arrives
pub const DEFAULT_CONVERSATION_TITLE: &str = "New Chat";

/// System prompt prepended to outbound requests when the caller has not
/// supplied a system-role message of its own
pub const SYSTEM_PROMPT: &str = "You are a helpful, respectful and honest assistant. \
Always answer as helpfully as possible, while being safe. Your answers should be \
informative and factually correct. If a question is unclear or lacks factual \
coherence, explain why instead of answering something not correct. If you don't \
know the answer to a question, please don't share false information.";

/// Assistant message returned when the backend fails on the blocking path.
/// The chat UI renders this instead of an error so the conversation survives
/// a backend outage.
pub const FALLBACK_ASSISTANT_MESSAGE: &str = "I'm sorry, I encountered an error \
while processing your request. Please try again later.";
