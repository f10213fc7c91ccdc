// ABOUTME: Builds the outbound message context from persisted conversation history
// ABOUTME: Applies the rolling history cap and drops rows with unknown roles
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Transcript Assembly
//!
//! Converts persisted message rows into the wire-format context sent to the
//! model. Only the most recent turns are kept so long conversations stay
//! within the model's context window, and the new user message always goes
//! last.

use crate::constants::limits::HISTORY_CAP;
use crate::database::chat::MessageRecord;
use crate::ollama::{ChatMessage, MessageRole};

/// Build the outbound context for a completion request.
///
/// Takes the persisted history (oldest first, not yet including the new user
/// message), keeps the last [`HISTORY_CAP`] turns, and appends the new user
/// message. Rows whose role does not parse are skipped.
#[must_use]
pub fn build_context(history: &[MessageRecord], new_user_content: &str) -> Vec<ChatMessage> {
    let start = history.len().saturating_sub(HISTORY_CAP);

    let mut messages: Vec<ChatMessage> = history[start..]
        .iter()
        .filter_map(|record| {
            MessageRole::parse(&record.role).map(|role| ChatMessage {
                role,
                content: record.content.clone(),
            })
        })
        .collect();

    messages.push(ChatMessage::user(new_user_content));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(role: &str, content: &str) -> MessageRecord {
        MessageRecord {
            id: String::new(),
            conversation_id: String::new(),
            role: role.to_owned(),
            content: content.to_owned(),
            reasoning: None,
            thinking_ms: None,
            token_count: None,
            created_at: String::new(),
        }
    }

    #[test]
    fn test_empty_history_yields_single_user_message() {
        let messages = build_context(&[], "hello");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[0].content, "hello");
    }

    #[test]
    fn test_history_cap_keeps_most_recent_turns() {
        let history: Vec<MessageRecord> = (0..25)
            .map(|i| {
                let role = if i % 2 == 0 { "user" } else { "assistant" };
                record(role, &format!("turn {i}"))
            })
            .collect();

        let messages = build_context(&history, "newest");

        assert_eq!(messages.len(), HISTORY_CAP + 1);
        // Oldest retained turn is number 5 (25 - 20)
        assert_eq!(messages[0].content, "turn 5");
        assert_eq!(messages.last().unwrap().content, "newest");
    }

    #[test]
    fn test_unknown_roles_skipped() {
        let history = vec![
            record("user", "hi"),
            record("tool", "ignored"),
            record("assistant", "hello"),
        ];

        let messages = build_context(&history, "again");
        assert_eq!(messages.len(), 3);
        assert!(messages.iter().all(|m| m.content != "ignored"));
    }
}
