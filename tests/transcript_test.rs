// ABOUTME: Integration tests for outbound context assembly
// ABOUTME: Verifies the rolling history cap and message ordering

use vivuchat::database::chat::MessageRecord;
use vivuchat::ollama::MessageRole;
use vivuchat::transcript::build_context;

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
fn test_twenty_five_turns_capped_to_twenty_plus_new() {
    let history: Vec<MessageRecord> = (0..25)
        .map(|i| {
            let role = if i % 2 == 0 { "user" } else { "assistant" };
            record(role, &format!("turn {i}"))
        })
        .collect();

    let context = build_context(&history, "what about now?");

    assert_eq!(context.len(), 21);
    assert_eq!(context[0].content, "turn 5");
    assert_eq!(context[19].content, "turn 24");
    assert_eq!(context[20].content, "what about now?");
    assert_eq!(context[20].role, MessageRole::User);
}

#[test]
fn test_order_preserved_under_cap() {
    let history = vec![
        record("user", "first"),
        record("assistant", "second"),
        record("user", "third"),
    ];

    let context = build_context(&history, "fourth");
    let contents: Vec<&str> = context.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "second", "third", "fourth"]);
}

#[test]
fn test_system_rows_pass_through_unmodified() {
    let history = vec![record("system", "standing instructions"), record("user", "hi")];

    let context = build_context(&history, "next");
    assert_eq!(context[0].role, MessageRole::System);
    assert_eq!(context.len(), 3);
}
