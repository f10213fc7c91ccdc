// ABOUTME: Integration tests for the SSE relay's persistence boundary
// ABOUTME: Covers commit-at-terminal-chunk and no-write on early disconnect

use futures_util::{stream, StreamExt};
use vivuchat::database::chat::ChatManager;
use vivuchat::database::Database;
use vivuchat::errors::AppError;
use vivuchat::ollama::{ChatMessage, CompletionChunk, CompletionStream};
use vivuchat::routes::chat::relay_completion_stream;

fn chunk(content: &str, done: bool) -> CompletionChunk {
    CompletionChunk {
        model: "llama3.1:8b".to_owned(),
        created_at: "2026-08-29T00:00:00Z".to_owned(),
        message: Some(ChatMessage::assistant(content)),
        done,
        total_duration: None,
        prompt_eval_count: None,
        eval_count: done.then_some(12),
    }
}

fn chunk_stream(chunks: Vec<Result<CompletionChunk, AppError>>) -> CompletionStream {
    Box::pin(stream::iter(chunks))
}

async fn setup() -> (Database, ChatManager, String, String) {
    let db = Database::new("sqlite::memory:").await.unwrap();
    let user = db
        .create_user("alice", "alice@example.com", "hash")
        .await
        .unwrap();
    let manager = ChatManager::new(db.pool().clone());
    let conv = manager
        .create_conversation(&user.id, None, "llama3.1:8b")
        .await
        .unwrap();
    manager
        .record_user_turn(&conv.id, &user.id, "hello")
        .await
        .unwrap();
    (db, manager, user.id, conv.id)
}

#[tokio::test]
async fn test_disconnect_before_terminal_chunk_persists_nothing() {
    let (db, manager, _user_id, conv_id) = setup().await;

    let relay = relay_completion_stream(
        chunk_stream(vec![
            Ok(chunk("Hel", false)),
            Ok(chunk("lo ", false)),
            Ok(chunk("there", false)),
        ]),
        ChatManager::new(db.pool().clone()),
        conv_id.clone(),
    );
    futures_util::pin_mut!(relay);

    // Client reads a couple of frames, then goes away
    assert!(relay.next().await.is_some());
    assert!(relay.next().await.is_some());
    drop(relay);

    let messages = manager.get_messages(&conv_id).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, "user");
}

#[tokio::test]
async fn test_stream_ending_without_terminal_chunk_persists_nothing() {
    let (db, manager, _user_id, conv_id) = setup().await;

    let relay = relay_completion_stream(
        chunk_stream(vec![Ok(chunk("partial answ", false))]),
        ChatManager::new(db.pool().clone()),
        conv_id.clone(),
    );
    let events: Vec<_> = relay.collect().await;
    assert_eq!(events.len(), 1);

    let messages = manager.get_messages(&conv_id).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, "user");
}

#[tokio::test]
async fn test_assistant_turn_committed_before_terminal_frame_is_emitted() {
    let (db, manager, _user_id, conv_id) = setup().await;

    let relay = relay_completion_stream(
        chunk_stream(vec![
            Ok(chunk("<think>hmm</think>", false)),
            Ok(chunk("Hi!", false)),
            Ok(chunk("", true)),
        ]),
        ChatManager::new(db.pool().clone()),
        conv_id.clone(),
    );
    futures_util::pin_mut!(relay);

    assert!(relay.next().await.is_some());
    assert!(relay.next().await.is_some());

    // Receiving the terminal frame means the turn is already durable, even
    // if the client aborts right after
    assert!(relay.next().await.is_some());
    drop(relay);

    let messages = manager.get_messages(&conv_id).await.unwrap();
    assert_eq!(messages.len(), 2);

    let assistant = &messages[1];
    assert_eq!(assistant.role, "assistant");
    assert_eq!(assistant.content, "Hi!");
    assert_eq!(assistant.reasoning.as_deref(), Some("hmm"));
    assert_eq!(assistant.token_count, Some(12));
}

#[tokio::test]
async fn test_complete_stream_persists_exactly_one_assistant_turn() {
    let (db, manager, _user_id, conv_id) = setup().await;

    let relay = relay_completion_stream(
        chunk_stream(vec![
            Ok(chunk("answer ", false)),
            Ok(chunk("text", false)),
            Ok(chunk("", true)),
        ]),
        ChatManager::new(db.pool().clone()),
        conv_id.clone(),
    );
    let events: Vec<_> = relay.collect().await;
    assert_eq!(events.len(), 3);

    let messages = manager.get_messages(&conv_id).await.unwrap();
    let assistant_turns: Vec<_> = messages.iter().filter(|m| m.role == "assistant").collect();
    assert_eq!(assistant_turns.len(), 1);
    assert_eq!(assistant_turns[0].content, "answer text");
}

#[tokio::test]
async fn test_transport_error_ends_relay_without_persisting() {
    let (db, manager, _user_id, conv_id) = setup().await;

    let relay = relay_completion_stream(
        chunk_stream(vec![
            Ok(chunk("so far", false)),
            Err(AppError::external_service("Ollama", "connection reset")),
        ]),
        ChatManager::new(db.pool().clone()),
        conv_id.clone(),
    );
    let events: Vec<_> = relay.collect().await;
    assert_eq!(events.len(), 2);

    let messages = manager.get_messages(&conv_id).await.unwrap();
    assert_eq!(messages.len(), 1);
}
