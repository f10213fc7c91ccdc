// ABOUTME: Database operations for chat conversations and messages
// ABOUTME: Handles CRUD with per-user isolation, turn recording, and title derivation
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::constants::{limits, DEFAULT_CONVERSATION_TITLE};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

// ============================================================================
// Database Record Types
// ============================================================================

/// Database representation of a chat conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// Unique conversation ID
    pub id: String,
    /// User ID who owns the conversation
    pub user_id: String,
    /// Conversation title (auto-derived from the first user turn)
    pub title: String,
    /// Model assigned to this conversation
    pub model: String,
    /// When the conversation was created (ISO 8601)
    pub created_at: String,
    /// When the conversation was last updated (ISO 8601)
    pub updated_at: String,
}

/// Database representation of a chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Unique message ID
    pub id: String,
    /// Conversation ID this message belongs to
    pub conversation_id: String,
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    /// Message content with reasoning stripped
    pub content: String,
    /// Chain-of-thought text captured from `<think>` blocks, assistant turns only
    pub reasoning: Option<String>,
    /// How long the model spent thinking, in milliseconds
    pub thinking_ms: Option<i64>,
    /// Token count reported by the backend for this turn
    pub token_count: Option<i64>,
    /// When the message was created (ISO 8601)
    pub created_at: String,
}

/// Summary of a conversation for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Conversation ID
    pub id: String,
    /// Conversation title
    pub title: String,
    /// Model assigned to this conversation
    pub model: String,
    /// Number of messages in the conversation
    pub message_count: i64,
    /// When the conversation was created
    pub created_at: String,
    /// When the conversation was last updated
    pub updated_at: String,
}

// ============================================================================
// Title Derivation
// ============================================================================

/// Derive a conversation title from the first user message.
///
/// Short messages become the title verbatim; longer ones are cut at
/// `TITLE_TRUNCATE_AT` characters with a trailing ellipsis.
#[must_use]
pub fn derive_title(content: &str) -> String {
    if content.chars().count() <= limits::TITLE_MAX_CHARS {
        content.to_owned()
    } else {
        let prefix: String = content.chars().take(limits::TITLE_TRUNCATE_AT).collect();
        format!("{prefix}...")
    }
}

// ============================================================================
// Chat Manager
// ============================================================================

/// Chat database operations manager
pub struct ChatManager {
    pool: SqlitePool,
}

impl ChatManager {
    /// Create a new chat manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ========================================================================
    // Conversation Operations
    // ========================================================================

    /// Create a new conversation
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn create_conversation(
        &self,
        user_id: &str,
        title: Option<&str>,
        model: &str,
    ) -> AppResult<ConversationRecord> {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let title = title.unwrap_or(DEFAULT_CONVERSATION_TITLE);

        sqlx::query(
            r"
            INSERT INTO chat_conversations (id, user_id, title, model, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            ",
        )
        .bind(&id)
        .bind(user_id)
        .bind(title)
        .bind(model)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create conversation: {e}")))?;

        Ok(ConversationRecord {
            id,
            user_id: user_id.to_owned(),
            title: title.to_owned(),
            model: model.to_owned(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Get a conversation by ID with user isolation
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_conversation(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> AppResult<Option<ConversationRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, title, model, created_at, updated_at
            FROM chat_conversations
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get conversation: {e}")))?;

        Ok(row.map(|r| ConversationRecord {
            id: r.get("id"),
            user_id: r.get("user_id"),
            title: r.get("title"),
            model: r.get("model"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }))
    }

    /// List conversations for a user, most recently updated first
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn list_conversations(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<ConversationSummary>> {
        let rows = sqlx::query(
            r"
            SELECT c.id, c.title, c.model, c.created_at, c.updated_at,
                   COUNT(m.id) as message_count
            FROM chat_conversations c
            LEFT JOIN chat_messages m ON m.conversation_id = c.id
            WHERE c.user_id = $1
            GROUP BY c.id
            ORDER BY c.updated_at DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list conversations: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|r| ConversationSummary {
                id: r.get("id"),
                title: r.get("title"),
                model: r.get("model"),
                message_count: r.get("message_count"),
                created_at: r.get("created_at"),
                updated_at: r.get("updated_at"),
            })
            .collect())
    }

    /// Rename a conversation
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` if the conversation does not exist or
    /// belongs to another user
    pub async fn update_conversation_title(
        &self,
        conversation_id: &str,
        user_id: &str,
        title: &str,
    ) -> AppResult<()> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            r"
            UPDATE chat_conversations
            SET title = $1, updated_at = $2
            WHERE id = $3 AND user_id = $4
            ",
        )
        .bind(title)
        .bind(&now)
        .bind(conversation_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update conversation: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Conversation"));
        }
        Ok(())
    }

    /// Delete a conversation and all of its messages
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` if the conversation does not exist or
    /// belongs to another user
    pub async fn delete_conversation(&self, conversation_id: &str, user_id: &str) -> AppResult<()> {
        let result = sqlx::query(
            r"
            DELETE FROM chat_conversations
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(conversation_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to delete conversation: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Conversation"));
        }

        sqlx::query(
            r"
            DELETE FROM chat_messages
            WHERE conversation_id = $1
            ",
        )
        .bind(conversation_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to delete messages: {e}")))?;

        Ok(())
    }

    // ========================================================================
    // Message Operations
    // ========================================================================

    /// Get all messages in a conversation, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_messages(&self, conversation_id: &str) -> AppResult<Vec<MessageRecord>> {
        let rows = sqlx::query(
            r"
            SELECT id, conversation_id, role, content, reasoning, thinking_ms, token_count, created_at
            FROM chat_messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get messages: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|r| MessageRecord {
                id: r.get("id"),
                conversation_id: r.get("conversation_id"),
                role: r.get("role"),
                content: r.get("content"),
                reasoning: r.get("reasoning"),
                thinking_ms: r.get("thinking_ms"),
                token_count: r.get("token_count"),
                created_at: r.get("created_at"),
            })
            .collect())
    }

    /// Record a user turn, deriving the conversation title when this is the
    /// first message of a conversation still carrying the default title
    ///
    /// The ownership check, the insert, and the title update run in one
    /// transaction: either the full turn lands or nothing does.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for blank content, `ResourceNotFound` when the
    /// conversation does not exist or belongs to another user
    pub async fn record_user_turn(
        &self,
        conversation_id: &str,
        user_id: &str,
        content: &str,
    ) -> AppResult<MessageRecord> {
        if content.trim().is_empty() {
            return Err(AppError::invalid_input("Message content cannot be empty"));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

        let title: String = sqlx::query(
            r"
            SELECT title FROM chat_conversations WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to get conversation: {e}")))?
        .ok_or_else(|| AppError::not_found("Conversation"))?
        .get("title");

        let message_count: i64 = sqlx::query(
            r"
            SELECT COUNT(*) as count FROM chat_messages WHERE conversation_id = $1
            ",
        )
        .bind(conversation_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to count messages: {e}")))?
        .get("count");

        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r"
            INSERT INTO chat_messages (id, conversation_id, role, content, reasoning, thinking_ms, token_count, created_at)
            VALUES ($1, $2, 'user', $3, NULL, NULL, NULL, $4)
            ",
        )
        .bind(&id)
        .bind(conversation_id)
        .bind(content)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to insert message: {e}")))?;

        if message_count == 0 && title == DEFAULT_CONVERSATION_TITLE {
            sqlx::query(
                r"
                UPDATE chat_conversations SET title = $1, updated_at = $2 WHERE id = $3
                ",
            )
            .bind(derive_title(content))
            .bind(&now)
            .bind(conversation_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to update conversation: {e}")))?;
        } else {
            sqlx::query(
                r"
                UPDATE chat_conversations SET updated_at = $1 WHERE id = $2
                ",
            )
            .bind(&now)
            .bind(conversation_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to touch conversation: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit transaction: {e}")))?;

        Ok(MessageRecord {
            id,
            conversation_id: conversation_id.to_owned(),
            role: "user".to_owned(),
            content: content.to_owned(),
            reasoning: None,
            thinking_ms: None,
            token_count: None,
            created_at: now,
        })
    }

    /// Record a completed assistant turn with its reasoning and metrics
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn record_assistant_turn(
        &self,
        conversation_id: &str,
        content: &str,
        reasoning: Option<&str>,
        thinking_ms: Option<i64>,
        token_count: Option<i64>,
    ) -> AppResult<MessageRecord> {
        let record = self
            .insert_message(
                conversation_id,
                "assistant",
                content,
                reasoning,
                thinking_ms,
                token_count,
            )
            .await?;
        self.touch_conversation(conversation_id).await?;
        Ok(record)
    }

    async fn insert_message(
        &self,
        conversation_id: &str,
        role: &str,
        content: &str,
        reasoning: Option<&str>,
        thinking_ms: Option<i64>,
        token_count: Option<i64>,
    ) -> AppResult<MessageRecord> {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r"
            INSERT INTO chat_messages (id, conversation_id, role, content, reasoning, thinking_ms, token_count, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(&id)
        .bind(conversation_id)
        .bind(role)
        .bind(content)
        .bind(reasoning)
        .bind(thinking_ms)
        .bind(token_count)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to insert message: {e}")))?;

        Ok(MessageRecord {
            id,
            conversation_id: conversation_id.to_owned(),
            role: role.to_owned(),
            content: content.to_owned(),
            reasoning: reasoning.map(ToOwned::to_owned),
            thinking_ms,
            token_count,
            created_at: now,
        })
    }

    async fn touch_conversation(&self, conversation_id: &str) -> AppResult<()> {
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            r"
            UPDATE chat_conversations SET updated_at = $1 WHERE id = $2
            ",
        )
        .bind(&now)
        .bind(conversation_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to touch conversation: {e}")))?;
        Ok(())
    }
}
