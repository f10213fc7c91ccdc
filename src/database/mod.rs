// ABOUTME: SQLite database connection management, schema migration, and user operations
// ABOUTME: Owns the connection pool shared by the chat and model registry managers
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Database Layer
//!
//! SQLite persistence for users, conversations, messages, and the model
//! registry. The [`Database`] struct owns the connection pool and runs the
//! schema migrations at startup; per-domain managers borrow the pool.

/// Conversation and message persistence
pub mod chat;
/// Ollama model registry persistence
pub mod models;

use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

/// Database representation of a registered user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Unique user ID
    pub id: String,
    /// Login name, unique across the system
    pub username: String,
    /// Contact email, unique across the system
    pub email: String,
    /// Bcrypt password hash
    pub password_hash: String,
    /// When the user registered (ISO 8601)
    pub created_at: String,
}

/// Database connection manager
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the database and run schema migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or a
    /// migration statement fails
    pub async fn new(database_url: &str) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::config(format!("Invalid database URL: {e}")))?
            .create_if_missing(true);

        // An in-memory database exists per connection, so the pool must not
        // fan out or later queries would see empty schemas
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| AppError::database(format!("Failed to connect to database: {e}")))?;

        let database = Self { pool };
        database.migrate().await?;
        Ok(database)
    }

    /// Access the underlying connection pool
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create all tables if they do not exist
    async fn migrate(&self) -> AppResult<()> {
        let statements = [
            r"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS chat_conversations (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                model TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS chat_messages (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                reasoning TEXT,
                thinking_ms INTEGER,
                token_count INTEGER,
                created_at TEXT NOT NULL,
                FOREIGN KEY (conversation_id) REFERENCES chat_conversations(id)
            )
            ",
            r"
            CREATE INDEX IF NOT EXISTS idx_chat_messages_conversation
            ON chat_messages(conversation_id, created_at)
            ",
            r"
            CREATE TABLE IF NOT EXISTS ollama_models (
                name TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1
            )
            ",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::database(format!("Migration failed: {e}")))?;
        }

        Ok(())
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    /// Create a new user with a pre-hashed password
    ///
    /// # Errors
    ///
    /// Returns `ResourceAlreadyExists` if the username is taken, or a
    /// database error otherwise
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> AppResult<UserRecord> {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            r"
            INSERT INTO users (id, username, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(&id)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(&now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(UserRecord {
                id,
                username: username.to_owned(),
                email: email.to_owned(),
                password_hash: password_hash.to_owned(),
                created_at: now,
            }),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(AppError::already_exists(format!("User '{username}'")))
            }
            Err(e) => Err(AppError::database(format!("Failed to create user: {e}"))),
        }
    }

    /// Look up a user by username
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_user_by_username(&self, username: &str) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, username, email, password_hash, created_at
            FROM users
            WHERE username = $1
            ",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get user: {e}")))?;

        Ok(row.map(|r| UserRecord {
            id: r.get("id"),
            username: r.get("username"),
            email: r.get("email"),
            password_hash: r.get("password_hash"),
            created_at: r.get("created_at"),
        }))
    }

    /// Look up a user by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn get_user(&self, user_id: &str) -> AppResult<Option<UserRecord>> {
        let row = sqlx::query(
            r"
            SELECT id, username, email, password_hash, created_at
            FROM users
            WHERE id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get user: {e}")))?;

        Ok(row.map(|r| UserRecord {
            id: r.get("id"),
            username: r.get("username"),
            email: r.get("email"),
            password_hash: r.get("password_hash"),
            created_at: r.get("created_at"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_database() -> Database {
        Database::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let db = test_database().await;

        let user = db
            .create_user("alice", "alice@example.com", "hashed-password")
            .await
            .unwrap();
        assert_eq!(user.username, "alice");

        let found = db.get_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.email, "alice@example.com");

        let by_id = db.get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let db = test_database().await;

        db.create_user("bob", "bob@example.com", "hash1")
            .await
            .unwrap();
        let err = db
            .create_user("bob", "bob2@example.com", "hash2")
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::errors::ErrorCode::ResourceAlreadyExists);
    }

    #[tokio::test]
    async fn test_missing_user_returns_none() {
        let db = test_database().await;
        assert!(db.get_user_by_username("nobody").await.unwrap().is_none());
    }
}
