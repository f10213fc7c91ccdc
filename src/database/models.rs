// ABOUTME: Registry of Ollama models the server is willing to serve
// ABOUTME: Seeds defaults and answers which models are active for new conversations
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::constants::ollama_defaults;
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// A model known to the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelReference {
    /// Ollama model name, e.g. `llama3.1:8b`
    pub name: String,
    /// Human-readable name shown in the UI
    pub display_name: String,
    /// Whether the model can be assigned to new conversations
    pub is_active: bool,
}

/// Model registry backed by the `ollama_models` table
pub struct ModelRegistry {
    pool: SqlitePool,
}

impl ModelRegistry {
    /// Create a new model registry
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert the default model if the registry is empty
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn seed_defaults(&self) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO ollama_models (name, display_name, is_active)
            VALUES ($1, $2, 1)
            ON CONFLICT(name) DO NOTHING
            ",
        )
        .bind(ollama_defaults::DEFAULT_MODEL)
        .bind(ollama_defaults::DEFAULT_MODEL)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to seed models: {e}")))?;

        Ok(())
    }

    /// List active models
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn list_active(&self) -> AppResult<Vec<ModelReference>> {
        let rows = sqlx::query(
            r"
            SELECT name, display_name, is_active
            FROM ollama_models
            WHERE is_active = 1
            ORDER BY name ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list models: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|r| ModelReference {
                name: r.get("name"),
                display_name: r.get("display_name"),
                is_active: r.get::<i64, _>("is_active") != 0,
            })
            .collect())
    }

    /// Look up a model by its name
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<ModelReference>> {
        let row = sqlx::query(
            r"
            SELECT name, display_name, is_active
            FROM ollama_models
            WHERE name = $1
            ",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to find model: {e}")))?;

        Ok(row.map(|r| ModelReference {
            name: r.get("name"),
            display_name: r.get("display_name"),
            is_active: r.get::<i64, _>("is_active") != 0,
        }))
    }
}
