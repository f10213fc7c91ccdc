// ABOUTME: Shared server resources passed to every route handler
// ABOUTME: Bundles the database, Ollama client, auth manager, and configuration
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared resources constructed once at startup and cloned into handlers
//! behind an `Arc`.

use crate::auth::AuthManager;
use crate::config::ServerConfig;
use crate::database::Database;
use crate::ollama::OllamaClient;

/// Container for resources shared across all routes
pub struct ServerResources {
    /// Database connection manager
    pub database: Database,
    /// Ollama backend client
    pub ollama: OllamaClient,
    /// JWT authentication manager
    pub auth: AuthManager,
    /// Server configuration
    pub config: ServerConfig,
}

impl ServerResources {
    /// Bundle the shared resources
    #[must_use]
    pub const fn new(
        database: Database,
        ollama: OllamaClient,
        auth: AuthManager,
        config: ServerConfig,
    ) -> Self {
        Self {
            database,
            ollama,
            auth,
            config,
        }
    }
}
