// ABOUTME: Environment-variable driven server configuration
// ABOUTME: Loads HTTP, database, auth, and Ollama settings with sensible local defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server configuration loaded from environment variables.
//!
//! Environment-only configuration: there is no config file. Every setting has
//! a default suitable for local development against an Ollama instance on
//! `localhost:11434`, except `JWT_SECRET` which must be provided.

use crate::constants::{limits, ollama_defaults};
use crate::errors::{AppError, AppResult};
use std::env;

/// Authentication settings
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Secret used to sign and verify HS256 JWTs
    pub jwt_secret: String,
    /// Token lifetime in hours
    pub jwt_expiry_hours: i64,
}

/// Ollama backend settings
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL of the Ollama native API (e.g. `http://localhost:11434/api`)
    pub base_url: String,
    /// Hard timeout for non-streaming completion calls, in seconds
    pub timeout_secs: u64,
    /// Model assigned to conversations created without an explicit model
    pub default_model: String,
}

/// Top-level server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// Database connection string (SQLite URL)
    pub database_url: String,
    /// Authentication settings
    pub auth: AuthConfig,
    /// Ollama backend settings
    pub ollama: OllamaConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `JWT_SECRET` is missing or a numeric variable
    /// fails to parse.
    pub fn from_env() -> AppResult<Self> {
        let http_port = parse_env("HTTP_PORT", 8080)?;
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:vivuchat.db".to_owned());

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| AppError::config("JWT_SECRET environment variable is required"))?;
        let jwt_expiry_hours = parse_env("JWT_EXPIRY_HOURS", limits::USER_SESSION_EXPIRY_HOURS)?;

        let ollama_base_url = env::var("OLLAMA_BASE_URL")
            .unwrap_or_else(|_| ollama_defaults::BASE_URL.to_owned());
        let ollama_timeout_secs = parse_env("OLLAMA_TIMEOUT_SECS", ollama_defaults::TIMEOUT_SECS)?;
        let default_model = env::var("OLLAMA_DEFAULT_MODEL")
            .unwrap_or_else(|_| ollama_defaults::DEFAULT_MODEL.to_owned());

        Ok(Self {
            http_port,
            database_url,
            auth: AuthConfig {
                jwt_secret,
                jwt_expiry_hours,
            },
            ollama: OllamaConfig {
                base_url: ollama_base_url,
                timeout_secs: ollama_timeout_secs,
                default_model,
            },
        })
    }

    /// One-line configuration summary for startup logging (secrets elided)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "port={} database={} ollama={} timeout={}s default_model={}",
            self.http_port,
            self.database_url,
            self.ollama.base_url,
            self.ollama.timeout_secs,
            self.ollama.default_model
        )
    }
}

/// Parse an environment variable into `T`, falling back to `default` when unset
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> AppResult<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::config(format!("{name} is not a valid value: {raw}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_default_when_unset() {
        let port: u16 = parse_env("VIVUCHAT_TEST_UNSET_PORT", 8080).unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        env::set_var("VIVUCHAT_TEST_BAD_PORT", "not-a-port");
        let result: AppResult<u16> = parse_env("VIVUCHAT_TEST_BAD_PORT", 8080);
        assert!(result.is_err());
        env::remove_var("VIVUCHAT_TEST_BAD_PORT");
    }
}
