// ABOUTME: User registration and login endpoints issuing JWT session tokens
// ABOUTME: Passwords are bcrypt-hashed; login failures never reveal which field was wrong
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::{AppError, AppResult};
use crate::resources::ServerResources;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Registration request body
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Desired login name
    pub username: String,
    /// Contact email
    pub email: String,
    /// Plaintext password, hashed before storage
    pub password: String,
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login name
    pub username: String,
    /// Plaintext password
    pub password: String,
}

/// Successful authentication response
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// JWT session token
    pub token: String,
    /// Authenticated user ID
    pub user_id: String,
    /// Authenticated username
    pub username: String,
}

/// Authentication routes handler
pub struct AuthRoutes;

impl AuthRoutes {
    /// Create the registration and login routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/auth/register", post(Self::register))
            .route("/auth/login", post(Self::login))
            .with_state(resources)
    }

    async fn register(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<RegisterRequest>,
    ) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
        Self::validate_registration(&request)?;

        let password_hash = bcrypt::hash(&request.password, bcrypt::DEFAULT_COST)
            .map_err(|e| AppError::internal(format!("Failed to hash password: {e}")))?;

        let user = resources
            .database
            .create_user(&request.username, &request.email, &password_hash)
            .await?;

        let user_id = Uuid::parse_str(&user.id)
            .map_err(|e| AppError::internal(format!("Stored user id is not a UUID: {e}")))?;
        let token = resources.auth.generate_token(user_id, &user.username)?;

        info!(user.id = %user.id, username = %user.username, "User registered");

        Ok((
            StatusCode::CREATED,
            Json(AuthResponse {
                token,
                user_id: user.id,
                username: user.username,
            }),
        ))
    }

    async fn login(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<LoginRequest>,
    ) -> Result<Json<AuthResponse>, AppError> {
        let user = resources
            .database
            .get_user_by_username(&request.username)
            .await?
            .ok_or_else(|| AppError::auth_invalid("Invalid username or password"))?;

        let valid = bcrypt::verify(&request.password, &user.password_hash)
            .map_err(|e| AppError::internal(format!("Failed to verify password: {e}")))?;
        if !valid {
            return Err(AppError::auth_invalid("Invalid username or password"));
        }

        let user_id = Uuid::parse_str(&user.id)
            .map_err(|e| AppError::internal(format!("Stored user id is not a UUID: {e}")))?;
        let token = resources.auth.generate_token(user_id, &user.username)?;

        info!(user.id = %user.id, username = %user.username, "User logged in");

        Ok(Json(AuthResponse {
            token,
            user_id: user.id,
            username: user.username,
        }))
    }

    fn validate_registration(request: &RegisterRequest) -> AppResult<()> {
        if request.username.trim().is_empty() {
            return Err(AppError::invalid_input("Username cannot be empty"));
        }
        if request.password.len() < 8 {
            return Err(AppError::invalid_input(
                "Password must be at least 8 characters",
            ));
        }
        if !request.email.contains('@') {
            return Err(AppError::invalid_input("Email address is not valid"));
        }
        Ok(())
    }
}
