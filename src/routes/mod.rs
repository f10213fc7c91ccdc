// ABOUTME: HTTP route modules and top-level router assembly
// ABOUTME: Merges all route groups and applies the shared tracing and CORS layers
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # HTTP Routes
//!
//! Each route group is a struct with a `routes(Arc<ServerResources>)`
//! constructor; [`router`] merges them and applies the shared middleware.

/// Registration and login
pub mod auth;
/// Conversation CRUD and messaging
pub mod chat;
/// Direct completion relay
pub mod completions;
/// Health and readiness probes
pub mod health;
/// Model registry and lifecycle passthrough
pub mod models;

use crate::auth::AuthResult;
use crate::errors::AppError;
use crate::resources::ServerResources;
use axum::http::HeaderMap;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Authenticate a request from its `Authorization` header
pub(crate) fn authenticate(
    headers: &HeaderMap,
    resources: &Arc<ServerResources>,
) -> Result<AuthResult, AppError> {
    let auth_header = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok());
    resources.auth.authenticate_request(auth_header)
}

/// Assemble the full application router
pub fn router(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .merge(health::HealthRoutes::routes(resources.clone()))
        .merge(auth::AuthRoutes::routes(resources.clone()))
        .merge(chat::ChatRoutes::routes(resources.clone()))
        .merge(completions::CompletionRoutes::routes(resources.clone()))
        .merge(models::ModelRoutes::routes(resources))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
