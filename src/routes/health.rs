// ABOUTME: Health and readiness endpoints for deployment probes
// ABOUTME: Liveness is unconditional; readiness checks the database connection
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::AppError;
use crate::resources::ServerResources;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;

/// Health routes handler
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create the health and readiness routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/health", get(Self::health))
            .route("/ready", get(Self::ready))
            .with_state(resources)
    }

    /// Liveness probe
    async fn health() -> Json<serde_json::Value> {
        Json(json!({
            "status": "ok",
            "service": crate::constants::service_names::VIVUCHAT_SERVER,
            "version": env!("CARGO_PKG_VERSION"),
        }))
    }

    /// Readiness probe, fails while the database is unreachable
    async fn ready(
        State(resources): State<Arc<ServerResources>>,
    ) -> Result<Json<serde_json::Value>, AppError> {
        sqlx::query("SELECT 1")
            .execute(resources.database.pool())
            .await
            .map_err(|e| AppError::database(format!("Readiness check failed: {e}")))?;

        Ok(Json(json!({ "status": "ready" })))
    }
}
