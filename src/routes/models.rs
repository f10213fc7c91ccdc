// ABOUTME: Model registry listing and Ollama model lifecycle passthrough endpoints
// ABOUTME: Lifecycle calls are relayed verbatim; the backend's JSON is opaque here
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::database::models::ModelRegistry;
use crate::errors::AppError;
use crate::resources::ServerResources;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::authenticate;

/// Request body for showing model details
#[derive(Debug, Deserialize)]
pub struct ShowModelRequest {
    /// Model name
    pub name: String,
}

/// Request body for copying a model
#[derive(Debug, Deserialize)]
pub struct CopyModelRequest {
    /// Existing model name
    pub source: String,
    /// New model name
    pub destination: String,
}

/// Request body for pulling a model
#[derive(Debug, Deserialize)]
pub struct PullModelRequest {
    /// Model name to pull
    pub name: String,
}

/// Model routes handler
pub struct ModelRoutes;

impl ModelRoutes {
    /// Create the model registry and lifecycle routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/models", get(Self::list_registered))
            .route("/api/ollama/models", get(Self::list_installed))
            .route("/api/ollama/models/running", get(Self::list_running))
            .route("/api/ollama/models/show", post(Self::show))
            .route("/api/ollama/models/copy", post(Self::copy))
            .route("/api/ollama/models/pull", post(Self::pull))
            .route("/api/ollama/models/push", post(Self::push))
            .route("/api/ollama/models/:name", delete(Self::remove))
            .with_state(resources)
    }

    /// Models this server offers for new conversations
    async fn list_registered(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
    ) -> Result<Json<Value>, AppError> {
        authenticate(&headers, &resources)?;

        let registry = ModelRegistry::new(resources.database.pool().clone());
        let models = registry.list_active().await?;
        Ok(Json(json!({ "models": models })))
    }

    /// Models installed on the Ollama backend
    async fn list_installed(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
    ) -> Result<Json<Value>, AppError> {
        authenticate(&headers, &resources)?;
        Ok(Json(resources.ollama.list_models().await?))
    }

    /// Models currently loaded in backend memory
    async fn list_running(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
    ) -> Result<Json<Value>, AppError> {
        authenticate(&headers, &resources)?;
        Ok(Json(resources.ollama.list_running().await?))
    }

    async fn show(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Json(request): Json<ShowModelRequest>,
    ) -> Result<Json<Value>, AppError> {
        authenticate(&headers, &resources)?;
        Ok(Json(resources.ollama.show_model(&request.name).await?))
    }

    async fn copy(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Json(request): Json<CopyModelRequest>,
    ) -> Result<Json<Value>, AppError> {
        authenticate(&headers, &resources)?;
        resources
            .ollama
            .copy_model(&request.source, &request.destination)
            .await?;
        Ok(Json(json!({ "status": "success" })))
    }

    async fn pull(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Json(request): Json<PullModelRequest>,
    ) -> Result<Json<Value>, AppError> {
        authenticate(&headers, &resources)?;
        Ok(Json(resources.ollama.pull_model(&request.name).await?))
    }

    async fn push(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Json(request): Json<PullModelRequest>,
    ) -> Result<Json<Value>, AppError> {
        authenticate(&headers, &resources)?;
        Ok(Json(resources.ollama.push_model(&request.name).await?))
    }

    async fn remove(
        State(resources): State<Arc<ServerResources>>,
        headers: axum::http::HeaderMap,
        Path(name): Path<String>,
    ) -> Result<StatusCode, AppError> {
        authenticate(&headers, &resources)?;
        resources.ollama.delete_model(&name).await?;
        Ok(StatusCode::NO_CONTENT)
    }
}
