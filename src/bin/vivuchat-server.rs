// ABOUTME: VivuChat server binary: loads config, connects storage, and serves the HTTP API
// ABOUTME: Runs until SIGINT/SIGTERM with graceful shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use vivuchat::auth::AuthManager;
use vivuchat::config::ServerConfig;
use vivuchat::database::models::ModelRegistry;
use vivuchat::database::Database;
use vivuchat::logging;
use vivuchat::ollama::OllamaClient;
use vivuchat::resources::ServerResources;
use vivuchat::routes;

/// VivuChat server command-line arguments
#[derive(Debug, Parser)]
#[command(name = "vivuchat-server", about = "Chat backend relaying to a local Ollama server")]
struct Args {
    /// Override the HTTP listen port (otherwise HTTP_PORT or 8080)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_from_env().context("Failed to initialize logging")?;

    let mut config = ServerConfig::from_env().context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    info!("Configuration loaded: {}", config.summary());

    let database = Database::new(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    let registry = ModelRegistry::new(database.pool().clone());
    registry
        .seed_defaults()
        .await
        .context("Failed to seed model registry")?;

    let ollama =
        OllamaClient::new(config.ollama.clone()).context("Failed to build Ollama client")?;
    let auth = AuthManager::new(
        config.auth.jwt_secret.as_bytes(),
        config.auth.jwt_expiry_hours,
    );

    let port = config.http_port;
    let resources = Arc::new(ServerResources::new(database, ollama, auth, config));
    let app = routes::router(resources);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;
    info!(port = %port, "VivuChat server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("VivuChat server stopped");
    Ok(())
}

/// Resolve when the process receives SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
