// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook HTTP server built on axum.
//!
//! Routes, shared state, and serve loop. Each request runs as its own
//! task, which is what lets burst invocations for one conversation
//! overlap and settle through the coalescing gate.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use zapflow_config::ZapflowConfig;
use zapflow_core::ZapflowError;
use zapflow_storage::SqliteStore;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Long-lived store; the sqlite writer thread is shared across requests.
    pub store: Arc<SqliteStore>,
    /// Process start time for uptime reporting.
    pub start_time: Instant,
    /// Explicit config file, when the CLI was given one; otherwise the
    /// XDG hierarchy is consulted on every load.
    pub config_path: Option<PathBuf>,
}

impl AppState {
    pub fn new(store: Arc<SqliteStore>, config_path: Option<PathBuf>) -> Self {
        Self {
            store,
            start_time: Instant::now(),
            config_path,
        }
    }

    /// Re-reads configuration for the current request (hot reload).
    pub fn load_config(&self) -> Result<ZapflowConfig, ZapflowError> {
        zapflow_config::load_effective(self.config_path.as_deref())
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/invocations", post(handlers::post_invocations))
        .route("/health", get(handlers::get_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds and serves until the process exits.
pub async fn start_server(
    host: &str,
    port: u16,
    state: AppState,
) -> Result<(), ZapflowError> {
    let app = router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ZapflowError::Internal(format!("failed to bind server to {addr}: {e}")))?;

    tracing::info!("webhook server listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| ZapflowError::Internal(format!("server error: {e}")))?;

    Ok(())
}
