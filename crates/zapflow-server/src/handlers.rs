// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the webhook API.
//!
//! `POST /v1/invocations` runs one orchestrator invocation against a
//! freshly-loaded config (hot reload: script/model/debounce edits apply
//! to the next request without a restart). Designed aborts return 200
//! with a status marker; only unclassified errors become 500s, the one
//! case the invoker may retry.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error};
use zapflow_agent::Orchestrator;
use zapflow_config::ZapflowConfig;
use zapflow_core::types::{InvocationRequest, NotificationEvent};
use zapflow_core::{Notifier, ZapflowError};

use crate::server::AppState;

/// Error response body for the generic failure path.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Notifier used when no webhook is configured: events are logged and dropped.
struct NullNotifier;

#[async_trait::async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, event: &NotificationEvent) -> Result<(), ZapflowError> {
        debug!(conversation_id = %event.conversation_id, "notification webhook not configured, dropping event");
        Ok(())
    }
}

/// POST /v1/invocations
pub async fn post_invocations(
    State(state): State<AppState>,
    Json(request): Json<InvocationRequest>,
) -> Response {
    let config = match state.load_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "config load failed");
            return error_response(e.to_string());
        }
    };

    let orchestrator = match build_orchestrator(&state, config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            error!(error = %e, "orchestrator construction failed");
            return error_response(e.to_string());
        }
    };

    match orchestrator.handle(request).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => {
            error!(error = %e, "invocation failed");
            error_response(e.to_string())
        }
    }
}

/// GET /health
pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

fn error_response(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse { error: message }),
    )
        .into_response()
}

/// Wires one orchestrator from the hot-loaded config snapshot. The
/// long-lived store comes from app state; the HTTP collaborators are
/// rebuilt per invocation so endpoint/key edits take effect immediately.
fn build_orchestrator(
    state: &AppState,
    config: ZapflowConfig,
) -> Result<Orchestrator, ZapflowError> {
    let provider = zapflow_anthropic::provider_from_config(&config.anthropic)?;

    let gateway = zapflow_whatsapp::WhatsAppGateway::new(
        &config.gateway.base_url,
        config.gateway.api_key.as_deref().unwrap_or_default(),
    );

    let notifier: Arc<dyn Notifier> = match config.notifications.webhook_url.as_deref() {
        Some(url) => Arc::new(zapflow_whatsapp::WebhookNotifier::new(url)),
        None => Arc::new(NullNotifier),
    };

    let knowledge = config
        .knowledge
        .base_url
        .as_deref()
        .filter(|_| config.knowledge.enabled)
        .map(|url| {
            Arc::new(zapflow_knowledge::RetrievalClient::new(url))
                as Arc<dyn zapflow_core::KnowledgeIndex>
        });

    let transcriber = config.transcription.base_url.as_deref().map(|url| {
        Arc::new(zapflow_whatsapp::TranscriptionClient::new(url))
            as Arc<dyn zapflow_core::Transcriber>
    });

    let extractor = config.extraction.base_url.as_deref().map(|url| {
        Arc::new(zapflow_whatsapp::ExtractionClient::new(url))
            as Arc<dyn zapflow_core::DocumentExtractor>
    });

    Ok(Orchestrator {
        messages: state.store.clone(),
        leads: state.store.clone(),
        provider: Arc::new(provider),
        gateway: Arc::new(gateway),
        notifier,
        knowledge,
        transcriber,
        extractor,
        config,
    })
}
