// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-notification webhook client.
//!
//! Proposal/scheduling events are pushed here by a spawned task; the
//! caller never waits on the result, and no retry is attempted.

use async_trait::async_trait;
use zapflow_core::types::NotificationEvent;
use zapflow_core::{Notifier, ZapflowError};

/// Posts business events to a configured webhook URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl WebhookNotifier {
    pub fn new(webhook_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: webhook_url.to_string(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, event: &NotificationEvent) -> Result<(), ZapflowError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(event)
            .send()
            .await
            .map_err(|e| ZapflowError::Collaborator {
                message: format!("notification webhook failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ZapflowError::Collaborator {
                message: format!("notification webhook returned {status}"),
                source: None,
            });
        }
        Ok(())
    }
}
