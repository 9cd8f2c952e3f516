// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-notification trait for proposal/scheduling events.

use async_trait::async_trait;

use crate::error::ZapflowError;
use crate::types::NotificationEvent;

/// Pushes a business event to a human-facing summary collaborator.
///
/// Callers invoke this fire-and-forget (spawned task, failure logged);
/// implementations should not retry.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &NotificationEvent) -> Result<(), ZapflowError>;
}
