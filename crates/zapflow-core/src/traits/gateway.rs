// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging gateway trait for outbound delivery.

use async_trait::async_trait;

use crate::error::ZapflowError;
use crate::types::MediaKind;

/// Outbound side of the messaging gateway, addressed by instance name.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Sends a text message. `typing_ms` is forwarded to the gateway as a
    /// typing-presence hint so delivery looks humanly paced.
    async fn send_text(
        &self,
        instance: &str,
        to: &str,
        text: &str,
        typing_ms: u64,
    ) -> Result<(), ZapflowError>;

    /// Sends a hosted media item with an optional caption.
    async fn send_media(
        &self,
        instance: &str,
        to: &str,
        url: &str,
        kind: MediaKind,
        caption: Option<&str>,
    ) -> Result<(), ZapflowError>;
}
