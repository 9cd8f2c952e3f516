// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp-facing HTTP collaborators: the messaging gateway client,
//! media pre-processing services, and the human-notification webhook.

pub mod gateway;
pub mod media;
pub mod notify;

pub use gateway::WhatsAppGateway;
pub use media::{ExtractionClient, TranscriptionClient};
pub use notify::WebhookNotifier;
