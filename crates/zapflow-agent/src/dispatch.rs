// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound dispatcher: paragraph-split, sequential, humanly-paced delivery.
//!
//! Parts are sent strictly one after another to preserve reading order.
//! A gateway failure skips the send but the message is still persisted:
//! history must reflect intent even when transport fails. No part is
//! retried.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};
use zapflow_core::types::StoredMessage;
use zapflow_core::{MessageStore, MessagingGateway, ZapflowError};

use crate::pacing::Pacing;

/// Splits generated text on blank-line paragraph breaks into non-empty parts.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Delivers one reply as a sequence of paragraph-sized messages.
pub struct Dispatcher {
    conversation_id: String,
    instance: String,
    gateway: Arc<dyn MessagingGateway>,
    messages: Arc<dyn MessageStore>,
    pacing: Pacing,
}

impl Dispatcher {
    pub fn new(
        conversation_id: &str,
        instance: &str,
        gateway: Arc<dyn MessagingGateway>,
        messages: Arc<dyn MessageStore>,
        pacing: Pacing,
    ) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            instance: instance.to_string(),
            gateway,
            messages,
            pacing,
        }
    }

    /// Sends each paragraph in order, persisting every part as an
    /// outbound message. Returns the number of parts delivered.
    pub async fn deliver(&self, text: &str) -> Result<u32, ZapflowError> {
        let parts = split_paragraphs(text);
        let mut sent = 0u32;
        let mut last_ts = 0i64;

        for part in &parts {
            let typing_ms = self.pacing.typing_delay_ms();
            if let Err(e) = self
                .gateway
                .send_text(&self.instance, &self.conversation_id, part, typing_ms)
                .await
            {
                // Reliability over delivery fidelity: record the intent anyway.
                warn!(error = %e, "outbound send failed, persisting message regardless");
            }

            // Strictly increasing timestamps keep the persisted rows in
            // paragraph order even when sends land within one millisecond.
            let mut ts = Utc::now().timestamp_millis();
            if ts <= last_ts {
                ts = last_ts + 1;
            }
            last_ts = ts;

            let record = StoredMessage::outbound_text(
                uuid::Uuid::new_v4().to_string(),
                &self.conversation_id,
                part,
                ts,
            );
            self.messages.append(&record).await?;
            sent += 1;
            debug!(part_index = sent, "paragraph delivered");
        }

        Ok(sent)
    }
}
