// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Coalescing controller: decides whether this invocation answers a burst.
//!
//! When a user sends several message fragments in quick succession, each
//! fragment triggers an independent invocation. Only the one triggered by
//! the burst's final fragment may answer, and it answers using the final
//! state of the burst. There is no lock: correctness relies solely on
//! timestamp comparison against the shared message store.

use std::time::Duration;

use tracing::{debug, warn};
use zapflow_core::types::StoredMessage;
use zapflow_core::{MessageStore, ZapflowError};

/// Backoff schedule for the trigger-visibility retries, tolerating
/// read-after-write lag in the store.
const LOOKUP_BACKOFF: [Duration; 3] = [
    Duration::from_millis(250),
    Duration::from_millis(500),
    Duration::from_millis(1000),
];

/// Tri-state outcome of the coalescing gate.
#[derive(Debug, Clone)]
pub enum GateDecision {
    /// This invocation is the authoritative responder for the burst.
    Proceed { trigger: StoredMessage },
    /// The triggering message never became visible; abort cleanly.
    TriggerNotFound,
    /// A later inbound message exists; its invocation will answer.
    Superseded { newer_count: u64 },
}

/// Runs the debounce-then-check gate for one invocation.
///
/// 1. Sleep the debounce window to let fragments arrive.
/// 2. Re-fetch the triggering message, retrying on read lag.
/// 3. Count inbound messages with a strictly later timestamp; any means
///    a later invocation owns the burst and this one yields.
pub async fn gate(
    store: &dyn MessageStore,
    conversation_id: &str,
    trigger_id: &str,
    debounce: Duration,
) -> Result<GateDecision, ZapflowError> {
    if !debounce.is_zero() {
        tokio::time::sleep(debounce).await;
    }

    let Some(trigger) = fetch_with_retry(store, trigger_id).await? else {
        warn!(trigger_id, "trigger message never became visible");
        return Ok(GateDecision::TriggerNotFound);
    };

    let newer_count = store
        .count_inbound_after(conversation_id, trigger.timestamp_ms)
        .await?;

    if newer_count > 0 {
        debug!(trigger_id, newer_count, "superseded by a later message");
        return Ok(GateDecision::Superseded { newer_count });
    }

    Ok(GateDecision::Proceed { trigger })
}

async fn fetch_with_retry(
    store: &dyn MessageStore,
    trigger_id: &str,
) -> Result<Option<StoredMessage>, ZapflowError> {
    if let Some(msg) = store.get(trigger_id).await? {
        return Ok(Some(msg));
    }
    for (attempt, backoff) in LOOKUP_BACKOFF.iter().enumerate() {
        debug!(trigger_id, attempt, "trigger not yet visible, retrying");
        tokio::time::sleep(*backoff).await;
        if let Some(msg) = store.get(trigger_id).await? {
            return Ok(Some(msg));
        }
    }
    Ok(None)
}
