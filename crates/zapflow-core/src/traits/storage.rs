// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage traits for the message log and lead records.

use async_trait::async_trait;

use crate::error::ZapflowError;
use crate::lead::{Lead, LeadStatus};
use crate::types::StoredMessage;

/// Append-only log of inbound/outbound messages per conversation.
///
/// This is the shared source of truth the coalescing controller reads;
/// all ordering queries compare the stored timestamp, not insertion order.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append(&self, msg: &StoredMessage) -> Result<(), ZapflowError>;

    async fn get(&self, id: &str) -> Result<Option<StoredMessage>, ZapflowError>;

    /// Number of inbound messages in the conversation with a timestamp
    /// strictly greater than `timestamp_ms`.
    async fn count_inbound_after(
        &self,
        conversation_id: &str,
        timestamp_ms: i64,
    ) -> Result<u64, ZapflowError>;

    /// Last `limit` messages of the conversation in chronological order.
    async fn recent(
        &self,
        conversation_id: &str,
        limit: u32,
    ) -> Result<Vec<StoredMessage>, ZapflowError>;

    /// Last `limit` messages strictly older than `before_ms`, chronological.
    async fn recent_before(
        &self,
        conversation_id: &str,
        before_ms: i64,
        limit: u32,
    ) -> Result<Vec<StoredMessage>, ZapflowError>;

    /// Marks inbound messages up to and including `up_to_ms` as read.
    async fn mark_read(
        &self,
        conversation_id: &str,
        up_to_ms: i64,
    ) -> Result<(), ZapflowError>;
}

/// Lead records, one per counterparty phone number.
///
/// Mutations that pair the status with derived fields are single atomic
/// updates so concurrent writers never observe a partial record.
#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn get(&self, conversation_id: &str) -> Result<Option<Lead>, ZapflowError>;

    async fn upsert(&self, lead: &Lead) -> Result<(), ZapflowError>;

    /// Status -> `proposal` together with the budget value.
    async fn record_proposal(
        &self,
        conversation_id: &str,
        value: f64,
    ) -> Result<(), ZapflowError>;

    /// Status -> `scheduled` together with disabling automation.
    async fn record_scheduled(&self, conversation_id: &str) -> Result<(), ZapflowError>;

    async fn set_status(
        &self,
        conversation_id: &str,
        status: LeadStatus,
    ) -> Result<(), ZapflowError>;
}
