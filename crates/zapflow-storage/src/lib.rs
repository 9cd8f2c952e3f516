// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Zapflow orchestrator.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, and the
//! [`MessageStore`]/[`LeadStore`] implementations the agent consumes.

pub mod database;
pub mod migrations;
pub mod queries;

use async_trait::async_trait;
use zapflow_config::model::StorageConfig;
use zapflow_core::lead::{Lead, LeadStatus};
use zapflow_core::types::StoredMessage;
use zapflow_core::{LeadStore, MessageStore, ZapflowError};

pub use database::Database;

/// SQLite-backed implementation of both storage traits.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Opens the database described by the storage config section.
    pub async fn open(config: &StorageConfig) -> Result<Self, ZapflowError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        Ok(Self { db })
    }

    /// Wraps an already-open database handle.
    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn append(&self, msg: &StoredMessage) -> Result<(), ZapflowError> {
        queries::messages::insert_message(&self.db, msg).await
    }

    async fn get(&self, id: &str) -> Result<Option<StoredMessage>, ZapflowError> {
        queries::messages::get_message(&self.db, id).await
    }

    async fn count_inbound_after(
        &self,
        conversation_id: &str,
        timestamp_ms: i64,
    ) -> Result<u64, ZapflowError> {
        queries::messages::count_inbound_after(&self.db, conversation_id, timestamp_ms).await
    }

    async fn recent(
        &self,
        conversation_id: &str,
        limit: u32,
    ) -> Result<Vec<StoredMessage>, ZapflowError> {
        queries::messages::recent_messages(&self.db, conversation_id, limit).await
    }

    async fn recent_before(
        &self,
        conversation_id: &str,
        before_ms: i64,
        limit: u32,
    ) -> Result<Vec<StoredMessage>, ZapflowError> {
        queries::messages::recent_messages_before(&self.db, conversation_id, before_ms, limit)
            .await
    }

    async fn mark_read(
        &self,
        conversation_id: &str,
        up_to_ms: i64,
    ) -> Result<(), ZapflowError> {
        queries::messages::mark_read_up_to(&self.db, conversation_id, up_to_ms).await
    }
}

#[async_trait]
impl LeadStore for SqliteStore {
    async fn get(&self, conversation_id: &str) -> Result<Option<Lead>, ZapflowError> {
        queries::leads::get_lead(&self.db, conversation_id).await
    }

    async fn upsert(&self, lead: &Lead) -> Result<(), ZapflowError> {
        queries::leads::upsert_lead(&self.db, lead).await
    }

    async fn record_proposal(
        &self,
        conversation_id: &str,
        value: f64,
    ) -> Result<(), ZapflowError> {
        queries::leads::record_proposal(&self.db, conversation_id, value).await
    }

    async fn record_scheduled(&self, conversation_id: &str) -> Result<(), ZapflowError> {
        queries::leads::record_scheduled(&self.db, conversation_id).await
    }

    async fn set_status(
        &self,
        conversation_id: &str,
        status: LeadStatus,
    ) -> Result<(), ZapflowError> {
        queries::leads::set_status(&self.db, conversation_id, status).await
    }
}
