// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness: temp SQLite + mock collaborators + zeroed delays.
//!
//! Each harness is fully isolated; building one per test keeps tests
//! independent and order-insensitive.

use std::sync::Arc;

use zapflow_agent::Orchestrator;
use zapflow_config::model::MediaCatalogEntry;
use zapflow_config::ZapflowConfig;
use zapflow_core::types::{
    Completion, Direction, MediaKind, StoredMessage,
};
use zapflow_core::{MessageStore, ZapflowError};
use zapflow_storage::SqliteStore;

use crate::collaborators::{CountingNotifier, StaticKnowledge};
use crate::mock_gateway::RecordingGateway;
use crate::mock_provider::ScriptedProvider;

/// A fully-wired test environment around a temp SQLite database.
pub struct TestHarness {
    pub store: Arc<SqliteStore>,
    pub gateway: Arc<RecordingGateway>,
    pub notifier: Arc<CountingNotifier>,
    pub provider: Arc<ScriptedProvider>,
    pub knowledge: Option<Arc<StaticKnowledge>>,
    pub config: ZapflowConfig,
    _dir: tempfile::TempDir,
}

/// Builder mirroring the harness fields that vary per test.
#[derive(Default)]
pub struct TestHarnessBuilder {
    completions: Vec<Completion>,
    knowledge: Option<StaticKnowledge>,
    config_overrides: Option<Box<dyn FnOnce(&mut ZapflowConfig) + Send>>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::default()
    }

    /// An orchestrator wired to this harness's mocks and config snapshot.
    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator {
            messages: self.store.clone(),
            leads: self.store.clone(),
            provider: self.provider.clone(),
            gateway: self.gateway.clone(),
            notifier: self.notifier.clone(),
            knowledge: self
                .knowledge
                .clone()
                .map(|k| k as Arc<dyn zapflow_core::KnowledgeIndex>),
            transcriber: None,
            extractor: None,
            config: self.config.clone(),
        }
    }

    /// Persists an inbound message, as the webhook collaborator would
    /// before invoking the orchestrator.
    pub async fn seed_inbound(
        &self,
        id: &str,
        conversation_id: &str,
        text: &str,
        timestamp_ms: i64,
    ) -> Result<(), ZapflowError> {
        self.store
            .append(&StoredMessage {
                id: id.to_string(),
                conversation_id: conversation_id.to_string(),
                direction: Direction::Inbound,
                text: Some(text.to_string()),
                media_url: None,
                media_kind: None,
                timestamp_ms,
                read: false,
            })
            .await
    }

    /// All persisted outbound messages of a conversation, in timestamp order.
    pub async fn outbound_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<StoredMessage>, ZapflowError> {
        let all = self.store.recent(conversation_id, 500).await?;
        Ok(all
            .into_iter()
            .filter(|m| m.direction == Direction::Outbound)
            .collect())
    }
}

impl TestHarnessBuilder {
    /// Queue the provider's scripted completions.
    pub fn with_completions(mut self, completions: Vec<Completion>) -> Self {
        self.completions = completions;
        self
    }

    /// Attach a knowledge index mock.
    pub fn with_knowledge(mut self, knowledge: StaticKnowledge) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    /// Mutate the config after test defaults are applied.
    pub fn with_config(
        mut self,
        mutate: impl FnOnce(&mut ZapflowConfig) + Send + 'static,
    ) -> Self {
        self.config_overrides = Some(Box::new(mutate));
        self
    }

    pub async fn build(self) -> Result<TestHarness, ZapflowError> {
        let dir = tempfile::tempdir().map_err(|e| ZapflowError::Storage {
            source: Box::new(e),
        })?;

        let mut config = ZapflowConfig::default();
        config.storage.database_path = dir
            .path()
            .join("harness.db")
            .to_string_lossy()
            .into_owned();
        // Tests run the real pipeline with no artificial waiting.
        config.agent.debounce_secs = 0;
        config.pacing = zapflow_config::model::PacingConfig::zero();
        config.media.catalog.insert(
            "brochure".to_string(),
            MediaCatalogEntry {
                url: "https://cdn.example.com/brochure.pdf".to_string(),
                kind: MediaKind::Document,
            },
        );
        config.media.catalog.insert(
            "tour".to_string(),
            MediaCatalogEntry {
                url: "https://cdn.example.com/tour.mp4".to_string(),
                kind: MediaKind::Video,
            },
        );
        if let Some(mutate) = self.config_overrides {
            mutate(&mut config);
        }

        let store = Arc::new(SqliteStore::open(&config.storage).await?);

        Ok(TestHarness {
            store,
            gateway: Arc::new(RecordingGateway::new()),
            notifier: Arc::new(CountingNotifier::new()),
            provider: Arc::new(ScriptedProvider::with_completions(self.completions)),
            knowledge: self.knowledge.map(Arc::new),
            config,
            _dir: dir,
        })
    }
}
