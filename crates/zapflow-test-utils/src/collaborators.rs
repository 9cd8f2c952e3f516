// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock collaborators: notifier, knowledge index, transcription/extraction.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use zapflow_core::types::{MediaKind, NotificationEvent, Snippet};
use zapflow_core::{
    DocumentExtractor, KnowledgeIndex, Notifier, Transcriber, ZapflowError,
};

/// Collects every notification event it receives.
#[derive(Default)]
pub struct CountingNotifier {
    events: Mutex<Vec<NotificationEvent>>,
}

impl CountingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().expect("events lock").clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().expect("events lock").len()
    }
}

#[async_trait]
impl Notifier for CountingNotifier {
    async fn notify(&self, event: &NotificationEvent) -> Result<(), ZapflowError> {
        self.events.lock().expect("events lock").push(event.clone());
        Ok(())
    }
}

/// Serves a fixed snippet list, or fails on demand.
pub struct StaticKnowledge {
    snippets: Vec<Snippet>,
    fail: bool,
    calls: AtomicU32,
}

impl StaticKnowledge {
    pub fn new(snippets: Vec<Snippet>) -> Self {
        Self {
            snippets,
            fail: false,
            calls: AtomicU32::new(0),
        }
    }

    /// A knowledge index whose every search errors.
    pub fn failing() -> Self {
        Self {
            snippets: Vec::new(),
            fail: true,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KnowledgeIndex for StaticKnowledge {
    async fn search(&self, _query: &str, top_k: u32) -> Result<Vec<Snippet>, ZapflowError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ZapflowError::Collaborator {
                message: "injected retrieval failure".to_string(),
                source: None,
            });
        }
        Ok(self.snippets.iter().take(top_k as usize).cloned().collect())
    }
}

/// Returns a fixed transcript for any media.
pub struct FixedTranscriber {
    pub text: String,
}

#[async_trait]
impl Transcriber for FixedTranscriber {
    async fn transcribe(
        &self,
        _media_url: &str,
        _kind: MediaKind,
    ) -> Result<String, ZapflowError> {
        Ok(self.text.clone())
    }
}

/// Returns a fixed extracted text for any document.
pub struct FixedExtractor {
    pub text: String,
}

#[async_trait]
impl DocumentExtractor for FixedExtractor {
    async fn extract_text(&self, _media_url: &str) -> Result<String, ZapflowError> {
        Ok(self.text.clone())
    }
}
