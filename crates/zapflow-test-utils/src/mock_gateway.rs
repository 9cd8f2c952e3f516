// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording messaging gateway with injectable failure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use zapflow_core::types::MediaKind;
use zapflow_core::{MessagingGateway, ZapflowError};

/// One captured gateway send.
#[derive(Debug, Clone, PartialEq)]
pub enum SentItem {
    Text {
        instance: String,
        to: String,
        text: String,
        typing_ms: u64,
    },
    Media {
        instance: String,
        to: String,
        url: String,
        kind: MediaKind,
        caption: Option<String>,
    },
}

/// Captures every send; optionally fails them all.
#[derive(Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<SentItem>>,
    fail_sends: AtomicBool,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every send returns a gateway error (after recording the
    /// attempt), exercising the log-and-persist-anyway paths.
    pub fn set_failing(&self, failing: bool) {
        self.fail_sends.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentItem> {
        self.sent.lock().expect("sent lock").clone()
    }

    /// Text payloads in send order.
    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|item| match item {
                SentItem::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Number of media dispatches.
    pub fn media_count(&self) -> usize {
        self.sent()
            .iter()
            .filter(|item| matches!(item, SentItem::Media { .. }))
            .count()
    }

    fn maybe_fail(&self) -> Result<(), ZapflowError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(ZapflowError::Gateway {
                message: "injected gateway failure".to_string(),
                source: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for RecordingGateway {
    async fn send_text(
        &self,
        instance: &str,
        to: &str,
        text: &str,
        typing_ms: u64,
    ) -> Result<(), ZapflowError> {
        self.sent.lock().expect("sent lock").push(SentItem::Text {
            instance: instance.to_string(),
            to: to.to_string(),
            text: text.to_string(),
            typing_ms,
        });
        self.maybe_fail()
    }

    async fn send_media(
        &self,
        instance: &str,
        to: &str,
        url: &str,
        kind: MediaKind,
        caption: Option<&str>,
    ) -> Result<(), ZapflowError> {
        self.sent.lock().expect("sent lock").push(SentItem::Media {
            instance: instance.to_string(),
            to: to.to_string(),
            url: url.to_string(),
            kind,
            caption: caption.map(str::to_string),
        });
        self.maybe_fail()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_sends_in_order() {
        let gateway = RecordingGateway::new();
        gateway.send_text("main", "c1", "one", 0).await.unwrap();
        gateway
            .send_media("main", "c1", "https://x/y.pdf", MediaKind::Document, None)
            .await
            .unwrap();
        gateway.send_text("main", "c1", "two", 0).await.unwrap();

        assert_eq!(gateway.texts(), vec!["one", "two"]);
        assert_eq!(gateway.media_count(), 1);
        assert_eq!(gateway.sent().len(), 3);
    }

    #[tokio::test]
    async fn failing_mode_records_then_errors() {
        let gateway = RecordingGateway::new();
        gateway.set_failing(true);
        let result = gateway.send_text("main", "c1", "doomed", 0).await;
        assert!(result.is_err());
        assert_eq!(gateway.texts(), vec!["doomed"]);
    }
}
