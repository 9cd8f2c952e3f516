// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted completion provider for deterministic testing.
//!
//! Completions are popped from a FIFO queue. When the queue is empty, a
//! default tool-free "mock reply" is returned so loops always terminate.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use zapflow_core::types::{Completion, CompletionRequest, ToolInvocation};
use zapflow_core::{CompletionProvider, ZapflowError};

/// A mock completion provider returning pre-configured completions.
pub struct ScriptedProvider {
    completions: Mutex<VecDeque<Completion>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            completions: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_completions(completions: Vec<Completion>) -> Self {
        Self {
            completions: Mutex::new(VecDeque::from(completions)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A plain text completion with a natural finish.
    pub fn text(text: &str) -> Completion {
        Completion {
            text: text.to_string(),
            tool_calls: vec![],
            stop_reason: Some("end_turn".to_string()),
        }
    }

    /// A completion requesting one tool call, optionally with leading text.
    pub fn tool_call(text: &str, name: &str, input: serde_json::Value) -> Completion {
        Completion {
            text: text.to_string(),
            tool_calls: vec![ToolInvocation {
                id: format!("toolu_{name}_{}", uuid_suffix()),
                name: name.to_string(),
                input,
            }],
            stop_reason: Some("tool_use".to_string()),
        }
    }

    /// Every request the provider has served, for prompt assertions.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    /// Number of completion calls served.
    pub fn calls(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn uuid_suffix() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    format!("{:04}", COUNTER.fetch_add(1, Ordering::Relaxed))
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<Completion, ZapflowError> {
        self.requests.lock().expect("requests lock").push(request);
        let next = self
            .completions
            .lock()
            .expect("completions lock")
            .pop_front();
        Ok(next.unwrap_or_else(|| Self::text("mock reply")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zapflow_core::types::TurnMessage;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "test-model".into(),
            system: "sys".into(),
            messages: vec![TurnMessage::user_text("hi")],
            max_tokens: 128,
            temperature: None,
            tools: vec![],
        }
    }

    #[tokio::test]
    async fn queued_completions_in_order_then_default() {
        let provider = ScriptedProvider::with_completions(vec![
            ScriptedProvider::text("first"),
            ScriptedProvider::text("second"),
        ]);

        assert_eq!(provider.complete(request()).await.unwrap().text, "first");
        assert_eq!(provider.complete(request()).await.unwrap().text, "second");
        assert_eq!(provider.complete(request()).await.unwrap().text, "mock reply");
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn tool_call_completions_carry_invocations() {
        let provider = ScriptedProvider::with_completions(vec![ScriptedProvider::tool_call(
            "sending",
            "send_media",
            serde_json::json!({"kind": "brochure"}),
        )]);

        let completion = provider.complete(request()).await.unwrap();
        assert_eq!(completion.tool_calls.len(), 1);
        assert_eq!(completion.tool_calls[0].name, "send_media");
        assert_eq!(completion.stop_reason.as_deref(), Some("tool_use"));
    }

    #[tokio::test]
    async fn requests_are_recorded_for_assertions() {
        let provider = ScriptedProvider::new();
        provider.complete(request()).await.unwrap();
        let recorded = provider.requests();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].system, "sys");
    }
}
