// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completion provider trait for LLM integrations.

use async_trait::async_trait;

use crate::error::ZapflowError;
use crate::types::{Completion, CompletionRequest};

/// Adapter for LLM completion services.
///
/// The orchestrator consumes whole completions; streaming is a provider
/// concern it deliberately does not depend on.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest)
        -> Result<Completion, ZapflowError>;
}
