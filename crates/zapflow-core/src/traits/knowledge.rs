// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge retrieval trait for context augmentation.

use async_trait::async_trait;

use crate::error::ZapflowError;
use crate::types::Snippet;

/// Semantic document-retrieval service (embedding + nearest-neighbor
/// search happens on the service side).
#[async_trait]
pub trait KnowledgeIndex: Send + Sync {
    /// Returns up to `top_k` snippets scored by similarity, best first.
    async fn search(&self, query: &str, top_k: u32) -> Result<Vec<Snippet>, ZapflowError>;
}
