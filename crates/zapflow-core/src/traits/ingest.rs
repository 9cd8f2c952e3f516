// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pre-processing collaborators consumed before context assembly.

use async_trait::async_trait;

use crate::error::ZapflowError;
use crate::types::MediaKind;

/// Audio/video transcription service.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(
        &self,
        media_url: &str,
        kind: MediaKind,
    ) -> Result<String, ZapflowError>;
}

/// Document text-extraction service.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract_text(&self, media_url: &str) -> Result<String, ZapflowError>;
}
