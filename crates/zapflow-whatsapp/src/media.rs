// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media pre-processing collaborators consumed before context assembly.
//!
//! Audio and video become text via the transcription service; documents
//! become text via the extraction service. Images are NOT handled here:
//! they pass through to the model as vision content.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use zapflow_core::types::MediaKind;
use zapflow_core::{DocumentExtractor, Transcriber, ZapflowError};

#[derive(Serialize)]
struct TranscribeBody<'a> {
    url: &'a str,
    kind: String,
}

#[derive(Deserialize)]
struct TextResponse {
    text: String,
}

/// HTTP client for the audio/video transcription service.
#[derive(Debug, Clone)]
pub struct TranscriptionClient {
    client: reqwest::Client,
    base_url: String,
}

impl TranscriptionClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Transcriber for TranscriptionClient {
    async fn transcribe(
        &self,
        media_url: &str,
        kind: MediaKind,
    ) -> Result<String, ZapflowError> {
        let url = format!("{}/v1/transcriptions", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&TranscribeBody {
                url: media_url,
                kind: kind.to_string(),
            })
            .send()
            .await
            .map_err(|e| ZapflowError::Collaborator {
                message: format!("transcription request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ZapflowError::Collaborator {
                message: format!("transcription service returned {status}"),
                source: None,
            });
        }

        let body: TextResponse =
            response.json().await.map_err(|e| ZapflowError::Collaborator {
                message: format!("invalid transcription response: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(body.text)
    }
}

/// HTTP client for the document text-extraction service.
#[derive(Debug, Clone)]
pub struct ExtractionClient {
    client: reqwest::Client,
    base_url: String,
}

impl ExtractionClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl DocumentExtractor for ExtractionClient {
    async fn extract_text(&self, media_url: &str) -> Result<String, ZapflowError> {
        let url = format!("{}/v1/extractions", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "url": media_url }))
            .send()
            .await
            .map_err(|e| ZapflowError::Collaborator {
                message: format!("extraction request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ZapflowError::Collaborator {
                message: format!("extraction service returned {status}"),
                source: None,
            });
        }

        let body: TextResponse =
            response.json().await.map_err(|e| ZapflowError::Collaborator {
                message: format!("invalid extraction response: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(body.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn transcribe_posts_url_and_kind() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/transcriptions"))
            .and(body_partial_json(serde_json::json!({
                "url": "https://cdn.example.com/voice.ogg",
                "kind": "audio"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"text": "quero agendar uma visita"})),
            )
            .mount(&server)
            .await;

        let client = TranscriptionClient::new(&server.uri());
        let text = client
            .transcribe("https://cdn.example.com/voice.ogg", MediaKind::Audio)
            .await
            .unwrap();
        assert_eq!(text, "quero agendar uma visita");
    }

    #[tokio::test]
    async fn extraction_error_status_propagates() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/extractions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = ExtractionClient::new(&server.uri());
        let err = client
            .extract_text("https://cdn.example.com/doc.pdf")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"), "got: {err}");
    }
}
