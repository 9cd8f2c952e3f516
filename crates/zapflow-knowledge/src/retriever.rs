// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the semantic document-retrieval service.
//!
//! Embedding and nearest-neighbor search happen on the service side; the
//! client sends a query and receives scored snippets, best first. The
//! context assembler applies the similarity threshold and top-k cap.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use zapflow_core::types::Snippet;
use zapflow_core::{KnowledgeIndex, ZapflowError};

#[derive(Serialize)]
struct SearchBody<'a> {
    query: &'a str,
    top_k: u32,
}

#[derive(Deserialize)]
struct SearchResponse {
    results: Vec<Snippet>,
}

/// HTTP implementation of [`KnowledgeIndex`].
#[derive(Debug, Clone)]
pub struct RetrievalClient {
    client: reqwest::Client,
    base_url: String,
}

impl RetrievalClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl KnowledgeIndex for RetrievalClient {
    async fn search(&self, query: &str, top_k: u32) -> Result<Vec<Snippet>, ZapflowError> {
        let url = format!("{}/v1/search", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&SearchBody { query, top_k })
            .send()
            .await
            .map_err(|e| ZapflowError::Collaborator {
                message: format!("retrieval request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ZapflowError::Collaborator {
                message: format!("retrieval service returned {status}"),
                source: None,
            });
        }

        let body: SearchResponse =
            response.json().await.map_err(|e| ZapflowError::Collaborator {
                message: format!("invalid retrieval response: {e}"),
                source: Some(Box::new(e)),
            })?;

        let mut snippets = body.results;
        // Defensive re-sort: the assembler assumes best-first ordering.
        snippets.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(snippets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn search_returns_snippets_best_first() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/search"))
            .and(body_partial_json(serde_json::json!({
                "query": "financing conditions",
                "top_k": 3
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {"content": "20% down payment", "score": 0.62},
                    {"content": "Financing up to 30 years", "score": 0.91}
                ]
            })))
            .mount(&server)
            .await;

        let client = RetrievalClient::new(&server.uri());
        let snippets = client.search("financing conditions", 3).await.unwrap();
        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].content, "Financing up to 30 years");
        assert!(snippets[0].score > snippets[1].score);
    }

    #[tokio::test]
    async fn service_failure_is_an_error_the_assembler_swallows() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = RetrievalClient::new(&server.uri());
        assert!(client.search("anything", 3).await.is_err());
    }
}
