// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the WhatsApp messaging gateway.
//!
//! The gateway exposes per-instance send routes keyed by an API key
//! header. The typing delay is forwarded so the gateway can show a
//! "typing..." presence before delivery.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;
use zapflow_core::types::MediaKind;
use zapflow_core::{MessagingGateway, ZapflowError};

/// HTTP implementation of [`MessagingGateway`].
#[derive(Debug, Clone)]
pub struct WhatsAppGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct SendTextBody<'a> {
    number: &'a str,
    text: &'a str,
    delay: u64,
}

#[derive(Serialize)]
struct SendMediaBody<'a> {
    number: &'a str,
    mediatype: String,
    media: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    caption: Option<&'a str>,
}

impl WhatsAppGateway {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        route: &str,
        body: &T,
    ) -> Result<(), ZapflowError> {
        let url = format!("{}/{route}", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ZapflowError::Gateway {
                message: format!("request to {url} failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ZapflowError::Gateway {
                message: format!("gateway returned {status}: {body}"),
                source: None,
            });
        }
        debug!(url, "gateway send accepted");
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for WhatsAppGateway {
    async fn send_text(
        &self,
        instance: &str,
        to: &str,
        text: &str,
        typing_ms: u64,
    ) -> Result<(), ZapflowError> {
        self.post_json(
            &format!("message/sendText/{instance}"),
            &SendTextBody {
                number: to,
                text,
                delay: typing_ms,
            },
        )
        .await
    }

    async fn send_media(
        &self,
        instance: &str,
        to: &str,
        url: &str,
        kind: MediaKind,
        caption: Option<&str>,
    ) -> Result<(), ZapflowError> {
        self.post_json(
            &format!("message/sendMedia/{instance}"),
            &SendMediaBody {
                number: to,
                mediatype: kind.to_string(),
                media: url,
                caption,
            },
        )
        .await
    }
}
