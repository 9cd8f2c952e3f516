// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Claude completion provider for the Zapflow orchestrator.

pub mod client;
pub mod provider;
pub mod types;

pub use client::AnthropicClient;
pub use provider::AnthropicProvider;

use zapflow_config::model::AnthropicConfig;
use zapflow_core::ZapflowError;

/// Builds a provider from the config section, resolving the API key from
/// config first, then the `ANTHROPIC_API_KEY` environment variable.
pub fn provider_from_config(config: &AnthropicConfig) -> Result<AnthropicProvider, ZapflowError> {
    let api_key = config
        .api_key
        .clone()
        .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
        .ok_or_else(|| {
            ZapflowError::Config(
                "anthropic.api_key not set and ANTHROPIC_API_KEY missing".to_string(),
            )
        })?;
    let client = AnthropicClient::new(&api_key, &config.api_version)?;
    Ok(AnthropicProvider::new(client))
}
