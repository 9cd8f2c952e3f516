// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Zapflow orchestrator.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at load time. Every section is optional and defaults to
//! sensible values; the whole tree is re-read on each invocation so edits
//! apply without a restart.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use zapflow_core::types::MediaKind;

/// Top-level Zapflow configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ZapflowConfig {
    /// Orchestrator behavior: debounce, loop bounds, script, timezone.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Anthropic API settings.
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Messaging gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Knowledge retrieval settings.
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Symbolic media catalog for the send_media tool.
    #[serde(default)]
    pub media: MediaConfig,

    /// Humanization delay ranges.
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Webhook server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Audio/video transcription collaborator.
    #[serde(default)]
    pub transcription: CollaboratorConfig,

    /// Document text-extraction collaborator.
    #[serde(default)]
    pub extraction: CollaboratorConfig,

    /// Human-notification webhook.
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// Orchestrator behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Debounce window for message-fragmentation coalescing, in seconds.
    #[serde(default = "default_debounce_secs")]
    pub debounce_secs: u64,

    /// Hard cap on agent-loop iterations.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Number of prior messages reconstructed into context.
    #[serde(default = "default_history_window")]
    pub history_window: u32,

    /// Inline business script. Overridden by `script_file` if both set.
    #[serde(default)]
    pub script: Option<String>,

    /// Path to a file containing the business script.
    /// Takes precedence over `script` if both are set.
    #[serde(default)]
    pub script_file: Option<String>,

    /// Operator timezone as a fixed UTC offset in hours.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            debounce_secs: default_debounce_secs(),
            max_iterations: default_max_iterations(),
            history_window: default_history_window(),
            script: None,
            script_file: None,
            utc_offset_hours: default_utc_offset_hours(),
        }
    }
}

fn default_debounce_secs() -> u64 {
    10
}

fn default_max_iterations() -> u32 {
    5
}

fn default_history_window() -> u32 {
    20
}

fn default_utc_offset_hours() -> i32 {
    -3
}

/// Anthropic API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnthropicConfig {
    /// Anthropic API key. `None` requires the environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model to use for completion requests.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens to generate per completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature.
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Anthropic API version string.
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: None,
            api_version: default_api_version(),
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

/// Messaging gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Base URL of the gateway HTTP API.
    #[serde(default = "default_gateway_base_url")]
    pub base_url: String,

    /// Gateway API key.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Instance used when neither the request nor the lead names one.
    #[serde(default = "default_instance")]
    pub default_instance: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_base_url(),
            api_key: None,
            default_instance: default_instance(),
        }
    }
}

fn default_gateway_base_url() -> String {
    "http://127.0.0.1:8081".to_string()
}

fn default_instance() -> String {
    "main".to_string()
}

/// Knowledge retrieval configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KnowledgeConfig {
    /// Enable knowledge augmentation. When false, no retrieval occurs.
    #[serde(default = "default_knowledge_enabled")]
    pub enabled: bool,

    /// Base URL of the retrieval service. `None` disables retrieval.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Minimum similarity for a snippet to enter context.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Maximum snippets appended to context.
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    /// Queries at or below this length skip retrieval.
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            enabled: default_knowledge_enabled(),
            base_url: None,
            similarity_threshold: default_similarity_threshold(),
            top_k: default_top_k(),
            min_query_len: default_min_query_len(),
        }
    }
}

fn default_knowledge_enabled() -> bool {
    true
}

fn default_similarity_threshold() -> f64 {
    0.75
}

fn default_top_k() -> u32 {
    3
}

fn default_min_query_len() -> usize {
    5
}

/// Symbolic media catalog: tool-facing kind -> fixed hosted media.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MediaConfig {
    #[serde(default)]
    pub catalog: HashMap<String, MediaCatalogEntry>,
}

/// One entry of the media catalog.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MediaCatalogEntry {
    pub url: String,
    pub kind: MediaKind,
}

/// Humanization delay ranges, in seconds. Tests set these to zero.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PacingConfig {
    #[serde(default = "default_media_delay_min")]
    pub media_delay_min_secs: u64,

    #[serde(default = "default_media_delay_max")]
    pub media_delay_max_secs: u64,

    #[serde(default = "default_typing_delay_min")]
    pub typing_delay_min_secs: u64,

    #[serde(default = "default_typing_delay_max")]
    pub typing_delay_max_secs: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            media_delay_min_secs: default_media_delay_min(),
            media_delay_max_secs: default_media_delay_max(),
            typing_delay_min_secs: default_typing_delay_min(),
            typing_delay_max_secs: default_typing_delay_max(),
        }
    }
}

impl PacingConfig {
    /// All-zero pacing for tests.
    pub fn zero() -> Self {
        Self {
            media_delay_min_secs: 0,
            media_delay_max_secs: 0,
            typing_delay_min_secs: 0,
            typing_delay_max_secs: 0,
        }
    }
}

fn default_media_delay_min() -> u64 {
    4
}

fn default_media_delay_max() -> u64 {
    8
}

fn default_typing_delay_min() -> u64 {
    4
}

fn default_typing_delay_max() -> u64 {
    9
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("zapflow").join("zapflow.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("zapflow.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Webhook server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// A generic HTTP collaborator endpoint. `None` disables it.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CollaboratorConfig {
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Human-notification webhook configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
}
