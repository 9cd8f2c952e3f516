// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./zapflow.toml` > `~/.config/zapflow/zapflow.toml`
//! > `/etc/zapflow/zapflow.toml` with environment variable overrides via the
//! `ZAPFLOW_` prefix. Callers re-load on every invocation, which is what
//! makes script/model/debounce edits apply without a restart.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::ZapflowConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/zapflow/zapflow.toml` (system-wide)
/// 3. `~/.config/zapflow/zapflow.toml` (user XDG config)
/// 4. `./zapflow.toml` (local directory)
/// 5. `ZAPFLOW_*` environment variables
pub fn load_config() -> Result<ZapflowConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ZapflowConfig::default()))
        .merge(Toml::file("/etc/zapflow/zapflow.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("zapflow/zapflow.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("zapflow.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<ZapflowConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ZapflowConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ZapflowConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ZapflowConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Load from an explicit path when given, the XDG hierarchy otherwise,
/// mapped into the workspace error type for callers outside the config
/// crate.
pub fn load_effective(
    path: Option<&Path>,
) -> Result<ZapflowConfig, zapflow_core::ZapflowError> {
    let result = match path {
        Some(p) => load_config_from_path(p),
        None => load_config(),
    };
    result.map_err(|e| zapflow_core::ZapflowError::Config(e.to_string()))
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `ZAPFLOW_GATEWAY_API_KEY` must map to
/// `gateway.api_key`, not `gateway.api.key`.
fn env_provider() -> Env {
    Env::prefixed("ZAPFLOW_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("anthropic_", "anthropic.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("knowledge_", "knowledge.", 1)
            .replacen("pacing_", "pacing.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("server_", "server.", 1)
            .replacen("transcription_", "transcription.", 1)
            .replacen("extraction_", "extraction.", 1)
            .replacen("notifications_", "notifications.", 1);
        mapped.into()
    })
}
