// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Zapflow orchestrator.
//!
//! Layered TOML + environment loading via Figment. The whole tree is
//! cheap to re-read, and callers do so per invocation: the business
//! script, model parameters, and debounce window are hot-reloadable.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str, load_effective};
pub use model::ZapflowConfig;
