// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serve loop: open storage, build app state, run the webhook server.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use zapflow_config::ZapflowConfig;
use zapflow_core::ZapflowError;
use zapflow_server::AppState;
use zapflow_storage::SqliteStore;

/// Opens the database and serves until the process is stopped.
pub async fn run(
    config: ZapflowConfig,
    config_path: Option<PathBuf>,
) -> Result<(), ZapflowError> {
    let store = Arc::new(SqliteStore::open(&config.storage).await?);
    info!(
        database = config.storage.database_path.as_str(),
        "storage ready"
    );

    let state = AppState::new(store, config_path);
    zapflow_server::start_server(&config.server.host, config.server.port, state).await
}
