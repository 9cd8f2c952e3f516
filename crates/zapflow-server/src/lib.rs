// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook HTTP server exposing the Zapflow invocation contract.

pub mod handlers;
pub mod server;

pub use server::{router, start_server, AppState};
