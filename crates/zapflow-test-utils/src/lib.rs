// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Zapflow integration tests: scripted provider,
//! recording gateway, mock collaborators, and a temp-SQLite harness.

pub mod collaborators;
pub mod harness;
pub mod mock_gateway;
pub mod mock_provider;

pub use collaborators::{
    CountingNotifier, FixedExtractor, FixedTranscriber, StaticKnowledge,
};
pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_gateway::{RecordingGateway, SentItem};
pub use mock_provider::ScriptedProvider;
