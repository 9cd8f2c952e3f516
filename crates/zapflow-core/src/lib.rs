// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Zapflow orchestrator.
//!
//! This crate provides the foundational trait definitions, error type, and
//! domain types used throughout the Zapflow workspace. Adapter crates
//! implement the traits defined here; the agent crate consumes them.

pub mod error;
pub mod lead;
pub mod traits;
pub mod types;

pub use error::ZapflowError;
pub use lead::{Lead, LeadStatus};

pub use traits::{
    CompletionProvider, DocumentExtractor, KnowledgeIndex, LeadStore, MessageStore,
    MessagingGateway, Notifier, Transcriber,
};
