// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits defining the seams between the orchestrator core and
//! its external collaborators.

pub mod gateway;
pub mod ingest;
pub mod knowledge;
pub mod notify;
pub mod provider;
pub mod storage;

pub use gateway::MessagingGateway;
pub use ingest::{DocumentExtractor, Transcriber};
pub use knowledge::KnowledgeIndex;
pub use notify::Notifier;
pub use provider::CompletionProvider;
pub use storage::{LeadStore, MessageStore};
