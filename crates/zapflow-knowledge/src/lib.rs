// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic document-retrieval client for Zapflow context augmentation.

pub mod retriever;

pub use retriever::RetrievalClient;
