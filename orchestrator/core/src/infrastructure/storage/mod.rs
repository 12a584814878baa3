// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Storage Infrastructure Module
//!
//! Durable backing for the append-only execution ledger.

pub mod jsonl_history;

pub use jsonl_history::{HistoryIndex, JsonlExecutionHistory};
