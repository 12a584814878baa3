// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod clustering;
pub mod extraction;

pub use clustering::{cluster_records, RecordCluster};
pub use extraction::{extract_pattern, pattern_signature, vote_style};
