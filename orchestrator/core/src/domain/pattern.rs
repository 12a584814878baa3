// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::approach::{ApproachId, PatternSignature};
use super::style::StyleDescriptor;
use super::task::TaskId;

/// Namespace for deterministic pattern ids.
const PATTERN_NAMESPACE: Uuid = Uuid::from_u128(0x6a1f_3c2e_9b4d_4e8a_a7c5_0d2f_8e61_b937);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatternId(pub Uuid);

impl PatternId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Same members always yield the same id.
    pub fn from_members<'a>(members: impl IntoIterator<Item = &'a TaskId>) -> Self {
        let joined: Vec<&str> = members.into_iter().map(TaskId::as_str).collect();
        Self(Uuid::new_v5(&PATTERN_NAMESPACE, joined.join(",").as_bytes()))
    }
}

impl Default for PatternId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cluster of successful executions extracted during one discovery pass.
/// Transient: consumed to mint or refine an approach, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub id: PatternId,
    pub member_task_ids: Vec<TaskId>,
    pub signature: PatternSignature,
    pub style: StyleDescriptor,
    /// Mean share of the winning tag across style fields, in `[0, 1]`.
    pub style_support: f64,
    /// Mean member similarity to the cluster centroid.
    pub cohesion: f64,
    pub avg_quality: f64,
    pub discovered_at: DateTime<Utc>,
}

impl Pattern {
    pub fn size(&self) -> usize {
        self.member_task_ids.len()
    }
}

/// Summary of one discovery and evolution pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub records_analyzed: usize,
    pub clusters_found: usize,
    pub created: Vec<ApproachId>,
    pub evolved: Vec<ApproachId>,
    pub pruned: Vec<ApproachId>,
    pub duration_ms: u64,
}

impl DiscoveryReport {
    /// True when the pass changed nothing.
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.evolved.is_empty() && self.pruned.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_id_is_deterministic() {
        let members = vec![TaskId::from("task_a"), TaskId::from("task_b")];
        assert_eq!(PatternId::from_members(&members), PatternId::from_members(&members));
        let other = vec![TaskId::from("task_c")];
        assert_ne!(PatternId::from_members(&members), PatternId::from_members(&other));
    }

    #[test]
    fn test_empty_report_is_noop() {
        assert!(DiscoveryReport::default().is_noop());
    }
}
