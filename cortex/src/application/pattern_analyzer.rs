// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Pattern Analyzer
//!
//! Turns a window of successful execution records into patterns: clusters
//! are formed by threshold linkage and each surviving cluster is condensed
//! into a pattern signature and a voted style descriptor.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Clustering and pattern extraction for discovery passes

use chrono::{DateTime, Utc};
use hybrid_swarm_core::domain::config::DiscoveryConfig;
use hybrid_swarm_core::domain::execution::ExecutionRecord;
use hybrid_swarm_core::domain::pattern::Pattern;
use tracing::debug;

use crate::domain::{cluster_records, extract_pattern};

#[derive(Debug, Clone)]
pub struct PatternAnalyzer {
    cluster_radius: f64,
    min_cluster_size: usize,
}

impl PatternAnalyzer {
    pub fn new(cluster_radius: f64, min_cluster_size: usize) -> Self {
        Self {
            cluster_radius,
            min_cluster_size: min_cluster_size.max(1),
        }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(config.cluster_radius, config.min_cluster_size)
    }

    /// Patterns in cluster order (oldest founding record first).
    pub fn analyze(&self, records: &[ExecutionRecord], now: DateTime<Utc>) -> Vec<Pattern> {
        let clusters = cluster_records(records, self.cluster_radius, self.min_cluster_size);
        debug!(
            records = records.len(),
            clusters = clusters.len(),
            radius = self.cluster_radius,
            "Clustered execution records"
        );
        clusters.iter().map(|cluster| extract_pattern(cluster, now)).collect()
    }
}

impl Default for PatternAnalyzer {
    fn default() -> Self {
        Self::from_config(&DiscoveryConfig::default())
    }
}
