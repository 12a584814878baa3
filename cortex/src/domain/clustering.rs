// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Threshold-linkage clustering of execution records.
//!
//! Records are visited oldest first (timestamp, then task id). Each record
//! joins the nearest cluster with the same output type when its domain
//! distance to that cluster's centroid is below the radius, otherwise it
//! seeds a new cluster. The result depends only on the input set.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Deterministic grouping of successful outcomes

use hybrid_swarm_core::domain::execution::ExecutionRecord;
use hybrid_swarm_core::domain::signature::cosine_maps;
use std::collections::{BTreeMap, BTreeSet};

/// Records sharing an output type and a similar domain mix.
#[derive(Debug, Clone)]
pub struct RecordCluster {
    pub output_type: String,
    pub members: Vec<ExecutionRecord>,
    centroid: BTreeMap<String, f64>,
}

impl RecordCluster {
    fn seed(record: &ExecutionRecord) -> Self {
        Self {
            output_type: record.task_signature.output_type.clone(),
            centroid: record.task_signature.domain_weights.clone(),
            members: vec![record.clone()],
        }
    }

    /// Mean domain weights of the members.
    pub fn centroid(&self) -> &BTreeMap<String, f64> {
        &self.centroid
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// `1 − cosine` between the record's domain weights and the centroid.
    pub fn distance_to(&self, record: &ExecutionRecord) -> f64 {
        1.0 - cosine_maps(&self.centroid, &record.task_signature.domain_weights)
    }

    fn absorb(&mut self, record: &ExecutionRecord) {
        let n = self.members.len() as f64;
        let incoming = &record.task_signature.domain_weights;
        let keys: BTreeSet<String> = self.centroid.keys().chain(incoming.keys()).cloned().collect();
        self.centroid = keys
            .into_iter()
            .map(|k| {
                let old = self.centroid.get(&k).copied().unwrap_or(0.0);
                let new = incoming.get(&k).copied().unwrap_or(0.0);
                (k, (old * n + new) / (n + 1.0))
            })
            .collect();
        self.members.push(record.clone());
    }
}

/// Cluster `records`, discarding clusters smaller than `min_size`.
pub fn cluster_records(records: &[ExecutionRecord], radius: f64, min_size: usize) -> Vec<RecordCluster> {
    let mut ordered: Vec<&ExecutionRecord> = records.iter().collect();
    ordered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.task_id.cmp(&b.task_id)));

    let mut clusters: Vec<RecordCluster> = Vec::new();
    for record in ordered {
        let nearest = clusters
            .iter()
            .enumerate()
            .filter(|(_, c)| c.output_type == record.task_signature.output_type)
            .map(|(i, c)| (i, c.distance_to(record)))
            .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
                Some((_, best_d)) if best_d <= d => best,
                _ => Some((i, d)),
            });

        match nearest {
            Some((index, distance)) if distance < radius => clusters[index].absorb(record),
            _ => clusters.push(RecordCluster::seed(record)),
        }
    }

    clusters.retain(|c| c.len() >= min_size);
    clusters
}
