// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Domain events for the routing engine
//! Published to the EventBus for observability and integration

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::approach::{ApproachId, PruneReason};
use super::pattern::PatternId;
use super::signal::DepositEffect;
use super::signature::TaskClassKey;
use super::specialist::SpecialistId;
use super::task::TaskId;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouterEvent {
    // Specialist events (adaptive resonance)

    /// No specialist resonated, a new one was created
    SpecialistCreated {
        specialist_id: SpecialistId,
        best_resonance: f64,
        timestamp: DateTime<Utc>,
    },

    /// Capacity reached; the weakest specialist made room
    SpecialistEvicted {
        specialist_id: SpecialistId,
        replaced_by: SpecialistId,
        retention_score: f64,
        timestamp: DateTime<Utc>,
    },

    /// Outcome blended into a specialist profile
    SpecialistUpdated {
        specialist_id: SpecialistId,
        old_quality: f64,
        new_quality: f64,
        execution_count: u64,
        timestamp: DateTime<Utc>,
    },

    // Coordination events

    DecisionIssued {
        task_id: TaskId,
        specialist_id: SpecialistId,
        approach_id: ApproachId,
        final_score: f64,
        timestamp: DateTime<Utc>,
    },

    OutcomeRecorded {
        task_id: TaskId,
        specialist_id: SpecialistId,
        approach_id: ApproachId,
        quality: f64,
        success: bool,
        execution_count: u64,
        timestamp: DateTime<Utc>,
    },

    // Signal events (stigmergy)

    SignalDeposited {
        task_class: TaskClassKey,
        approach_id: ApproachId,
        depositor: SpecialistId,
        effect: DepositEffect,
        old_strength: f64,
        new_strength: f64,
        timestamp: DateTime<Utc>,
    },

    SignalsCompacted {
        evicted: usize,
        remaining: usize,
        timestamp: DateTime<Utc>,
    },

    // Approach events (dynamic approaches)

    ApproachSeeded {
        approach_id: ApproachId,
        timestamp: DateTime<Utc>,
    },

    ApproachCreated {
        approach_id: ApproachId,
        pattern_id: PatternId,
        cluster_size: usize,
        timestamp: DateTime<Utc>,
    },

    ApproachEvolved {
        approach_id: ApproachId,
        pattern_id: PatternId,
        version: u32,
        timestamp: DateTime<Utc>,
    },

    ApproachPruned {
        approach_id: ApproachId,
        reason: PruneReason,
        timestamp: DateTime<Utc>,
    },

    /// A discovery and evolution pass finished
    DiscoveryCompleted {
        records_analyzed: usize,
        clusters_found: usize,
        created: usize,
        evolved: usize,
        pruned: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

impl RouterEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            RouterEvent::SpecialistCreated { timestamp, .. } => *timestamp,
            RouterEvent::SpecialistEvicted { timestamp, .. } => *timestamp,
            RouterEvent::SpecialistUpdated { timestamp, .. } => *timestamp,
            RouterEvent::DecisionIssued { timestamp, .. } => *timestamp,
            RouterEvent::OutcomeRecorded { timestamp, .. } => *timestamp,
            RouterEvent::SignalDeposited { timestamp, .. } => *timestamp,
            RouterEvent::SignalsCompacted { timestamp, .. } => *timestamp,
            RouterEvent::ApproachSeeded { timestamp, .. } => *timestamp,
            RouterEvent::ApproachCreated { timestamp, .. } => *timestamp,
            RouterEvent::ApproachEvolved { timestamp, .. } => *timestamp,
            RouterEvent::ApproachPruned { timestamp, .. } => *timestamp,
            RouterEvent::DiscoveryCompleted { timestamp, .. } => *timestamp,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            RouterEvent::SpecialistCreated { .. } => "specialist_created",
            RouterEvent::SpecialistEvicted { .. } => "specialist_evicted",
            RouterEvent::SpecialistUpdated { .. } => "specialist_updated",
            RouterEvent::DecisionIssued { .. } => "decision_issued",
            RouterEvent::OutcomeRecorded { .. } => "outcome_recorded",
            RouterEvent::SignalDeposited { effect: DepositEffect::Reinforced, .. } => "signal_reinforced",
            RouterEvent::SignalDeposited { effect: DepositEffect::Attenuated, .. } => "signal_attenuated",
            RouterEvent::SignalsCompacted { .. } => "signals_compacted",
            RouterEvent::ApproachSeeded { .. } => "approach_seeded",
            RouterEvent::ApproachCreated { .. } => "approach_created",
            RouterEvent::ApproachEvolved { .. } => "approach_evolved",
            RouterEvent::ApproachPruned { .. } => "approach_pruned",
            RouterEvent::DiscoveryCompleted { .. } => "discovery_completed",
        }
    }
}
