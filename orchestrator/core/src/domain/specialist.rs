// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Specialist Aggregate (Level 1, Adaptive Resonance)
//!
//! A specialist is a long-lived worker profile. Its [`SignatureCentroid`]
//! drifts toward the tasks it serves; `quality_ema` tracks how well it
//! performs. Specialists are only ever soft-removed, by capacity-triggered
//! eviction, so history records keep resolving.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use super::signature::{SignatureCentroid, TaskSignature};

/// Smoothing factor for the profile drift estimate.
const DRIFT_EMA_BETA: f64 = 0.2;

/// Initial drift estimate; yields a specialization score of 0.5.
const DRIFT_PRIOR: f64 = 0.1;

/// Scale applied to drift when converting it into a specialization score.
const DRIFT_SCALE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecialistId(pub String);

impl SpecialistId {
    /// `specialist_` followed by the first 8 hex chars of the signature hash.
    pub fn from_signature(signature: &TaskSignature) -> Self {
        let digest = Sha256::digest(signature.canonical_string().as_bytes());
        let hex = hex::encode(digest);
        Self(format!("specialist_{}", &hex[..8]))
    }

    /// Disambiguated form used when the hashed id is already taken.
    pub fn with_suffix(&self, n: u32) -> Self {
        Self(format!("{}_{}", self.0, n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpecialistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SpecialistId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SpecialistStatus {
    Active,
    Evicted {
        at: DateTime<Utc>,
        replaced_by: Option<SpecialistId>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Specialist {
    pub id: SpecialistId,
    /// Running centroid of served task signatures.
    pub profile: SignatureCentroid,
    pub execution_count: u64,
    pub success_count: u64,
    /// EMA of reported quality, always in `[0, 1]`.
    pub quality_ema: f64,
    /// Profile stability: lower recent drift means a higher score.
    pub specialization_score: f64,
    pub drift_ema: f64,
    pub status: SpecialistStatus,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

impl Specialist {
    pub fn new(id: SpecialistId, signature: &TaskSignature, quality_prior: f64, now: DateTime<Utc>) -> Self {
        Self {
            id,
            profile: SignatureCentroid::from_signature(signature),
            execution_count: 0,
            success_count: 0,
            quality_ema: quality_prior.clamp(0.0, 1.0),
            specialization_score: specialization_from_drift(DRIFT_PRIOR),
            drift_ema: DRIFT_PRIOR,
            status: SpecialistStatus::Active,
            created_at: now,
            last_used_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, SpecialistStatus::Active)
    }

    /// Success ratio, or `unproven` before the first outcome.
    pub fn success_rate(&self, unproven: f64) -> f64 {
        if self.execution_count == 0 {
            unproven
        } else {
            self.success_count as f64 / self.execution_count as f64
        }
    }

    /// `quality_ema × success_rate`; the lowest score is evicted first.
    pub fn retention_score(&self, unproven: f64) -> f64 {
        self.quality_ema * self.success_rate(unproven)
    }

    pub fn resonance(&self, signature: &TaskSignature) -> f64 {
        self.profile.resonance(signature)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_used_at = now;
    }

    /// Blend an outcome into the profile and quality estimate.
    pub fn record_outcome(
        &mut self,
        signature: &TaskSignature,
        quality: f64,
        success: bool,
        alpha: f64,
        now: DateTime<Utc>,
    ) {
        let alpha = alpha.clamp(0.0, 1.0);
        let drift = self.profile.blend(signature, alpha);

        self.quality_ema = ((1.0 - alpha) * self.quality_ema + alpha * quality.clamp(0.0, 1.0)).clamp(0.0, 1.0);
        self.execution_count += 1;
        if success {
            self.success_count += 1;
        }

        self.drift_ema = (1.0 - DRIFT_EMA_BETA) * self.drift_ema + DRIFT_EMA_BETA * drift;
        self.specialization_score = specialization_from_drift(self.drift_ema);
        self.last_used_at = now;
    }

    pub fn evict(&mut self, now: DateTime<Utc>, replaced_by: Option<SpecialistId>) {
        self.status = SpecialistStatus::Evicted { at: now, replaced_by };
    }
}

fn specialization_from_drift(drift: f64) -> f64 {
    1.0 / (1.0 + DRIFT_SCALE * drift.max(0.0))
}
