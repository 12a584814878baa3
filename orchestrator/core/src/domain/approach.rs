// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Approach Aggregate (Level 2, Dynamic Approaches)
//!
//! An approach is a named execution strategy: a [`PatternSignature`] that
//! decides which tasks it fits, a [`StyleDescriptor`] handed to the executor,
//! and running [`ApproachMetrics`].
//!
//! ## Lifecycle
//!
//! ```text
//! Active ──prune──▶ Pruned (terminal)
//! ```
//!
//! Approaches are never deleted. Pruned approaches stay resolvable by id so
//! execution history keeps its referential integrity, but they never take
//! part in matching again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use super::pattern::PatternId;
use super::signature::{cosine_maps, jaccard, TaskSignature, GENERAL_DOMAIN};
use super::style::StyleDescriptor;

/// Number of recent quality samples kept per approach.
pub const QUALITY_HISTORY_LEN: usize = 100;

/// Samples required before a trend is reported.
const TREND_MIN_SAMPLES: usize = 20;
const TREND_WINDOW: usize = 10;
const TREND_DELTA: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApproachId(pub String);

impl ApproachId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApproachId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ApproachId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Relative weights of the pattern-match components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchWeights {
    pub domain: f64,
    pub complexity: f64,
    pub keyword: f64,
    pub output: f64,
    /// Distance outside the complexity range at which the fit reaches zero.
    pub complexity_falloff: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            domain: 0.4,
            complexity: 0.2,
            keyword: 0.2,
            output: 0.2,
            complexity_falloff: 0.5,
        }
    }
}

/// Which tasks an approach is meant for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSignature {
    pub domain_weights: BTreeMap<String, f64>,
    pub complexity_min: f64,
    pub complexity_max: f64,
    pub keywords: BTreeSet<String>,
    pub output_types: BTreeSet<String>,
}

impl PatternSignature {
    pub fn new(
        domain_weights: BTreeMap<String, f64>,
        complexity_range: (f64, f64),
        keywords: impl IntoIterator<Item = impl Into<String>>,
        output_types: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let (lo, hi) = complexity_range;
        Self {
            domain_weights,
            complexity_min: lo.min(hi).clamp(0.0, 1.0),
            complexity_max: lo.max(hi).clamp(0.0, 1.0),
            keywords: keywords.into_iter().map(Into::into).collect(),
            output_types: output_types.into_iter().map(Into::into).collect(),
        }
    }

    /// 1.0 inside the range, decaying linearly to 0 at `falloff` outside it.
    pub fn complexity_fit(&self, complexity: f64, falloff: f64) -> f64 {
        let distance = if complexity < self.complexity_min {
            self.complexity_min - complexity
        } else if complexity > self.complexity_max {
            complexity - self.complexity_max
        } else {
            return 1.0;
        };
        if falloff <= 0.0 {
            return 0.0;
        }
        (1.0 - distance / falloff).max(0.0)
    }

    /// Weighted fit of a task signature against this pattern, in `[0, 1]`.
    pub fn pattern_score(&self, signature: &TaskSignature, weights: &MatchWeights) -> f64 {
        let domain = cosine_maps(&self.domain_weights, &signature.domain_weights);
        let complexity = self.complexity_fit(signature.complexity, weights.complexity_falloff);
        let keyword = jaccard(&self.keywords, &signature.keywords);
        let output = if self.output_types.contains(&signature.output_type) {
            1.0
        } else {
            0.0
        };

        let total = weights.domain + weights.complexity + weights.keyword + weights.output;
        if total <= 0.0 {
            return 0.0;
        }
        let score = weights.domain * domain
            + weights.complexity * complexity
            + weights.keyword * keyword
            + weights.output * output;
        (score / total).clamp(0.0, 1.0)
    }

    /// Intersection over union of the two complexity ranges.
    pub fn range_iou(&self, other: &PatternSignature) -> f64 {
        let lo = self.complexity_min.max(other.complexity_min);
        let hi = self.complexity_max.min(other.complexity_max);
        let union = self.complexity_max.max(other.complexity_max) - self.complexity_min.min(other.complexity_min);
        if union <= f64::EPSILON {
            // Both ranges collapse onto the same point.
            return if hi >= lo { 1.0 } else { 0.0 };
        }
        ((hi - lo).max(0.0) / union).clamp(0.0, 1.0)
    }

    /// Mean of domain cosine, range IoU, keyword Jaccard and output Jaccard.
    pub fn similarity(&self, other: &PatternSignature) -> f64 {
        let domain = cosine_maps(&self.domain_weights, &other.domain_weights);
        let range = self.range_iou(other);
        let keywords = jaccard(&self.keywords, &other.keywords);
        let outputs = jaccard(&self.output_types, &other.output_types);
        (domain + range + keywords + outputs) / 4.0
    }

    pub fn distance(&self, other: &PatternSignature) -> f64 {
        1.0 - self.similarity(other)
    }

    pub fn dominant_domain(&self) -> &str {
        let mut best: Option<(&String, f64)> = None;
        for (key, value) in &self.domain_weights {
            match best {
                Some((_, best_value)) if *value <= best_value => {}
                _ => best = Some((key, *value)),
            }
        }
        best.map(|(k, _)| k.as_str()).unwrap_or(GENERAL_DOMAIN)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTrend {
    New,
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproachMetrics {
    /// EMA of reported quality, always in `[0, 1]`.
    pub avg_quality_ema: f64,
    pub usage_count: u64,
    pub success_count: u64,
    pub success_rate: f64,
    pub min_quality: Option<f64>,
    pub max_quality: Option<f64>,
    pub recent_qualities: VecDeque<f64>,
    pub trend: QualityTrend,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ApproachMetrics {
    pub fn with_prior(avg_quality: f64) -> Self {
        Self {
            avg_quality_ema: avg_quality.clamp(0.0, 1.0),
            usage_count: 0,
            success_count: 0,
            success_rate: 0.0,
            min_quality: None,
            max_quality: None,
            recent_qualities: VecDeque::new(),
            trend: QualityTrend::New,
            last_used_at: None,
        }
    }

    pub fn record(&mut self, quality: f64, success: bool, alpha: f64, now: DateTime<Utc>) {
        let quality = quality.clamp(0.0, 1.0);
        let alpha = alpha.clamp(0.0, 1.0);

        self.avg_quality_ema = ((1.0 - alpha) * self.avg_quality_ema + alpha * quality).clamp(0.0, 1.0);
        self.usage_count += 1;
        if success {
            self.success_count += 1;
        }
        self.success_rate = self.success_count as f64 / self.usage_count as f64;
        self.min_quality = Some(self.min_quality.map_or(quality, |m| m.min(quality)));
        self.max_quality = Some(self.max_quality.map_or(quality, |m| m.max(quality)));

        self.recent_qualities.push_back(quality);
        while self.recent_qualities.len() > QUALITY_HISTORY_LEN {
            self.recent_qualities.pop_front();
        }
        self.trend = self.compute_trend();
        self.last_used_at = Some(now);
    }

    /// Population standard deviation of the recent samples.
    pub fn quality_std_dev(&self) -> f64 {
        let n = self.recent_qualities.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.recent_qualities.iter().sum::<f64>() / n as f64;
        let variance = self.recent_qualities.iter().map(|q| (q - mean).powi(2)).sum::<f64>() / n as f64;
        variance.sqrt()
    }

    fn compute_trend(&self) -> QualityTrend {
        let n = self.recent_qualities.len();
        if n < TREND_MIN_SAMPLES {
            return QualityTrend::New;
        }
        let samples: Vec<f64> = self.recent_qualities.iter().copied().collect();
        let recent = &samples[n - TREND_WINDOW..];
        let previous = &samples[n - 2 * TREND_WINDOW..n - TREND_WINDOW];
        let recent_mean = recent.iter().sum::<f64>() / TREND_WINDOW as f64;
        let previous_mean = previous.iter().sum::<f64>() / TREND_WINDOW as f64;

        if recent_mean > previous_mean + TREND_DELTA {
            QualityTrend::Improving
        } else if recent_mean < previous_mean - TREND_DELTA {
            QualityTrend::Declining
        } else {
            QualityTrend::Stable
        }
    }
}

/// Why an approach left the active pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PruneReason {
    /// Quality fell below the population-relative threshold.
    Underperforming {
        avg_quality: f64,
        threshold: f64,
    },
    LowSuccessRate {
        success_rate: f64,
    },
    /// Never gained traction.
    Stale {
        age_days: i64,
        usage_count: u64,
    },
    Manual,
}

impl fmt::Display for PruneReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Underperforming { avg_quality, threshold } => {
                write!(f, "avg_quality {:.3} below threshold {:.3}", avg_quality, threshold)
            }
            Self::LowSuccessRate { success_rate } => write!(f, "success_rate {:.3}", success_rate),
            Self::Stale { age_days, usage_count } => {
                write!(f, "stale: {} days old, {} uses", age_days, usage_count)
            }
            Self::Manual => f.write_str("manual"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ApproachLifecycle {
    Active,
    Pruned {
        at: DateTime<Utc>,
        reason: PruneReason,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproachOrigin {
    Seed,
    Discovered,
    Evolved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approach {
    pub id: ApproachId,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub signature: PatternSignature,
    pub style: StyleDescriptor,
    pub metrics: ApproachMetrics,
    pub lifecycle: ApproachLifecycle,
    pub origin: ApproachOrigin,
    /// Pattern that minted or last refined this approach.
    pub parent_pattern_id: Option<PatternId>,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Approach {
    pub fn new(
        id: ApproachId,
        name: impl Into<String>,
        signature: PatternSignature,
        style: StyleDescriptor,
        origin: ApproachOrigin,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            tags: Vec::new(),
            signature,
            style,
            metrics: ApproachMetrics::with_prior(0.5),
            lifecycle: ApproachLifecycle::Active,
            origin,
            parent_pattern_id: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_quality_prior(mut self, avg_quality: f64) -> Self {
        self.metrics = ApproachMetrics::with_prior(avg_quality);
        self
    }

    pub fn with_parent_pattern(mut self, pattern_id: PatternId) -> Self {
        self.parent_pattern_id = Some(pattern_id);
        self
    }

    pub fn is_active(&self) -> bool {
        matches!(self.lifecycle, ApproachLifecycle::Active)
    }

    pub fn record_outcome(&mut self, quality: f64, success: bool, alpha: f64, now: DateTime<Utc>) {
        self.metrics.record(quality, success, alpha, now);
        self.updated_at = now;
    }

    /// Transition to `Pruned`. Returns false if already pruned.
    pub fn prune(&mut self, reason: PruneReason, now: DateTime<Utc>) -> bool {
        match self.lifecycle {
            ApproachLifecycle::Active => {
                self.lifecycle = ApproachLifecycle::Pruned { at: now, reason };
                self.updated_at = now;
                true
            }
            ApproachLifecycle::Pruned { .. } => false,
        }
    }

    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days()
    }

    /// Guidance payload handed to the external executor.
    pub fn metadata(&self) -> ApproachMetadata {
        ApproachMetadata {
            name: self.name.clone(),
            description: self.description.clone(),
            signature: self.signature.clone(),
            style: self.style.clone(),
            metrics: self.metrics.clone(),
            origin: self.origin,
            version: self.version,
        }
    }
}

/// Verbatim view of an approach exposed with every routing decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproachMetadata {
    pub name: String,
    pub description: String,
    pub signature: PatternSignature,
    pub style: StyleDescriptor,
    pub metrics: ApproachMetrics,
    pub origin: ApproachOrigin,
    pub version: u32,
}
