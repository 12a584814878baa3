// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Approach Registry (Level 2, Dynamic Approaches)
//!
//! Catalog of execution strategies. Routing reads it through
//! [`ApproachRegistry::match_candidates`] and [`ApproachRegistry::select_hybrid`];
//! outcomes update metrics through [`ApproachRegistry::record_outcome`].
//! Creation, evolution and pruning are reserved for the evolution engine.
//!
//! Pruned approaches stay in the catalog and remain resolvable by id, but
//! never take part in matching.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Pattern matching, hybrid pattern/signal selection and approach lifecycle

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use super::seed_approaches::seed_approaches;
use super::signal_board::SignalBoard;
use crate::domain::approach::{Approach, ApproachId, ApproachOrigin, PruneReason};
use crate::domain::config::ApproachConfig;
use crate::domain::errors::RouterError;
use crate::domain::events::RouterEvent;
use crate::domain::pattern::Pattern;
use crate::domain::repository::{ApproachRepository, RepositoryError};
use crate::domain::sanitizer::InputSanitizer;
use crate::domain::signature::{blend_maps, TaskClassKey, TaskSignature};
use crate::domain::style::title_case;

/// Keyword cap for evolved approaches.
pub const MAX_EVOLVED_KEYWORDS: usize = 15;
/// Output type cap for evolved approaches.
pub const MAX_EVOLVED_OUTPUT_TYPES: usize = 5;
/// Minimum share of members agreeing on a style before evolution adopts it.
pub const STYLE_ADOPTION_SUPPORT: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct ApproachCandidate {
    pub approach_id: ApproachId,
    pub pattern_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HybridSelection {
    pub approach_id: ApproachId,
    pub pattern_score: f64,
    /// Effective signal strength after normalization, in `[0, 1]`.
    pub signal_score: f64,
    pub final_score: f64,
    /// True when no candidate matched and the best-quality approach was used.
    pub fallback: bool,
}

pub struct ApproachRegistry {
    repository: Arc<dyn ApproachRepository>,
    approaches: RwLock<HashMap<ApproachId, Approach>>,
    /// Held across read-modify-write of one approach.
    entity_locks: DashMap<ApproachId, Arc<Mutex<()>>>,
    /// Held while minting ids and while checking the last-active rule.
    catalog_lock: Mutex<()>,
    config: ApproachConfig,
    event_bus: crate::infrastructure::event_bus::EventBus,
}

impl ApproachRegistry {
    /// Load the catalog; installs the seed approaches when it is empty and seeding is enabled.
    pub async fn load(
        repository: Arc<dyn ApproachRepository>,
        config: ApproachConfig,
        event_bus: crate::infrastructure::event_bus::EventBus,
    ) -> Result<Self, RepositoryError> {
        let approaches: HashMap<ApproachId, Approach> = repository
            .list_all()
            .await?
            .into_iter()
            .map(|a| (a.id.clone(), a))
            .collect();
        let registry = Self {
            repository,
            approaches: RwLock::new(approaches),
            entity_locks: DashMap::new(),
            catalog_lock: Mutex::new(()),
            config,
            event_bus,
        };

        if registry.approaches.read().is_empty() && registry.config.seed_defaults {
            let now = Utc::now();
            for approach in seed_approaches(now) {
                let id = approach.id.clone();
                registry.register(approach).await?;
                registry.event_bus.publish(RouterEvent::ApproachSeeded {
                    approach_id: id,
                    timestamp: now,
                });
            }
            info!(count = registry.approaches.read().len(), "Seeded approach catalog");
        }

        Ok(registry)
    }

    pub fn config(&self) -> &ApproachConfig {
        &self.config
    }

    /// Add or replace an approach, durably.
    pub async fn register(&self, approach: Approach) -> Result<(), RepositoryError> {
        self.repository.save(&approach).await?;
        self.approaches.write().insert(approach.id.clone(), approach);
        Ok(())
    }

    /// Put a previously captured approach state back.
    pub async fn restore(&self, approach: Approach) -> Result<(), RepositoryError> {
        let _guard = self.lock_entity(&approach.id).await;
        self.register(approach).await
    }

    async fn lock_entity(&self, id: &ApproachId) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(&*self.entity_locks.entry(id.clone()).or_default());
        lock.lock_owned().await
    }

    pub fn get(&self, id: &ApproachId) -> Option<Approach> {
        self.approaches.read().get(id).cloned()
    }

    /// Every approach, pruned ones included, by creation time then id.
    pub fn list_all(&self) -> Vec<Approach> {
        let mut all: Vec<Approach> = self.approaches.read().values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    pub fn list_active(&self) -> Vec<Approach> {
        self.list_all().into_iter().filter(Approach::is_active).collect()
    }

    pub fn active_count(&self) -> usize {
        self.approaches.read().values().filter(|a| a.is_active()).count()
    }

    /// Active approaches with a positive pattern score, best first (ties by id).
    pub fn match_candidates(&self, signature: &TaskSignature) -> Vec<ApproachCandidate> {
        let mut candidates: Vec<ApproachCandidate> = self
            .approaches
            .read()
            .values()
            .filter(|a| a.is_active())
            .map(|a| ApproachCandidate {
                approach_id: a.id.clone(),
                pattern_score: a.signature.pattern_score(signature, &self.config.matching),
            })
            .filter(|c| c.pattern_score > 0.0)
            .collect();
        candidates.sort_by(|a, b| {
            b.pattern_score
                .partial_cmp(&a.pattern_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.approach_id.cmp(&b.approach_id))
        });
        candidates
    }

    pub fn select_hybrid(
        &self,
        signature: &TaskSignature,
        task_class: &TaskClassKey,
        board: &SignalBoard,
    ) -> Result<HybridSelection, RouterError> {
        self.select_hybrid_at(signature, task_class, board, Utc::now())
    }

    /// `pattern_weight·pattern + signal_weight·signal`; ties by quality, then age, then id.
    pub fn select_hybrid_at(
        &self,
        signature: &TaskSignature,
        task_class: &TaskClassKey,
        board: &SignalBoard,
        now: DateTime<Utc>,
    ) -> Result<HybridSelection, RouterError> {
        let candidates = self.match_candidates(signature);
        if candidates.is_empty() {
            return self.fallback_selection();
        }

        let signals = board.normalized_at(task_class, now);
        let best = {
            let approaches = self.approaches.read();
            let mut best: Option<(HybridSelection, &Approach)> = None;
            for candidate in candidates {
                let Some(approach) = approaches.get(&candidate.approach_id) else {
                    continue;
                };
                let signal_score = signals.get(&candidate.approach_id).copied().unwrap_or(0.0);
                let final_score = self.config.pattern_weight * candidate.pattern_score
                    + self.config.signal_weight * signal_score;
                debug!(
                    approach_id = %candidate.approach_id,
                    pattern_score = candidate.pattern_score,
                    signal_score,
                    final_score,
                    "Scored approach"
                );
                let selection = HybridSelection {
                    approach_id: candidate.approach_id,
                    pattern_score: candidate.pattern_score,
                    signal_score,
                    final_score,
                    fallback: false,
                };
                let better = match &best {
                    None => true,
                    Some((current, current_approach)) => {
                        rank(selection.final_score, approach, current.final_score, current_approach)
                            == Ordering::Greater
                    }
                };
                if better {
                    best = Some((selection, approach));
                }
            }
            best.map(|(selection, _)| selection)
        };

        match best {
            Some(selection) => Ok(selection),
            None => self.fallback_selection(),
        }
    }

    /// Highest `avg_quality_ema` among active approaches.
    fn fallback_selection(&self) -> Result<HybridSelection, RouterError> {
        let approaches = self.approaches.read();
        let chosen = approaches
            .values()
            .filter(|a| a.is_active())
            .max_by(|a, b| rank(0.0, a, 0.0, b))
            .ok_or(RouterError::NoActiveApproach)?;
        debug!(approach_id = %chosen.id, "No pattern match, falling back to best-quality approach");
        Ok(HybridSelection {
            approach_id: chosen.id.clone(),
            pattern_score: 0.0,
            signal_score: 0.0,
            final_score: 0.0,
            fallback: true,
        })
    }

    pub async fn record_outcome(
        &self,
        id: &ApproachId,
        quality: f64,
        success: bool,
        now: DateTime<Utc>,
    ) -> Result<Approach, RouterError> {
        let _guard = self.lock_entity(id).await;
        let mut approach = self
            .get(id)
            .ok_or_else(|| RepositoryError::NotFound(format!("approach {}", id)))?;
        approach.record_outcome(quality, success, self.config.quality_ema_alpha, now);
        self.repository.save(&approach).await?;
        self.approaches.write().insert(id.clone(), approach.clone());
        debug!(
            approach_id = %id,
            avg_quality = approach.metrics.avg_quality_ema,
            usage_count = approach.metrics.usage_count,
            "Updated approach metrics"
        );
        Ok(approach)
    }

    /// Mint a new approach from a discovered pattern.
    pub async fn create(&self, pattern: &Pattern, now: DateTime<Utc>) -> Result<ApproachId, RouterError> {
        let domain = pattern.signature.dominant_domain().to_string();
        let keyword = pattern
            .signature
            .keywords
            .iter()
            .next()
            .cloned()
            .unwrap_or_else(|| "general".to_string());
        let output = pattern
            .signature
            .output_types
            .iter()
            .next()
            .cloned()
            .unwrap_or_else(|| "explanation".to_string());
        let structure = pattern.style.structure.as_str().to_string();

        let _catalog = self.catalog_lock.lock().await;
        let id = self.unique_id(&format!(
            "approach_{}_{}_{}",
            InputSanitizer::slug(&domain),
            InputSanitizer::slug(&keyword),
            InputSanitizer::slug(&structure)
        ));
        let name = format!(
            "{} {} {} ({})",
            title_case(pattern.style.tone.as_str()),
            pattern.style.structure.display_name(),
            title_case(&output),
            title_case(&domain)
        );

        let approach = Approach::new(
            id.clone(),
            name,
            pattern.signature.clone(),
            pattern.style.clone(),
            ApproachOrigin::Discovered,
            now,
        )
        .with_description(format!(
            "Discovered from {} successful executions (cohesion {:.2})",
            pattern.size(),
            pattern.cohesion
        ))
        .with_tags([domain.clone(), structure, pattern.style.tone.as_str().to_string()])
        .with_quality_prior(pattern.avg_quality)
        .with_parent_pattern(pattern.id);

        self.register(approach).await?;
        info!(approach_id = %id, pattern_id = %pattern.id, cluster_size = pattern.size(), "Created approach");
        self.event_bus.publish(RouterEvent::ApproachCreated {
            approach_id: id.clone(),
            pattern_id: pattern.id,
            cluster_size: pattern.size(),
            timestamp: now,
        });
        Ok(id)
    }

    /// Blend an existing approach toward a discovered pattern.
    pub async fn evolve(
        &self,
        id: &ApproachId,
        pattern: &Pattern,
        rate: f64,
        now: DateTime<Utc>,
    ) -> Result<Approach, RouterError> {
        let _guard = self.lock_entity(id).await;
        let mut approach = self
            .get(id)
            .ok_or_else(|| RepositoryError::NotFound(format!("approach {}", id)))?;
        let rate = rate.clamp(0.0, 1.0);
        let target = &pattern.signature;
        let signature = &mut approach.signature;

        signature.domain_weights = blend_maps(&signature.domain_weights, &target.domain_weights, rate);
        let lo = (1.0 - rate) * signature.complexity_min + rate * target.complexity_min;
        let hi = (1.0 - rate) * signature.complexity_max + rate * target.complexity_max;
        signature.complexity_min = lo.min(hi).clamp(0.0, 1.0);
        signature.complexity_max = lo.max(hi).clamp(0.0, 1.0);
        signature.keywords = capped_union(&signature.keywords, &target.keywords, MAX_EVOLVED_KEYWORDS);
        signature.output_types = capped_union(&signature.output_types, &target.output_types, MAX_EVOLVED_OUTPUT_TYPES);

        if pattern.style_support >= STYLE_ADOPTION_SUPPORT {
            approach.style = pattern.style.clone();
        }
        approach.version += 1;
        approach.origin = ApproachOrigin::Evolved;
        approach.parent_pattern_id = Some(pattern.id);
        approach.updated_at = now;

        self.register(approach.clone()).await?;
        info!(approach_id = %id, pattern_id = %pattern.id, version = approach.version, "Evolved approach");
        self.event_bus.publish(RouterEvent::ApproachEvolved {
            approach_id: id.clone(),
            pattern_id: pattern.id,
            version: approach.version,
            timestamp: now,
        });
        Ok(approach)
    }

    /// Deactivate an approach. Returns false when it was already pruned or is the last active one.
    pub async fn prune(&self, id: &ApproachId, reason: PruneReason, now: DateTime<Utc>) -> Result<bool, RouterError> {
        let _catalog = self.catalog_lock.lock().await;
        let _guard = self.lock_entity(id).await;
        let mut approach = self
            .get(id)
            .ok_or_else(|| RepositoryError::NotFound(format!("approach {}", id)))?;
        if !approach.is_active() {
            return Ok(false);
        }
        if self.active_count() <= 1 {
            warn!(approach_id = %id, "Refusing to prune the last active approach");
            return Ok(false);
        }

        approach.prune(reason.clone(), now);
        self.register(approach).await?;
        info!(approach_id = %id, reason = %reason, "Pruned approach");
        self.event_bus.publish(RouterEvent::ApproachPruned {
            approach_id: id.clone(),
            reason,
            timestamp: now,
        });
        Ok(true)
    }

    fn unique_id(&self, base: &str) -> ApproachId {
        let approaches = self.approaches.read();
        let base_id = ApproachId::new(base);
        if !approaches.contains_key(&base_id) {
            return base_id;
        }
        let mut n = 2;
        loop {
            let candidate = ApproachId::new(format!("{}_{}", base, n));
            if !approaches.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Score, then `avg_quality_ema`, then earlier creation, then smaller id.
fn rank(score_a: f64, a: &Approach, score_b: f64, b: &Approach) -> Ordering {
    score_a
        .partial_cmp(&score_b)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            a.metrics
                .avg_quality_ema
                .partial_cmp(&b.metrics.avg_quality_ema)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| b.id.cmp(&a.id))
}

/// Existing entries first, then new ones in order, up to `cap`.
fn capped_union(existing: &BTreeSet<String>, incoming: &BTreeSet<String>, cap: usize) -> BTreeSet<String> {
    let mut merged: BTreeSet<String> = existing.iter().take(cap).cloned().collect();
    for item in incoming {
        if merged.len() >= cap {
            break;
        }
        merged.insert(item.clone());
    }
    merged
}
