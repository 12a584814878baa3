// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Specialist Registry (Level 1, Adaptive Resonance)
//!
//! Owns the specialist population. A task is routed to the specialist whose
//! profile resonates most with the task signature, provided the resonance
//! clears the vigilance threshold; otherwise a new specialist is created,
//! evicting the weakest one when the registry is at capacity.
//!
//! The in-memory view changes only after the repository write succeeded.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Match-or-create, outcome blending and capacity eviction

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::config::SpecialistConfig;
use crate::domain::errors::RouterError;
use crate::domain::events::RouterEvent;
use crate::domain::repository::{RepositoryError, SpecialistRepository};
use crate::domain::signature::TaskSignature;
use crate::domain::specialist::{Specialist, SpecialistId};
use crate::infrastructure::event_bus::EventBus;

/// Result of [`SpecialistRegistry::match_or_create`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpecialistMatch {
    pub specialist_id: SpecialistId,
    /// Resonance of the chosen specialist (1.0 for a freshly created one).
    pub resonance: f64,
    pub created: bool,
    pub evicted: Option<SpecialistId>,
}

pub struct SpecialistRegistry {
    repository: Arc<dyn SpecialistRepository>,
    /// Every known specialist, evicted ones included
    specialists: RwLock<HashMap<SpecialistId, Specialist>>,
    config: SpecialistConfig,
    event_bus: EventBus,
}

impl SpecialistRegistry {
    pub async fn load(
        repository: Arc<dyn SpecialistRepository>,
        config: SpecialistConfig,
        event_bus: EventBus,
    ) -> Result<Self, RepositoryError> {
        let all = repository.list_all().await?;
        let specialists: HashMap<SpecialistId, Specialist> =
            all.into_iter().map(|s| (s.id.clone(), s)).collect();
        let active = specialists.values().filter(|s| s.is_active()).count();
        if active > config.max_specialists {
            warn!(
                active,
                max = config.max_specialists,
                "Loaded more active specialists than the configured capacity"
            );
        }
        debug!(total = specialists.len(), active, "Loaded specialists");

        Ok(Self {
            repository,
            specialists: RwLock::new(specialists),
            config,
            event_bus,
        })
    }

    pub fn config(&self) -> &SpecialistConfig {
        &self.config
    }

    pub fn get(&self, id: &SpecialistId) -> Option<Specialist> {
        self.specialists.read().get(id).cloned()
    }

    /// Active specialists ordered by creation time.
    pub fn list_active(&self) -> Vec<Specialist> {
        let mut active: Vec<Specialist> = self
            .specialists
            .read()
            .values()
            .filter(|s| s.is_active())
            .cloned()
            .collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        active
    }

    pub fn active_count(&self) -> usize {
        self.specialists.read().values().filter(|s| s.is_active()).count()
    }

    /// Best resonating active specialist: resonance, then quality, then age, then id.
    pub fn best_match(&self, signature: &TaskSignature) -> Option<(SpecialistId, f64)> {
        let specialists = self.specialists.read();
        specialists
            .values()
            .filter(|s| s.is_active())
            .map(|s| (s, s.resonance(signature)))
            .max_by(|(a, ra), (b, rb)| {
                ra.partial_cmp(rb)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.quality_ema.partial_cmp(&b.quality_ema).unwrap_or(Ordering::Equal))
                    .then_with(|| b.created_at.cmp(&a.created_at))
                    .then_with(|| b.id.cmp(&a.id))
            })
            .map(|(s, r)| (s.id.clone(), r))
    }

    pub async fn match_or_create(&self, signature: &TaskSignature) -> Result<SpecialistMatch, RouterError> {
        self.match_or_create_at(signature, Utc::now()).await
    }

    pub async fn match_or_create_at(
        &self,
        signature: &TaskSignature,
        now: DateTime<Utc>,
    ) -> Result<SpecialistMatch, RouterError> {
        let best = self.best_match(signature);
        if let Some((id, resonance)) = &best {
            if *resonance >= self.config.vigilance_threshold {
                debug!(specialist_id = %id, resonance, "Specialist resonated");
                if let Some(mut specialist) = self.get(id) {
                    specialist.touch(now);
                    self.repository.save(&specialist).await?;
                    self.specialists.write().insert(id.clone(), specialist);
                }
                return Ok(SpecialistMatch {
                    specialist_id: id.clone(),
                    resonance: *resonance,
                    created: false,
                    evicted: None,
                });
            }
        }
        let best_resonance = best.map(|(_, r)| r).unwrap_or(0.0);

        let victim = if self.active_count() >= self.config.max_specialists {
            match self.eviction_candidate() {
                Some(victim) => Some(victim),
                None => {
                    warn!(max = self.config.max_specialists, "Specialist capacity exhausted with nothing evictable");
                    return Err(RouterError::CapacityExhausted {
                        max: self.config.max_specialists,
                    });
                }
            }
        } else {
            None
        };

        let id = self.unique_id(signature);
        let specialist = Specialist::new(id.clone(), signature, self.config.default_quality_prior, now);

        let evicted = match victim {
            Some(original) => {
                let retention_score = original.retention_score(self.config.unproven_success_rate);
                let mut evicted = original.clone();
                evicted.evict(now, Some(id.clone()));
                self.repository.save(&evicted).await?;

                if let Err(e) = self.repository.save(&specialist).await {
                    warn!(specialist_id = %original.id, "Restoring evicted specialist after failed create: {}", e);
                    if let Err(restore_err) = self.repository.save(&original).await {
                        warn!(specialist_id = %original.id, "Failed to restore specialist: {}", restore_err);
                    }
                    return Err(e.into());
                }

                self.specialists.write().insert(evicted.id.clone(), evicted.clone());
                info!(
                    specialist_id = %evicted.id,
                    replaced_by = %id,
                    retention_score,
                    "Evicted specialist at capacity"
                );
                self.event_bus.publish(RouterEvent::SpecialistEvicted {
                    specialist_id: evicted.id.clone(),
                    replaced_by: id.clone(),
                    retention_score,
                    timestamp: now,
                });
                Some(evicted.id)
            }
            None => {
                self.repository.save(&specialist).await?;
                None
            }
        };

        self.specialists.write().insert(id.clone(), specialist);
        info!(specialist_id = %id, best_resonance, "Created specialist");
        self.event_bus.publish(RouterEvent::SpecialistCreated {
            specialist_id: id.clone(),
            best_resonance,
            timestamp: now,
        });

        Ok(SpecialistMatch {
            specialist_id: id,
            resonance: 1.0,
            created: true,
            evicted,
        })
    }

    /// Blend an outcome into the specialist and persist it. Evicted specialists still learn.
    pub async fn record_outcome(
        &self,
        id: &SpecialistId,
        signature: &TaskSignature,
        quality: f64,
        success: bool,
        now: DateTime<Utc>,
    ) -> Result<Specialist, RouterError> {
        let (specialist, event) = self.stage_outcome(id, signature, quality, success, now).await?;
        self.event_bus.publish(event);
        Ok(specialist)
    }

    /// [`record_outcome`](Self::record_outcome) without publishing; the caller
    /// publishes the returned event once its surrounding write has committed.
    pub async fn stage_outcome(
        &self,
        id: &SpecialistId,
        signature: &TaskSignature,
        quality: f64,
        success: bool,
        now: DateTime<Utc>,
    ) -> Result<(Specialist, RouterEvent), RouterError> {
        let mut specialist = self
            .get(id)
            .ok_or_else(|| RepositoryError::NotFound(format!("specialist {}", id)))?;
        let old_quality = specialist.quality_ema;

        specialist.record_outcome(signature, quality, success, self.config.learning_rate, now);
        self.repository.save(&specialist).await?;
        self.specialists.write().insert(id.clone(), specialist.clone());

        debug!(
            specialist_id = %id,
            old_quality,
            new_quality = specialist.quality_ema,
            specialization = specialist.specialization_score,
            "Updated specialist"
        );
        let event = RouterEvent::SpecialistUpdated {
            specialist_id: id.clone(),
            old_quality,
            new_quality: specialist.quality_ema,
            execution_count: specialist.execution_count,
            timestamp: now,
        };
        Ok((specialist, event))
    }

    /// Put a previously captured specialist state back, durably.
    pub async fn restore(&self, specialist: Specialist) -> Result<(), RepositoryError> {
        self.repository.save(&specialist).await?;
        self.specialists.write().insert(specialist.id.clone(), specialist);
        Ok(())
    }

    /// Lowest `quality_ema × success_rate`, ties by fewest executions, then age, then id.
    fn eviction_candidate(&self) -> Option<Specialist> {
        let unproven = self.config.unproven_success_rate;
        let specialists = self.specialists.read();
        specialists
            .values()
            .filter(|s| s.is_active())
            .min_by(|a, b| {
                a.retention_score(unproven)
                    .partial_cmp(&b.retention_score(unproven))
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.execution_count.cmp(&b.execution_count))
                    .then_with(|| a.created_at.cmp(&b.created_at))
                    .then_with(|| a.id.cmp(&b.id))
            })
            .cloned()
    }

    fn unique_id(&self, signature: &TaskSignature) -> SpecialistId {
        let base = SpecialistId::from_signature(signature);
        let specialists = self.specialists.read();
        if !specialists.contains_key(&base) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = base.with_suffix(n);
            if !specialists.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::InMemorySpecialistRepository;

    async fn registry(max: usize, vigilance: f64) -> (SpecialistRegistry, Arc<InMemorySpecialistRepository>) {
        let repo = Arc::new(InMemorySpecialistRepository::new());
        let config = SpecialistConfig {
            max_specialists: max,
            vigilance_threshold: vigilance,
            ..Default::default()
        };
        let registry = SpecialistRegistry::load(repo.clone(), config, EventBus::new(64))
            .await
            .unwrap();
        (registry, repo)
    }

    fn coding() -> TaskSignature {
        TaskSignature::single_domain("coding", 0.6, &["rust"], "code")
    }

    #[tokio::test]
    async fn test_identical_signatures_reuse_one_specialist() {
        let (registry, repo) = registry(10, 0.75).await;
        let first = registry.match_or_create(&coding()).await.unwrap();
        assert!(first.created);

        for _ in 0..9 {
            let next = registry.match_or_create(&coding()).await.unwrap();
            assert!(!next.created);
            assert_eq!(next.specialist_id, first.specialist_id);
            assert!(next.resonance >= 0.75);
        }
        assert_eq!(registry.active_count(), 1);
        assert_eq!(repo.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reuse_refreshes_last_used() {
        let (registry, repo) = registry(10, 0.75).await;
        let created_at = Utc::now() - chrono::Duration::hours(2);
        let first = registry.match_or_create_at(&coding(), created_at).await.unwrap();

        let later = created_at + chrono::Duration::hours(1);
        let reused = registry.match_or_create_at(&coding(), later).await.unwrap();
        assert!(!reused.created);

        let specialist = registry.get(&first.specialist_id).unwrap();
        assert_eq!(specialist.last_used_at, later);
        assert_eq!(specialist.created_at, created_at);
        assert_eq!(specialist.execution_count, 0);
        let stored = repo.find_by_id(&first.specialist_id).await.unwrap().unwrap();
        assert_eq!(stored.last_used_at, later);
    }

    #[tokio::test]
    async fn test_dissimilar_signature_creates_new_specialist() {
        let (registry, _) = registry(10, 0.7).await;
        let a = registry.match_or_create(&coding()).await.unwrap();
        let b = registry
            .match_or_create(&TaskSignature::single_domain("writing", 0.1, &["poem"], "article"))
            .await
            .unwrap();
        assert_ne!(a.specialist_id, b.specialist_id);
        assert!(b.created);
    }

    #[tokio::test]
    async fn test_eviction_replaces_weakest_and_keeps_others() {
        let (registry, repo) = registry(3, 0.99).await;
        let mut ids = Vec::new();
        for domain in ["alpha", "beta", "gamma"] {
            let sig = TaskSignature::single_domain(domain, 0.5, &[], "report");
            ids.push((registry.match_or_create(&sig).await.unwrap().specialist_id, sig));
        }

        let now = Utc::now();
        registry.record_outcome(&ids[0].0, &ids[0].1, 0.9, true, now).await.unwrap();
        registry.record_outcome(&ids[1].0, &ids[1].1, 0.1, false, now).await.unwrap();
        registry.record_outcome(&ids[2].0, &ids[2].1, 0.8, true, now).await.unwrap();

        let newcomer = TaskSignature::single_domain("delta", 0.5, &[], "report");
        let result = registry.match_or_create(&newcomer).await.unwrap();
        assert!(result.created);
        assert_eq!(result.evicted.as_ref(), Some(&ids[1].0));

        let active: Vec<SpecialistId> = registry.list_active().into_iter().map(|s| s.id).collect();
        assert_eq!(active.len(), 3);
        assert!(active.contains(&ids[0].0));
        assert!(active.contains(&ids[2].0));
        assert!(active.contains(&result.specialist_id));

        let evicted = repo.find_by_id(&ids[1].0).await.unwrap().unwrap();
        assert!(!evicted.is_active());
    }

    #[tokio::test]
    async fn test_eviction_tie_prefers_least_proven() {
        let (registry, _) = registry(2, 0.99).await;
        let a = TaskSignature::single_domain("alpha", 0.5, &[], "report");
        let b = TaskSignature::single_domain("beta", 0.5, &[], "report");
        let id_a = registry.match_or_create(&a).await.unwrap().specialist_id;
        let id_b = registry.match_or_create(&b).await.unwrap().specialist_id;

        // Both score 0.6 × 0.5; `a` has more executions behind it.
        let mut proven = registry.get(&id_a).unwrap();
        proven.execution_count = 2;
        proven.success_count = 1;
        registry.restore(proven).await.unwrap();

        let result = registry
            .match_or_create(&TaskSignature::single_domain("gamma", 0.5, &[], "report"))
            .await
            .unwrap();
        assert_eq!(result.evicted, Some(id_b));
    }

    #[tokio::test]
    async fn test_record_outcome_unknown_specialist_is_persistence_error() {
        let (registry, _) = registry(3, 0.7).await;
        let err = registry
            .record_outcome(&SpecialistId::from("specialist_missing"), &coding(), 0.5, true, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::Persistence(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_registry_reloads_from_repository() {
        let repo = Arc::new(InMemorySpecialistRepository::new());
        let config = SpecialistConfig::default();
        let first = SpecialistRegistry::load(repo.clone(), config.clone(), EventBus::new(8))
            .await
            .unwrap();
        let created = first.match_or_create(&coding()).await.unwrap();

        let second = SpecialistRegistry::load(repo, config, EventBus::new(8)).await.unwrap();
        let again = second.match_or_create(&coding()).await.unwrap();
        assert_eq!(again.specialist_id, created.specialist_id);
        assert!(!again.created);
    }

    #[tokio::test]
    async fn test_events_published() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let registry = SpecialistRegistry::load(
            Arc::new(InMemorySpecialistRepository::new()),
            SpecialistConfig::default(),
            bus,
        )
        .await
        .unwrap();
        let m = registry.match_or_create(&coding()).await.unwrap();
        registry.record_outcome(&m.specialist_id, &coding(), 0.9, true, Utc::now()).await.unwrap();

        let types: Vec<&str> = rx.drain().iter().map(|e| e.event_type()).collect();
        assert_eq!(types, vec!["specialist_created", "specialist_updated"]);
    }
}
