// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Signal Board (Level 3, Stigmergic Coordination)
//!
//! Shared, decaying reinforcement values keyed by `(task class, approach)`.
//! Reads apply decay lazily and never mutate; deposits materialize decay up
//! to the deposit instant before reinforcing or attenuating. Compaction only
//! reclaims space.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Collective memory of which approach works for which task class

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::approach::ApproachId;
use crate::domain::config::{SignalConfig, SignalNormalization};
use crate::domain::errors::{RouterError, ValidationError};
use crate::domain::events::RouterEvent;
use crate::domain::repository::{RepositoryError, SignalRepository};
use crate::domain::signal::{decay_constant, DepositEffect, Signal, SignalKey};
use crate::domain::signature::TaskClassKey;
use crate::domain::specialist::SpecialistId;
use crate::infrastructure::event_bus::EventBus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionReport {
    pub evicted: usize,
    pub remaining: usize,
}

pub struct SignalBoard {
    repository: Arc<dyn SignalRepository>,
    signals: RwLock<HashMap<SignalKey, Signal>>,
    config: SignalConfig,
    lambda: f64,
    event_bus: EventBus,
}

impl SignalBoard {
    pub async fn load(
        repository: Arc<dyn SignalRepository>,
        config: SignalConfig,
        event_bus: EventBus,
    ) -> Result<Self, RepositoryError> {
        let signals: HashMap<SignalKey, Signal> = repository
            .list_all()
            .await?
            .into_iter()
            .filter(|s| s.strength.is_finite() && s.strength >= 0.0)
            .map(|s| (s.key.clone(), s))
            .collect();
        debug!(signals = signals.len(), "Loaded signal board");

        Ok(Self {
            repository,
            signals: RwLock::new(signals),
            lambda: decay_constant(config.half_life_seconds),
            config,
            event_bus,
        })
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Decay constant λ derived from the configured half-life.
    pub fn decay_constant(&self) -> f64 {
        self.lambda
    }

    pub fn len(&self) -> usize {
        self.signals.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.read().is_empty()
    }

    pub fn read(&self, task_class: &TaskClassKey) -> BTreeMap<ApproachId, f64> {
        self.read_at(task_class, Utc::now())
    }

    /// Effective (decayed) strength of every approach under `task_class`.
    pub fn read_at(&self, task_class: &TaskClassKey, now: DateTime<Utc>) -> BTreeMap<ApproachId, f64> {
        self.signals
            .read()
            .values()
            .filter(|s| &s.key.task_class == task_class)
            .map(|s| (s.key.approach_id.clone(), s.decayed_strength(self.lambda, now)))
            .collect()
    }

    /// Strongest effective signal under `task_class`, or on the whole board when `None`.
    pub fn max_strength_at(&self, task_class: Option<&TaskClassKey>, now: DateTime<Utc>) -> f64 {
        self.signals
            .read()
            .values()
            .filter(|s| task_class.map_or(true, |k| &s.key.task_class == k))
            .map(|s| s.decayed_strength(self.lambda, now))
            .fold(0.0, f64::max)
    }

    /// Effective strengths under `task_class` scaled into `[0, 1]` by the configured base.
    pub fn normalized_at(&self, task_class: &TaskClassKey, now: DateTime<Utc>) -> BTreeMap<ApproachId, f64> {
        let base = match self.config.normalization {
            SignalNormalization::PerKey => self.max_strength_at(Some(task_class), now),
            SignalNormalization::Global => self.max_strength_at(None, now),
        };
        self.read_at(task_class, now)
            .into_iter()
            .map(|(approach, strength)| {
                let normalized = if base > 0.0 { (strength / base).clamp(0.0, 1.0) } else { 0.0 };
                (approach, normalized)
            })
            .collect()
    }

    pub fn snapshot(&self, key: &SignalKey) -> Option<Signal> {
        self.signals.read().get(key).cloned()
    }

    pub async fn deposit(
        &self,
        task_class: &TaskClassKey,
        approach_id: &ApproachId,
        quality: f64,
        depositor: &SpecialistId,
    ) -> Result<Signal, RouterError> {
        self.deposit_at(task_class, approach_id, quality, depositor, Utc::now()).await
    }

    pub async fn deposit_at(
        &self,
        task_class: &TaskClassKey,
        approach_id: &ApproachId,
        quality: f64,
        depositor: &SpecialistId,
        now: DateTime<Utc>,
    ) -> Result<Signal, RouterError> {
        let (signal, event) = self
            .stage_deposit_at(task_class, approach_id, quality, depositor, now)
            .await?;
        self.event_bus.publish(event);
        Ok(signal)
    }

    /// Apply and persist a deposit, returning its event unpublished.
    pub async fn stage_deposit_at(
        &self,
        task_class: &TaskClassKey,
        approach_id: &ApproachId,
        quality: f64,
        depositor: &SpecialistId,
        now: DateTime<Utc>,
    ) -> Result<(Signal, RouterEvent), RouterError> {
        let quality = ValidationError::check_range("quality", quality, 0.0, 1.0)?;
        let key = SignalKey::new(task_class.clone(), approach_id.clone());

        let mut signal = self
            .snapshot(&key)
            .unwrap_or_else(|| Signal::new(key.clone(), depositor.clone(), now));
        signal.materialize(self.lambda, now);
        let old_strength = signal.strength;

        let effect = if quality >= self.config.reinforce_threshold {
            signal.reinforce(self.config.amplification_factor * quality);
            DepositEffect::Reinforced
        } else {
            signal.attenuate(self.config.attenuation_factor);
            DepositEffect::Attenuated
        };
        signal.depositor = depositor.clone();
        signal.deposit_count += 1;

        self.repository.save(&signal).await?;
        self.signals.write().insert(key, signal.clone());

        debug!(
            task_class = %task_class,
            approach_id = %approach_id,
            ?effect,
            old_strength,
            new_strength = signal.strength,
            "Signal deposited"
        );
        let event = RouterEvent::SignalDeposited {
            task_class: task_class.clone(),
            approach_id: approach_id.clone(),
            depositor: depositor.clone(),
            effect,
            old_strength,
            new_strength: signal.strength,
            timestamp: now,
        };
        Ok((signal, event))
    }

    /// Put back the state captured by [`snapshot`](Self::snapshot); `None` removes the key.
    pub async fn restore(&self, key: &SignalKey, previous: Option<Signal>) -> Result<(), RepositoryError> {
        match previous {
            Some(signal) => {
                self.repository.save(&signal).await?;
                self.signals.write().insert(key.clone(), signal);
            }
            None => {
                self.repository.remove(key).await?;
                self.signals.write().remove(key);
            }
        }
        Ok(())
    }

    pub async fn compact(&self) -> Result<CompactionReport, RepositoryError> {
        self.compact_at(Utc::now()).await
    }

    /// Evict every signal whose effective strength fell below the epsilon.
    pub async fn compact_at(&self, now: DateTime<Utc>) -> Result<CompactionReport, RepositoryError> {
        let expired: Vec<SignalKey> = self
            .signals
            .read()
            .values()
            .filter(|s| s.decayed_strength(self.lambda, now) < self.config.eviction_epsilon)
            .map(|s| s.key.clone())
            .collect();

        for key in &expired {
            self.repository.remove(key).await?;
            self.signals.write().remove(key);
        }

        let report = CompactionReport {
            evicted: expired.len(),
            remaining: self.len(),
        };
        if report.evicted > 0 {
            info!(evicted = report.evicted, remaining = report.remaining, "Compacted signal board");
        }
        self.event_bus.publish(RouterEvent::SignalsCompacted {
            evicted: report.evicted,
            remaining: report.remaining,
            timestamp: now,
        });
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::InMemorySignalRepository;
    use chrono::Duration;

    async fn board(config: SignalConfig) -> SignalBoard {
        SignalBoard::load(Arc::new(InMemorySignalRepository::new()), config, EventBus::new(64))
            .await
            .unwrap()
    }

    fn class() -> TaskClassKey {
        TaskClassKey::new("coding", "code")
    }

    fn specialist() -> SpecialistId {
        SpecialistId::from("specialist_a")
    }

    #[tokio::test]
    async fn test_reinforce_then_attenuate_stays_positive() {
        let board = board(SignalConfig::default()).await;
        let approach = ApproachId::from("seed_tutorial");
        let now = Utc::now();

        let mut peak = 0.0;
        for _ in 0..5 {
            peak = board.deposit_at(&class(), &approach, 0.9, &specialist(), now).await.unwrap().strength;
        }
        assert!((peak - 5.0 * 1.5 * 0.9).abs() < 1e-9);

        let after = board.deposit_at(&class(), &approach, 0.2, &specialist(), now).await.unwrap();
        assert!(after.strength < peak);
        assert!(after.strength > 0.0);
        assert!((after.strength - peak * 0.7).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_new_key_attenuation_stays_zero() {
        let board = board(SignalConfig::default()).await;
        let signal = board
            .deposit_at(&class(), &ApproachId::from("a"), 0.1, &specialist(), Utc::now())
            .await
            .unwrap();
        assert_eq!(signal.strength, 0.0);
    }

    #[tokio::test]
    async fn test_read_decays_without_mutating() {
        let board = board(SignalConfig::default()).await;
        let approach = ApproachId::from("a");
        let now = Utc::now();
        board.deposit_at(&class(), &approach, 1.0, &specialist(), now).await.unwrap();

        let later = now + Duration::seconds(1800);
        let read = board.read_at(&class(), later);
        assert!((read[&approach] - 0.75).abs() < 1e-9);
        assert_eq!(board.snapshot(&SignalKey::new(class(), approach)).unwrap().strength, 1.5);
    }

    #[tokio::test]
    async fn test_deposit_materializes_decay_first() {
        let board = board(SignalConfig::default()).await;
        let approach = ApproachId::from("a");
        let now = Utc::now();
        board.deposit_at(&class(), &approach, 1.0, &specialist(), now).await.unwrap();
        let signal = board
            .deposit_at(&class(), &approach, 1.0, &specialist(), now + Duration::seconds(1800))
            .await
            .unwrap();
        assert!((signal.strength - (0.75 + 1.5)).abs() < 1e-9);
        assert_eq!(signal.deposit_count, 2);
    }

    #[tokio::test]
    async fn test_compaction_evicts_faded_signals() {
        let board = board(SignalConfig::default()).await;
        let now = Utc::now();
        board
            .deposit_at(&class(), &ApproachId::from("old"), 0.8, &specialist(), now - Duration::hours(10))
            .await
            .unwrap();
        board
            .deposit_at(&class(), &ApproachId::from("fresh"), 0.8, &specialist(), now)
            .await
            .unwrap();

        let report = board.compact_at(now).await.unwrap();
        assert_eq!(report, CompactionReport { evicted: 1, remaining: 1 });
        assert!(board.read_at(&class(), now).contains_key(&ApproachId::from("fresh")));
    }

    #[tokio::test]
    async fn test_normalization_bases() {
        let now = Utc::now();
        let other = TaskClassKey::new("writing", "tutorial");

        let per_key = board(SignalConfig::default()).await;
        per_key.deposit_at(&class(), &ApproachId::from("a"), 0.8, &specialist(), now).await.unwrap();
        per_key.deposit_at(&other, &ApproachId::from("b"), 0.8, &specialist(), now).await.unwrap();
        per_key.deposit_at(&other, &ApproachId::from("b"), 0.8, &specialist(), now).await.unwrap();
        assert!((per_key.normalized_at(&class(), now)[&ApproachId::from("a")] - 1.0).abs() < 1e-9);

        let global = board(SignalConfig {
            normalization: SignalNormalization::Global,
            ..Default::default()
        })
        .await;
        global.deposit_at(&class(), &ApproachId::from("a"), 0.8, &specialist(), now).await.unwrap();
        global.deposit_at(&other, &ApproachId::from("b"), 0.8, &specialist(), now).await.unwrap();
        global.deposit_at(&other, &ApproachId::from("b"), 0.8, &specialist(), now).await.unwrap();
        assert!((global.normalized_at(&class(), now)[&ApproachId::from("a")] - 0.5).abs() < 1e-9);
        assert!((global.max_strength_at(None, now) - 2.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_restore_removes_new_keys() {
        let board = board(SignalConfig::default()).await;
        let approach = ApproachId::from("a");
        let key = SignalKey::new(class(), approach.clone());
        let before = board.snapshot(&key);
        board.deposit(&class(), &approach, 0.9, &specialist()).await.unwrap();
        board.restore(&key, before).await.unwrap();
        assert!(board.is_empty());
    }

    #[tokio::test]
    async fn test_deposit_rejects_invalid_quality() {
        let board = board(SignalConfig::default()).await;
        let err = board
            .deposit(&class(), &ApproachId::from("a"), 1.5, &specialist())
            .await
            .unwrap_err();
        assert!(err.is_caller_error());
        assert!(board.is_empty());
    }
}
