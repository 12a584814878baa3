// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Stigmergic Signals (Level 3)
//!
//! A signal is a decaying reinforcement value left on the shared board under
//! `(task class, approach)`. Reinforcement is additive, attenuation is
//! multiplicative, and strength never goes negative. Decay is applied lazily
//! from `last_updated`, so the stored strength is the value at that instant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::approach::ApproachId;
use super::signature::TaskClassKey;
use super::specialist::SpecialistId;

/// Decay constant λ for a half-life in seconds: `ln 2 / half_life`.
pub fn decay_constant(half_life_seconds: f64) -> f64 {
    if half_life_seconds <= 0.0 {
        return 0.0;
    }
    std::f64::consts::LN_2 / half_life_seconds
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalKey {
    pub task_class: TaskClassKey,
    pub approach_id: ApproachId,
}

impl SignalKey {
    pub fn new(task_class: TaskClassKey, approach_id: ApproachId) -> Self {
        Self { task_class, approach_id }
    }

    /// Flat form used by key-value stores.
    pub fn storage_key(&self) -> String {
        format!("{}|{}", self.task_class, self.approach_id)
    }
}

/// Whether a deposit strengthened or dented the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositEffect {
    Reinforced,
    Attenuated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub key: SignalKey,
    /// Strength as of `last_updated`.
    pub strength: f64,
    pub last_updated: DateTime<Utc>,
    /// Specialist that made the most recent deposit.
    pub depositor: SpecialistId,
    pub deposit_count: u64,
}

impl Signal {
    pub fn new(key: SignalKey, depositor: SpecialistId, now: DateTime<Utc>) -> Self {
        Self {
            key,
            strength: 0.0,
            last_updated: now,
            depositor,
            deposit_count: 0,
        }
    }

    /// `strength · exp(-λ·(now - last_updated))`; instants before the last update do not amplify.
    pub fn decayed_strength(&self, lambda: f64, now: DateTime<Utc>) -> f64 {
        let elapsed_ms = (now - self.last_updated).num_milliseconds().max(0);
        let elapsed = elapsed_ms as f64 / 1000.0;
        (self.strength * (-lambda * elapsed).exp()).max(0.0)
    }

    /// Fold pending decay into the stored strength.
    pub fn materialize(&mut self, lambda: f64, now: DateTime<Utc>) {
        self.strength = self.decayed_strength(lambda, now);
        if now > self.last_updated {
            self.last_updated = now;
        }
    }

    pub fn reinforce(&mut self, amount: f64) {
        self.strength += amount.max(0.0);
    }

    /// Multiply strength by `1 - factor`.
    pub fn attenuate(&mut self, factor: f64) {
        self.strength *= (1.0 - factor).clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn signal() -> Signal {
        Signal::new(
            SignalKey::new(TaskClassKey::new("coding", "code"), ApproachId::from("seed_tutorial")),
            SpecialistId::from("specialist_a"),
            Utc::now(),
        )
    }

    #[test]
    fn test_decay_constant_half_life() {
        let lambda = decay_constant(1800.0);
        let mut s = signal();
        s.strength = 2.0;
        let later = s.last_updated + Duration::seconds(1800);
        assert!((s.decayed_strength(lambda, later) - 1.0).abs() < 1e-9);
        assert_eq!(decay_constant(0.0), 0.0);
    }

    #[test]
    fn test_decay_is_monotone_non_increasing() {
        let lambda = decay_constant(600.0);
        let mut s = signal();
        s.strength = 5.0;
        let mut previous = s.decayed_strength(lambda, s.last_updated);
        for minutes in 1..30 {
            let value = s.decayed_strength(lambda, s.last_updated + Duration::minutes(minutes));
            assert!(value <= previous);
            assert!(value >= 0.0);
            previous = value;
        }
    }

    #[test]
    fn test_past_instant_does_not_amplify() {
        let lambda = decay_constant(600.0);
        let mut s = signal();
        s.strength = 1.0;
        let earlier = s.last_updated - Duration::minutes(10);
        assert_eq!(s.decayed_strength(lambda, earlier), 1.0);
    }

    #[test]
    fn test_attenuate_never_negative() {
        let mut s = signal();
        s.reinforce(1.0);
        s.attenuate(0.3);
        assert!((s.strength - 0.7).abs() < 1e-9);
        s.attenuate(5.0);
        assert_eq!(s.strength, 0.0);
        s.reinforce(-3.0);
        assert_eq!(s.strength, 0.0);
    }

    #[test]
    fn test_storage_key() {
        assert_eq!(signal().key.storage_key(), "coding:code|seed_tutorial");
    }
}
