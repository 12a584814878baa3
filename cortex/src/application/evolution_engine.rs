// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Pattern Evolution Engine
//!
//! One discovery pass:
//!
//! 1. Pull the most recent successful records from the execution history.
//! 2. Cluster them and extract a pattern per surviving cluster.
//! 3. For each pattern, create a new approach when it is far from every
//!    active approach, otherwise evolve the nearest one toward it.
//! 4. Prune approaches that underperform the population, fail too often or
//!    never gained traction.
//!
//! Finding nothing is a normal, empty [`DiscoveryReport`].
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Unsupervised creation, refinement and pruning of approaches

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hybrid_swarm_core::application::approach_registry::ApproachRegistry;
use hybrid_swarm_core::application::evolution::EvolutionEngine;
use hybrid_swarm_core::domain::approach::{Approach, ApproachId, ApproachOrigin, PruneReason};
use hybrid_swarm_core::domain::config::DiscoveryConfig;
use hybrid_swarm_core::domain::errors::RouterError;
use hybrid_swarm_core::domain::events::RouterEvent;
use hybrid_swarm_core::domain::execution::HistoryQuery;
use hybrid_swarm_core::domain::pattern::{DiscoveryReport, Pattern};
use hybrid_swarm_core::domain::repository::ExecutionHistoryRepository;
use hybrid_swarm_core::infrastructure::event_bus::EventBus;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::pattern_analyzer::PatternAnalyzer;

/// Success rate below which a well-used approach is pruned.
pub const MIN_SUCCESS_RATE: f64 = 0.5;

pub struct PatternEvolutionEngine {
    approaches: Arc<ApproachRegistry>,
    history: Arc<dyn ExecutionHistoryRepository>,
    analyzer: PatternAnalyzer,
    config: DiscoveryConfig,
    event_bus: EventBus,
    /// One pass at a time, whether triggered inline or by the maintenance worker
    pass_lock: Mutex<()>,
}

impl PatternEvolutionEngine {
    pub fn new(
        approaches: Arc<ApproachRegistry>,
        history: Arc<dyn ExecutionHistoryRepository>,
        config: DiscoveryConfig,
        event_bus: EventBus,
    ) -> Self {
        Self {
            analyzer: PatternAnalyzer::from_config(&config),
            approaches,
            history,
            config,
            event_bus,
            pass_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub async fn run_discovery_at(&self, now: DateTime<Utc>) -> Result<DiscoveryReport, RouterError> {
        let _pass = self.pass_lock.lock().await;
        let started = Instant::now();

        let query = HistoryQuery::recent(self.config.window_size).with_min_quality(self.config.success_threshold);
        let records = self.history.query_recent(&query).await?;
        let patterns = self.analyzer.analyze(&records, now);

        let mut report = DiscoveryReport {
            records_analyzed: records.len(),
            clusters_found: patterns.len(),
            ..Default::default()
        };

        for pattern in &patterns {
            self.integrate(pattern, now, &mut report).await?;
        }
        report.pruned = self.prune_pass(now).await?;
        report.duration_ms = started.elapsed().as_millis() as u64;

        info!(
            records_analyzed = report.records_analyzed,
            clusters_found = report.clusters_found,
            created = report.created.len(),
            evolved = report.evolved.len(),
            pruned = report.pruned.len(),
            duration_ms = report.duration_ms,
            "Discovery pass completed"
        );
        self.event_bus.publish(RouterEvent::DiscoveryCompleted {
            records_analyzed: report.records_analyzed,
            clusters_found: report.clusters_found,
            created: report.created.len(),
            evolved: report.evolved.len(),
            pruned: report.pruned.len(),
            duration_ms: report.duration_ms,
            timestamp: now,
        });
        Ok(report)
    }

    /// Create when novel, otherwise evolve the nearest active approach.
    async fn integrate(&self, pattern: &Pattern, now: DateTime<Utc>, report: &mut DiscoveryReport) -> Result<(), RouterError> {
        let nearest = self
            .approaches
            .list_active()
            .into_iter()
            .map(|a| {
                let distance = a.signature.distance(&pattern.signature);
                (a.id, distance)
            })
            .fold(None, |best: Option<(ApproachId, f64)>, (id, d)| match best {
                Some((_, best_d)) if best_d <= d => best,
                _ => Some((id, d)),
            });

        match nearest {
            Some((id, distance)) if distance <= self.config.novelty_threshold => {
                debug!(approach_id = %id, distance, pattern_id = %pattern.id, "Pattern refines existing approach");
                self.approaches
                    .evolve(&id, pattern, self.config.evolution_rate, now)
                    .await?;
                report.evolved.push(id);
            }
            _ => {
                let distance = nearest.as_ref().map(|(_, d)| *d);
                debug!(?distance, pattern_id = %pattern.id, "Pattern is novel");
                let id = self.approaches.create(pattern, now).await?;
                report.created.push(id);
            }
        }
        Ok(())
    }

    /// Prune by population-relative quality, success rate and staleness.
    async fn prune_pass(&self, now: DateTime<Utc>) -> Result<Vec<ApproachId>, RouterError> {
        let active = self.approaches.list_active();
        let threshold = self.quality_threshold(&active);

        let mut candidates: Vec<(ApproachId, PruneReason)> = active
            .iter()
            .filter_map(|a| self.prune_reason(a, threshold, now).map(|r| (a.id.clone(), r)))
            .collect();
        candidates.sort_by(|a, b| a.0.cmp(&b.0));

        let mut pruned = Vec::new();
        for (id, reason) in candidates {
            if self.approaches.prune(&id, reason, now).await? {
                pruned.push(id);
            }
        }
        Ok(pruned)
    }

    /// `mean − k·std` of active quality, or `None` with fewer than two approaches.
    fn quality_threshold(&self, active: &[Approach]) -> Option<f64> {
        if active.len() < 2 {
            return None;
        }
        let n = active.len() as f64;
        let mean = active.iter().map(|a| a.metrics.avg_quality_ema).sum::<f64>() / n;
        let variance = active
            .iter()
            .map(|a| (a.metrics.avg_quality_ema - mean).powi(2))
            .sum::<f64>()
            / n;
        Some(mean - self.config.prune_std_devs * variance.sqrt())
    }

    pub fn prune_reason(&self, approach: &Approach, threshold: Option<f64>, now: DateTime<Utc>) -> Option<PruneReason> {
        let metrics = &approach.metrics;
        if metrics.usage_count >= self.config.min_usage_for_pruning {
            if let Some(threshold) = threshold {
                if metrics.avg_quality_ema < threshold {
                    return Some(PruneReason::Underperforming {
                        avg_quality: metrics.avg_quality_ema,
                        threshold,
                    });
                }
            }
            if metrics.success_rate < MIN_SUCCESS_RATE {
                return Some(PruneReason::LowSuccessRate {
                    success_rate: metrics.success_rate,
                });
            }
        }

        let age_days = approach.age_days(now);
        if approach.origin != ApproachOrigin::Seed
            && age_days > self.config.stale_after_days
            && metrics.usage_count < self.config.stale_max_usage
        {
            return Some(PruneReason::Stale {
                age_days,
                usage_count: metrics.usage_count,
            });
        }
        None
    }
}

#[async_trait]
impl EvolutionEngine for PatternEvolutionEngine {
    async fn run_discovery(&self) -> Result<DiscoveryReport, RouterError> {
        self.run_discovery_at(Utc::now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use hybrid_swarm_core::application::seed_approaches::{SEED_COMPREHENSIVE, SEED_SUMMARY, SEED_TUTORIAL};
    use hybrid_swarm_core::domain::config::ApproachConfig;
    use hybrid_swarm_core::domain::execution::ExecutionRecord;
    use hybrid_swarm_core::domain::signature::TaskSignature;
    use hybrid_swarm_core::domain::specialist::SpecialistId;
    use hybrid_swarm_core::domain::task::TaskId;
    use hybrid_swarm_core::infrastructure::repositories::{InMemoryApproachRepository, InMemoryExecutionHistory};

    async fn engine() -> (PatternEvolutionEngine, Arc<ApproachRegistry>, Arc<InMemoryExecutionHistory>) {
        let bus = EventBus::new(256);
        let approaches = Arc::new(
            ApproachRegistry::load(Arc::new(InMemoryApproachRepository::new()), ApproachConfig::default(), bus.clone())
                .await
                .unwrap(),
        );
        let history = Arc::new(InMemoryExecutionHistory::new());
        let engine = PatternEvolutionEngine::new(approaches.clone(), history.clone(), DiscoveryConfig::default(), bus);
        (engine, approaches, history)
    }

    async fn feed(history: &InMemoryExecutionHistory, count: usize, domain: &str, output: &str, quality: f64) {
        let start = Utc::now() - Duration::hours(2);
        for i in 0..count {
            let signature = TaskSignature::single_domain(domain, 0.5, &["workspace"], output);
            let record = ExecutionRecord {
                task_id: TaskId::from(format!("task_{}_{}_{:03}", domain, output, i).as_str()),
                external_task_id: None,
                specialist_id: SpecialistId::from("specialist_a"),
                approach_id: ApproachId::from(SEED_TUTORIAL),
                task_class: signature.task_class_key(),
                task_signature: signature,
                quality,
                success: true,
                quality_target: 0.7,
                content_features: None,
                timestamp: start + Duration::seconds(i as i64),
            };
            history.append(&record).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_empty_history_is_a_noop() {
        let (engine, approaches, _) = engine().await;
        let report = engine.run_discovery().await.unwrap();
        assert!(report.is_noop());
        assert_eq!(report.records_analyzed, 0);
        assert_eq!(approaches.active_count(), 3);
    }

    #[tokio::test]
    async fn test_second_pass_evolves_instead_of_duplicating() {
        let (engine, approaches, history) = engine().await;
        feed(&history, 20, "writing", "walkthrough", 0.9).await;

        let first = engine.run_discovery().await.unwrap();
        assert_eq!(first.created.len(), 1);
        let created = first.created[0].clone();

        let second = engine.run_discovery().await.unwrap();
        assert!(second.created.is_empty());
        assert_eq!(second.evolved, vec![created.clone()]);
        let evolved = approaches.get(&created).unwrap();
        assert_eq!(evolved.version, 2);
        assert_eq!(evolved.origin, ApproachOrigin::Evolved);
    }

    #[tokio::test]
    async fn test_low_quality_records_are_ignored() {
        let (engine, _, history) = engine().await;
        feed(&history, 20, "writing", "walkthrough", 0.4).await;
        let report = engine.run_discovery().await.unwrap();
        assert_eq!(report.records_analyzed, 0);
        assert!(report.created.is_empty());
    }

    #[tokio::test]
    async fn test_prune_reasons() {
        let (engine, approaches, _) = engine().await;
        let now = Utc::now();

        // Drive the summary seed far below the others.
        let summary = ApproachId::from(SEED_SUMMARY);
        for _ in 0..25 {
            approaches.record_outcome(&summary, 0.0, false, now).await.unwrap();
        }
        for id in [SEED_TUTORIAL, SEED_COMPREHENSIVE] {
            for _ in 0..25 {
                approaches.record_outcome(&ApproachId::from(id), 0.9, true, now).await.unwrap();
            }
        }

        let report = engine.run_discovery_at(now).await.unwrap();
        assert_eq!(report.pruned, vec![summary.clone()]);
        assert!(!approaches.get(&summary).unwrap().is_active());

        // Idempotent: nothing left to prune.
        let again = engine.run_discovery_at(now).await.unwrap();
        assert!(again.pruned.is_empty());
    }

    #[tokio::test]
    async fn test_stale_discovered_approach_is_pruned_but_seeds_are_not() {
        let (engine, approaches, history) = engine().await;
        feed(&history, 10, "writing", "walkthrough", 0.9).await;
        let created = engine.run_discovery().await.unwrap().created;
        assert_eq!(created.len(), 1);

        let later = Utc::now() + Duration::days(45);
        let threshold = engine.quality_threshold(&approaches.list_active());
        let discovered = approaches.get(&created[0]).unwrap();
        assert!(matches!(
            engine.prune_reason(&discovered, threshold, later),
            Some(PruneReason::Stale { .. })
        ));
        let seed = approaches.get(&ApproachId::from(SEED_TUTORIAL)).unwrap();
        assert!(engine.prune_reason(&seed, threshold, later).is_none());
    }
}
