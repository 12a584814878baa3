// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Coordinator
//!
//! Composes feature extraction, the three routing levels and the execution
//! history into the two public operations:
//!
//! - [`CoordinationService::get_coordination`] issues a routing decision and
//!   remembers it as pending. Nothing is written to history yet.
//! - [`CoordinationService::record_execution_result`] resolves a pending
//!   decision: specialist, approach and signal board are updated in that
//!   order, the execution record is appended, and discovery runs inline when
//!   the execution counter crosses a multiple of the discovery period.
//!
//! A failed write compensates the steps already applied, leaves the decision
//! pending and surfaces [`RouterError::Persistence`].
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Sequences every cross-store write of the router

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::approach_registry::ApproachRegistry;
use super::evolution::{DiscoveryOutcome, EvolutionEngine};
use super::feature_extractor::FeatureExtractor;
use super::repository_factory::RouterStores;
use super::signal_board::SignalBoard;
use super::specialist_registry::SpecialistRegistry;
use crate::domain::approach::{Approach, ApproachId, ApproachMetadata};
use crate::domain::config::{DiscoveryConfig, RouterConfig};
use crate::domain::errors::{RouterError, ValidationError};
use crate::domain::events::RouterEvent;
use crate::domain::execution::{ContentFeatures, ExecutionRecord};
use crate::domain::pattern::DiscoveryReport;
use crate::domain::repository::{ExecutionHistoryRepository, RepositoryError};
use crate::domain::sanitizer::InputSanitizer;
use crate::domain::signal::{Signal, SignalKey};
use crate::domain::signature::{TaskClassKey, TaskSignature};
use crate::domain::specialist::{Specialist, SpecialistId};
use crate::domain::task::{TaskId, TaskRequest};
use crate::infrastructure::event_bus::EventBus;

/// Quality target handed out when routing fell back to the best-quality approach.
pub const FALLBACK_QUALITY_TARGET: f64 = 0.7;

/// Routing decision returned to the external executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinationDecision {
    pub task_id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_task_id: Option<String>,
    pub specialist_id: SpecialistId,
    pub approach_id: ApproachId,
    pub approach_metadata: ApproachMetadata,
    pub quality_target: f64,
    pub task_class: TaskClassKey,
    pub resonance: f64,
    pub final_score: f64,
}

/// Outcome of an executed decision, reported back by the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub task_id: TaskId,
    pub specialist_id: SpecialistId,
    pub approach_id: ApproachId,
    pub quality: f64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_features: Option<ContentFeatures>,
}

impl ExecutionReport {
    /// Report echoing the ids of `decision`.
    pub fn for_decision(decision: &CoordinationDecision, quality: f64, success: bool) -> Self {
        Self {
            task_id: decision.task_id.clone(),
            specialist_id: decision.specialist_id.clone(),
            approach_id: decision.approach_id.clone(),
            quality,
            success,
            content_features: None,
        }
    }

    pub fn with_content_features(mut self, features: ContentFeatures) -> Self {
        self.content_features = Some(features);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeAck {
    pub task_id: TaskId,
    /// Global execution counter after this outcome.
    pub execution_count: u64,
    pub discovery: DiscoveryOutcome,
}

#[async_trait]
pub trait CoordinationService: Send + Sync {
    async fn get_coordination(&self, task: TaskRequest) -> Result<CoordinationDecision, RouterError>;
    async fn record_execution_result(&self, report: ExecutionReport) -> Result<OutcomeAck, RouterError>;
}

#[derive(Debug, Clone)]
struct PendingDecision {
    external_task_id: Option<String>,
    specialist_id: SpecialistId,
    approach_id: ApproachId,
    signature: TaskSignature,
    task_class: TaskClassKey,
    quality_target: f64,
}

/// State captured before an outcome is applied.
struct OutcomeSnapshot {
    specialist: Option<Specialist>,
    approach: Option<Approach>,
    signal_key: SignalKey,
    signal: Option<Signal>,
}

pub struct StandardCoordinator {
    extractor: FeatureExtractor,
    sanitizer: InputSanitizer,
    specialists: Arc<SpecialistRegistry>,
    approaches: Arc<ApproachRegistry>,
    signals: Arc<SignalBoard>,
    history: Arc<dyn ExecutionHistoryRepository>,
    evolution: Option<Arc<dyn EvolutionEngine>>,
    discovery: DiscoveryConfig,
    pending: DashMap<TaskId, PendingDecision>,
    execution_count: AtomicU64,
    /// Serializes every mutating sequence
    write_lock: Mutex<()>,
    event_bus: EventBus,
}

impl StandardCoordinator {
    /// Load every store and seed the execution counter from history.
    pub async fn bootstrap(
        config: &RouterConfig,
        stores: RouterStores,
        event_bus: EventBus,
    ) -> Result<Self, RepositoryError> {
        let specialists =
            SpecialistRegistry::load(stores.specialists, config.specialists.clone(), event_bus.clone()).await?;
        let approaches =
            ApproachRegistry::load(stores.approaches, config.approaches.clone(), event_bus.clone()).await?;
        let signals = SignalBoard::load(stores.signals, config.signals.clone(), event_bus.clone()).await?;
        Self::from_parts(
            Arc::new(specialists),
            Arc::new(approaches),
            Arc::new(signals),
            stores.history,
            config.discovery.clone(),
            event_bus,
        )
        .await
    }

    pub async fn from_parts(
        specialists: Arc<SpecialistRegistry>,
        approaches: Arc<ApproachRegistry>,
        signals: Arc<SignalBoard>,
        history: Arc<dyn ExecutionHistoryRepository>,
        discovery: DiscoveryConfig,
        event_bus: EventBus,
    ) -> Result<Self, RepositoryError> {
        let execution_count = history.count().await?;
        info!(
            execution_count,
            specialists = specialists.active_count(),
            approaches = approaches.active_count(),
            signals = signals.len(),
            "Coordinator ready"
        );
        Ok(Self {
            extractor: FeatureExtractor::new(),
            sanitizer: InputSanitizer::new(),
            specialists,
            approaches,
            signals,
            history,
            evolution: None,
            discovery,
            pending: DashMap::new(),
            execution_count: AtomicU64::new(execution_count),
            write_lock: Mutex::new(()),
            event_bus,
        })
    }

    pub fn with_evolution_engine(mut self, engine: Arc<dyn EvolutionEngine>) -> Self {
        self.evolution = Some(engine);
        self
    }

    pub fn specialists(&self) -> Arc<SpecialistRegistry> {
        self.specialists.clone()
    }

    pub fn approaches(&self) -> Arc<ApproachRegistry> {
        self.approaches.clone()
    }

    pub fn signals(&self) -> Arc<SignalBoard> {
        self.signals.clone()
    }

    pub fn history(&self) -> Arc<dyn ExecutionHistoryRepository> {
        self.history.clone()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn execution_count(&self) -> u64 {
        self.execution_count.load(Ordering::SeqCst)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, task_id: &TaskId) -> bool {
        self.pending.contains_key(task_id)
    }

    /// [`CoordinationService::get_coordination`] at an explicit instant.
    pub async fn get_coordination_at(
        &self,
        task: TaskRequest,
        now: DateTime<Utc>,
    ) -> Result<CoordinationDecision, RouterError> {
        let external_task_id = match task.id.as_deref() {
            Some(raw) => Some(self.sanitizer.identifier("id", raw)?),
            None => None,
        };
        let signature = self.extractor.extract(&task)?;
        let task_class = signature.task_class_key();

        let _guard = self.write_lock.lock().await;

        // Selection reads only; it runs first so a rejected decision writes nothing.
        let selection = self
            .approaches
            .select_hybrid_at(&signature, &task_class, &self.signals, now)?;
        let approach = self
            .approaches
            .get(&selection.approach_id)
            .ok_or(RouterError::NoActiveApproach)?;
        let matched = self.specialists.match_or_create_at(&signature, now).await?;

        let quality_target = if selection.fallback {
            FALLBACK_QUALITY_TARGET
        } else {
            approach.metrics.avg_quality_ema.clamp(0.0, 1.0)
        };

        let task_id = TaskId::new();
        self.pending.insert(
            task_id.clone(),
            PendingDecision {
                external_task_id: external_task_id.clone(),
                specialist_id: matched.specialist_id.clone(),
                approach_id: selection.approach_id.clone(),
                signature,
                task_class: task_class.clone(),
                quality_target,
            },
        );

        info!(
            task_id = %task_id,
            specialist_id = %matched.specialist_id,
            approach_id = %selection.approach_id,
            task_class = %task_class,
            resonance = matched.resonance,
            final_score = selection.final_score,
            fallback = selection.fallback,
            "Issued coordination decision"
        );
        self.event_bus.publish(RouterEvent::DecisionIssued {
            task_id: task_id.clone(),
            specialist_id: matched.specialist_id.clone(),
            approach_id: selection.approach_id.clone(),
            final_score: selection.final_score,
            timestamp: now,
        });

        Ok(CoordinationDecision {
            task_id,
            external_task_id,
            specialist_id: matched.specialist_id,
            approach_id: selection.approach_id,
            approach_metadata: approach.metadata(),
            quality_target,
            task_class,
            resonance: matched.resonance,
            final_score: selection.final_score,
        })
    }

    /// [`CoordinationService::record_execution_result`] at an explicit instant.
    pub async fn record_execution_result_at(
        &self,
        report: ExecutionReport,
        now: DateTime<Utc>,
    ) -> Result<OutcomeAck, RouterError> {
        self.sanitizer.identifier("task_id", report.task_id.as_str())?;
        self.sanitizer.identifier("specialist_id", report.specialist_id.as_str())?;
        self.sanitizer.identifier("approach_id", report.approach_id.as_str())?;
        let quality = ValidationError::check_range("quality", report.quality, 0.0, 1.0)?;

        let _guard = self.write_lock.lock().await;

        let decision = self
            .pending
            .get(&report.task_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RouterError::unknown_decision(report.task_id.as_str()))?;
        if decision.specialist_id != report.specialist_id || decision.approach_id != report.approach_id {
            warn!(
                task_id = %report.task_id,
                "Outcome does not match the issued decision"
            );
            return Err(RouterError::unknown_decision(report.task_id.as_str()));
        }

        let signal_key = SignalKey::new(decision.task_class.clone(), decision.approach_id.clone());
        let snapshot = OutcomeSnapshot {
            specialist: self.specialists.get(&decision.specialist_id),
            approach: self.approaches.get(&decision.approach_id),
            signal: self.signals.snapshot(&signal_key),
            signal_key,
        };

        // Step events are held back until the history append commits.
        let (specialist, specialist_event) = self
            .specialists
            .stage_outcome(&decision.specialist_id, &decision.signature, quality, report.success, now)
            .await?;

        if let Err(e) = self
            .approaches
            .record_outcome(&decision.approach_id, quality, report.success, now)
            .await
        {
            self.compensate(&snapshot, Step::Specialist).await;
            return Err(e);
        }

        let signal_event = match self
            .signals
            .stage_deposit_at(&decision.task_class, &decision.approach_id, quality, &decision.specialist_id, now)
            .await
        {
            Ok((_, event)) => event,
            Err(e) => {
                self.compensate(&snapshot, Step::Approach).await;
                return Err(e);
            }
        };

        let record = ExecutionRecord {
            task_id: report.task_id.clone(),
            external_task_id: decision.external_task_id.clone(),
            specialist_id: decision.specialist_id.clone(),
            approach_id: decision.approach_id.clone(),
            task_signature: decision.signature.clone(),
            task_class: decision.task_class.clone(),
            quality,
            success: report.success,
            quality_target: decision.quality_target,
            content_features: report.content_features.clone(),
            timestamp: now,
        };
        if let Err(e) = self.history.append(&record).await {
            self.compensate(&snapshot, Step::Signal).await;
            return Err(e.into());
        }

        self.pending.remove(&report.task_id);
        let execution_count = self.execution_count.fetch_add(1, Ordering::SeqCst) + 1;

        info!(
            task_id = %report.task_id,
            specialist_id = %decision.specialist_id,
            approach_id = %decision.approach_id,
            quality,
            success = report.success,
            execution_count,
            "Recorded execution result"
        );
        self.event_bus.publish(specialist_event);
        self.event_bus.publish(signal_event);
        self.event_bus.publish(RouterEvent::OutcomeRecorded {
            task_id: report.task_id.clone(),
            specialist_id: decision.specialist_id,
            approach_id: decision.approach_id,
            quality,
            success: report.success,
            execution_count: specialist.execution_count,
            timestamp: now,
        });

        let discovery = self.maybe_run_discovery(execution_count).await;
        Ok(OutcomeAck {
            task_id: report.task_id,
            execution_count,
            discovery,
        })
    }

    /// Run a discovery pass outside the outcome path, serialized with every
    /// other coordinator write. Returns an empty report without an engine.
    pub async fn run_discovery(&self) -> Result<DiscoveryReport, RouterError> {
        let Some(engine) = self.evolution.as_ref() else {
            return Ok(DiscoveryReport::default());
        };
        let _guard = self.write_lock.lock().await;
        engine.run_discovery().await
    }

    async fn maybe_run_discovery(&self, execution_count: u64) -> DiscoveryOutcome {
        let Some(engine) = self.evolution.as_ref() else {
            return DiscoveryOutcome::NotTriggered;
        };
        if !self.discovery.enabled || self.discovery.period == 0 || execution_count % self.discovery.period != 0 {
            return DiscoveryOutcome::NotTriggered;
        }

        debug!(execution_count, "Discovery boundary crossed");
        match engine.run_discovery().await {
            Ok(report) => DiscoveryOutcome::Completed(report),
            Err(e) => {
                error!(error = %e, execution_count, "Discovery pass failed");
                DiscoveryOutcome::Failed { error: e.to_string() }
            }
        }
    }

    /// Undo every step up to and including `last_applied`, newest first.
    async fn compensate(&self, snapshot: &OutcomeSnapshot, last_applied: Step) {
        warn!(step = ?last_applied, "Compensating partially applied outcome");

        if last_applied >= Step::Signal {
            if let Err(e) = self
                .signals
                .restore(&snapshot.signal_key, snapshot.signal.clone())
                .await
            {
                error!(error = %e, key = %snapshot.signal_key.storage_key(), "Failed to restore signal");
            }
        }
        if last_applied >= Step::Approach {
            if let Some(approach) = snapshot.approach.clone() {
                if let Err(e) = self.approaches.restore(approach).await {
                    error!(error = %e, "Failed to restore approach");
                }
            }
        }
        if let Some(specialist) = snapshot.specialist.clone() {
            if let Err(e) = self.specialists.restore(specialist).await {
                error!(error = %e, "Failed to restore specialist");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Step {
    Specialist,
    Approach,
    Signal,
}

#[async_trait]
impl CoordinationService for StandardCoordinator {
    async fn get_coordination(&self, task: TaskRequest) -> Result<CoordinationDecision, RouterError> {
        self.get_coordination_at(task, Utc::now()).await
    }

    async fn record_execution_result(&self, report: ExecutionReport) -> Result<OutcomeAck, RouterError> {
        self.record_execution_result_at(report, Utc::now()).await
    }
}

/// Lets a background scheduler drive discovery through the coordinator's lock.
#[async_trait]
impl EvolutionEngine for StandardCoordinator {
    async fn run_discovery(&self) -> Result<DiscoveryReport, RouterError> {
        StandardCoordinator::run_discovery(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution::HistoryQuery;
    use crate::infrastructure::repositories::InMemoryExecutionHistory;
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    /// History that can be told to fail appends.
    #[derive(Default)]
    struct FlakyHistory {
        inner: InMemoryExecutionHistory,
        failing: AtomicBool,
    }

    #[async_trait]
    impl ExecutionHistoryRepository for FlakyHistory {
        async fn append(&self, record: &ExecutionRecord) -> Result<(), RepositoryError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(RepositoryError::Io("disk full".to_string()));
            }
            self.inner.append(record).await
        }

        async fn query_recent(&self, query: &HistoryQuery) -> Result<Vec<ExecutionRecord>, RepositoryError> {
            self.inner.query_recent(query).await
        }

        async fn count(&self) -> Result<u64, RepositoryError> {
            self.inner.count().await
        }
    }

    #[derive(Default)]
    struct CountingEngine {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl EvolutionEngine for CountingEngine {
        async fn run_discovery(&self) -> Result<DiscoveryReport, RouterError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(DiscoveryReport::default())
        }
    }

    async fn coordinator_with(config: &RouterConfig, history: Arc<dyn ExecutionHistoryRepository>) -> StandardCoordinator {
        let stores = RouterStores {
            history,
            ..RouterStores::in_memory()
        };
        StandardCoordinator::bootstrap(config, stores, EventBus::new(256)).await.unwrap()
    }

    fn coding_task() -> TaskRequest {
        TaskRequest::new("Implement a retry helper for the HTTP client")
            .with_domain("coding")
            .with_complexity(0.6)
            .with_output_type("code")
    }

    #[tokio::test]
    async fn test_decision_then_outcome() {
        let coordinator = coordinator_with(&RouterConfig::default(), Arc::new(InMemoryExecutionHistory::new())).await;
        let decision = coordinator
            .get_coordination(coding_task().with_id("caller-42"))
            .await
            .unwrap();
        assert_eq!(decision.external_task_id.as_deref(), Some("caller-42"));
        assert_ne!(decision.task_id.as_str(), "caller-42");
        assert!((0.0..=1.0).contains(&decision.quality_target));
        assert!(coordinator.is_pending(&decision.task_id));
        assert_eq!(coordinator.history().count().await.unwrap(), 0);

        let ack = coordinator
            .record_execution_result(ExecutionReport::for_decision(&decision, 0.9, true))
            .await
            .unwrap();
        assert_eq!(ack.execution_count, 1);
        assert_eq!(ack.discovery, DiscoveryOutcome::NotTriggered);
        assert_eq!(coordinator.pending_count(), 0);

        let records = coordinator.history().query_recent(&HistoryQuery::recent(10)).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].external_task_id.as_deref(), Some("caller-42"));
        assert_eq!(records[0].approach_id, decision.approach_id);
    }

    #[tokio::test]
    async fn test_mismatched_ids_are_rejected_without_mutation() {
        let coordinator = coordinator_with(&RouterConfig::default(), Arc::new(InMemoryExecutionHistory::new())).await;
        let decision = coordinator.get_coordination(coding_task()).await.unwrap();
        let before = coordinator.specialists().get(&decision.specialist_id).unwrap();

        let mut report = ExecutionReport::for_decision(&decision, 0.9, true);
        report.approach_id = ApproachId::from("seed_somewhere_else");
        let err = coordinator.record_execution_result(report).await.unwrap_err();
        assert!(matches!(err, RouterError::UnknownDecision { .. }));

        let after = coordinator.specialists().get(&decision.specialist_id).unwrap();
        assert_eq!(before.execution_count, after.execution_count);
        assert!(coordinator.is_pending(&decision.task_id));
    }

    #[tokio::test]
    async fn test_invalid_quality_is_a_validation_error() {
        let coordinator = coordinator_with(&RouterConfig::default(), Arc::new(InMemoryExecutionHistory::new())).await;
        let decision = coordinator.get_coordination(coding_task()).await.unwrap();
        let err = coordinator
            .record_execution_result(ExecutionReport::for_decision(&decision, 1.2, true))
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::Validation(_)));
        assert!(coordinator.is_pending(&decision.task_id));
    }

    #[tokio::test]
    async fn test_failed_append_rolls_back_and_keeps_decision() {
        let history = Arc::new(FlakyHistory::default());
        let coordinator = coordinator_with(&RouterConfig::default(), history.clone()).await;
        let decision = coordinator.get_coordination(coding_task()).await.unwrap();

        let specialist_before = coordinator.specialists().get(&decision.specialist_id).unwrap();
        let approach_before = coordinator.approaches().get(&decision.approach_id).unwrap();
        let key = SignalKey::new(decision.task_class.clone(), decision.approach_id.clone());
        assert!(coordinator.signals().snapshot(&key).is_none());

        history.failing.store(true, Ordering::SeqCst);
        let err = coordinator
            .record_execution_result(ExecutionReport::for_decision(&decision, 0.9, true))
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::Persistence(_)));

        let specialist_after = coordinator.specialists().get(&decision.specialist_id).unwrap();
        let approach_after = coordinator.approaches().get(&decision.approach_id).unwrap();
        assert_eq!(specialist_after.execution_count, specialist_before.execution_count);
        assert_eq!(approach_after.metrics, approach_before.metrics);
        assert!(coordinator.signals().snapshot(&key).is_none());
        assert!(coordinator.is_pending(&decision.task_id));
        assert_eq!(coordinator.execution_count(), 0);

        history.failing.store(false, Ordering::SeqCst);
        let ack = coordinator
            .record_execution_result(ExecutionReport::for_decision(&decision, 0.9, true))
            .await
            .unwrap();
        assert_eq!(ack.execution_count, 1);
        assert_eq!(
            coordinator.specialists().get(&decision.specialist_id).unwrap().execution_count,
            specialist_before.execution_count + 1
        );
    }

    #[tokio::test]
    async fn test_discovery_runs_on_period_boundary() {
        let mut config = RouterConfig::default();
        config.discovery.period = 3;
        let engine = Arc::new(CountingEngine::default());
        let coordinator = coordinator_with(&config, Arc::new(InMemoryExecutionHistory::new()))
            .await
            .with_evolution_engine(engine.clone());

        let mut outcomes = Vec::new();
        for _ in 0..6 {
            let decision = coordinator.get_coordination(coding_task()).await.unwrap();
            let ack = coordinator
                .record_execution_result(ExecutionReport::for_decision(&decision, 0.8, true))
                .await
                .unwrap();
            outcomes.push(ack.discovery.is_triggered());
        }
        assert_eq!(outcomes, vec![false, false, true, false, false, true]);
        assert_eq!(engine.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rejected_decision_leaves_specialists_untouched() {
        let mut config = RouterConfig::default();
        config.approaches.seed_defaults = false;
        let coordinator = coordinator_with(&config, Arc::new(InMemoryExecutionHistory::new())).await;
        let mut receiver = coordinator.event_bus().subscribe();

        let err = coordinator.get_coordination(coding_task()).await.unwrap_err();
        assert!(matches!(err, RouterError::NoActiveApproach));
        assert_eq!(coordinator.specialists().active_count(), 0);
        assert_eq!(coordinator.pending_count(), 0);
        assert!(receiver.drain().is_empty());
    }

    #[tokio::test]
    async fn test_failed_append_publishes_no_step_events() {
        let history = Arc::new(FlakyHistory::default());
        let coordinator = coordinator_with(&RouterConfig::default(), history.clone()).await;
        let decision = coordinator.get_coordination(coding_task()).await.unwrap();
        let mut receiver = coordinator.event_bus().subscribe();

        history.failing.store(true, Ordering::SeqCst);
        coordinator
            .record_execution_result(ExecutionReport::for_decision(&decision, 0.9, true))
            .await
            .unwrap_err();
        assert!(receiver.drain().is_empty());

        history.failing.store(false, Ordering::SeqCst);
        coordinator
            .record_execution_result(ExecutionReport::for_decision(&decision, 0.9, true))
            .await
            .unwrap();
        let types: Vec<&str> = receiver.drain().iter().map(|e| e.event_type()).collect();
        assert_eq!(types, vec!["specialist_updated", "signal_reinforced", "outcome_recorded"]);
    }

    #[tokio::test]
    async fn test_scheduled_discovery_waits_for_writes() {
        let engine = Arc::new(CountingEngine::default());
        let coordinator = Arc::new(
            coordinator_with(&RouterConfig::default(), Arc::new(InMemoryExecutionHistory::new()))
                .await
                .with_evolution_engine(engine.clone()),
        );

        let guard = coordinator.write_lock.lock().await;
        let scheduled: Arc<dyn EvolutionEngine> = coordinator.clone();
        let blocked = tokio::time::timeout(std::time::Duration::from_millis(50), scheduled.run_discovery()).await;
        assert!(blocked.is_err(), "discovery ran while a write was in flight");
        assert_eq!(engine.runs.load(Ordering::SeqCst), 0);

        drop(guard);
        scheduled.run_discovery().await.unwrap();
        assert_eq!(engine.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_scheduled_discovery_without_engine_is_empty() {
        let coordinator = coordinator_with(&RouterConfig::default(), Arc::new(InMemoryExecutionHistory::new())).await;
        let report = coordinator.run_discovery().await.unwrap();
        assert!(report.is_noop());
    }

    #[tokio::test]
    async fn test_events_for_decision_and_outcome() {
        let coordinator = coordinator_with(&RouterConfig::default(), Arc::new(InMemoryExecutionHistory::new())).await;
        let mut receiver = coordinator.event_bus().subscribe();
        let decision = coordinator.get_coordination(coding_task()).await.unwrap();
        coordinator
            .record_execution_result(ExecutionReport::for_decision(&decision, 0.9, true))
            .await
            .unwrap();

        let types: Vec<&str> = receiver.drain().iter().map(|e| e.event_type()).collect();
        assert!(types.contains(&"decision_issued"));
        assert!(types.contains(&"outcome_recorded"));
        let issued = types.iter().position(|t| *t == "decision_issued").unwrap();
        let recorded = types.iter().position(|t| *t == "outcome_recorded").unwrap();
        assert!(issued < recorded);
    }
}
