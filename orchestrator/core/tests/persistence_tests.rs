// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use hybrid_swarm_core::application::coordinator::{
    CoordinationService, ExecutionReport, StandardCoordinator,
};
use hybrid_swarm_core::application::repository_factory::{create_router_stores, RouterStores};
use hybrid_swarm_core::domain::approach::{Approach, ApproachId};
use hybrid_swarm_core::domain::config::RouterConfig;
use hybrid_swarm_core::domain::errors::RouterError;
use hybrid_swarm_core::domain::repository::{ApproachRepository, RepositoryError, StorageBackend};
use hybrid_swarm_core::domain::signal::SignalKey;
use hybrid_swarm_core::domain::task::TaskRequest;
use hybrid_swarm_core::infrastructure::event_bus::EventBus;
use hybrid_swarm_core::infrastructure::repositories::json_file::{APPROACHES_FILE, SIGNALS_FILE, SPECIALISTS_FILE};
use hybrid_swarm_core::infrastructure::repositories::InMemoryApproachRepository;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

async fn open(dir: &Path) -> StandardCoordinator {
    let mut config = RouterConfig::default();
    config.storage.data_dir = Some(dir.to_path_buf());
    let stores = create_router_stores(&config.storage.backend()).await.unwrap();
    StandardCoordinator::bootstrap(&config, stores, EventBus::new(256))
        .await
        .unwrap()
}

fn tutorial_task() -> TaskRequest {
    TaskRequest::new("Write a beginner guide to setting up a Rust workspace")
        .with_domain("writing")
        .with_keywords(["tutorial", "guide"])
        .with_output_type("tutorial")
        .with_complexity(0.5)
}

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let (specialist_id, approach_id, task_class) = {
        let coordinator = open(dir.path()).await;
        let mut last = None;
        for _ in 0..3 {
            let decision = coordinator.get_coordination(tutorial_task()).await.unwrap();
            coordinator
                .record_execution_result(ExecutionReport::for_decision(&decision, 0.9, true))
                .await
                .unwrap();
            last = Some(decision);
        }
        let decision = last.unwrap();
        (decision.specialist_id, decision.approach_id, decision.task_class)
    };

    let reopened = open(dir.path()).await;
    assert_eq!(reopened.execution_count(), 3);
    assert_eq!(reopened.history().count().await.unwrap(), 3);

    let specialist = reopened.specialists().get(&specialist_id).unwrap();
    assert_eq!(specialist.execution_count, 3);
    let approach = reopened.approaches().get(&approach_id).unwrap();
    assert_eq!(approach.metrics.usage_count, 3);
    assert_eq!(reopened.approaches().list_all().len(), 3, "seeds are not installed twice");
    assert!(reopened
        .signals()
        .snapshot(&SignalKey::new(task_class, approach_id))
        .is_some());

    // Decisions are not durable: a fresh process knows nothing about them.
    let decision = reopened.get_coordination(tutorial_task()).await.unwrap();
    assert_eq!(decision.specialist_id, specialist_id);
}

#[tokio::test]
async fn test_corrupt_collections_load_empty() {
    let dir = tempfile::tempdir().unwrap();
    for file in [SPECIALISTS_FILE, APPROACHES_FILE, SIGNALS_FILE] {
        std::fs::write(dir.path().join(file), b"{ not json").unwrap();
    }

    let coordinator = open(dir.path()).await;
    assert_eq!(coordinator.specialists().active_count(), 0);
    assert_eq!(coordinator.approaches().active_count(), 3);
    assert!(coordinator.signals().is_empty());

    let decision = coordinator.get_coordination(tutorial_task()).await.unwrap();
    coordinator
        .record_execution_result(ExecutionReport::for_decision(&decision, 0.8, true))
        .await
        .unwrap();
    assert_eq!(coordinator.history().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_corrupt_history_lines_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    {
        let coordinator = open(dir.path()).await;
        let decision = coordinator.get_coordination(tutorial_task()).await.unwrap();
        coordinator
            .record_execution_result(ExecutionReport::for_decision(&decision, 0.8, true))
            .await
            .unwrap();
    }

    let history_dir = dir.path().join("history");
    let partition = std::fs::read_dir(&history_dir)
        .unwrap()
        .filter_map(Result::ok)
        .find(|entry| entry.path().is_dir())
        .unwrap()
        .path();
    let file = std::fs::read_dir(&partition).unwrap().next().unwrap().unwrap().path();
    let mut contents = std::fs::read_to_string(&file).unwrap();
    contents.push_str("{\"truncated\": \n");
    std::fs::write(&file, contents).unwrap();

    let reopened = open(dir.path()).await;
    let records = reopened
        .history()
        .query_recent(&hybrid_swarm_core::domain::execution::HistoryQuery::recent(10))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
}

/// Approach store whose writes can be switched off.
#[derive(Default)]
struct UnreliableApproachStore {
    inner: InMemoryApproachRepository,
    failing: AtomicBool,
}

#[async_trait]
impl ApproachRepository for UnreliableApproachStore {
    async fn save(&self, approach: &Approach) -> Result<(), RepositoryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Storage("approach store unavailable".to_string()));
        }
        self.inner.save(approach).await
    }

    async fn find_by_id(&self, id: &ApproachId) -> Result<Option<Approach>, RepositoryError> {
        self.inner.find_by_id(id).await
    }

    async fn list_all(&self) -> Result<Vec<Approach>, RepositoryError> {
        self.inner.list_all().await
    }
}

#[tokio::test]
async fn test_failed_approach_write_restores_specialist() {
    let store = Arc::new(UnreliableApproachStore::default());
    let stores = RouterStores {
        approaches: store.clone(),
        ..RouterStores::in_memory()
    };
    let coordinator = StandardCoordinator::bootstrap(&RouterConfig::default(), stores, EventBus::new(64))
        .await
        .unwrap();

    let decision = coordinator.get_coordination(tutorial_task()).await.unwrap();
    let before = coordinator.specialists().get(&decision.specialist_id).unwrap();

    store.failing.store(true, Ordering::SeqCst);
    let err = coordinator
        .record_execution_result(ExecutionReport::for_decision(&decision, 0.9, true))
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::Persistence(RepositoryError::Storage(_))));

    let after = coordinator.specialists().get(&decision.specialist_id).unwrap();
    assert_eq!(after.execution_count, before.execution_count);
    assert_eq!(after.quality_ema, before.quality_ema);
    assert_eq!(coordinator.history().count().await.unwrap(), 0);
    assert!(coordinator.is_pending(&decision.task_id));

    store.failing.store(false, Ordering::SeqCst);
    coordinator
        .record_execution_result(ExecutionReport::for_decision(&decision, 0.9, true))
        .await
        .unwrap();
    assert_eq!(coordinator.history().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_in_memory_backend_needs_no_data_dir() {
    let stores = create_router_stores(&StorageBackend::InMemory).await.unwrap();
    let coordinator = StandardCoordinator::bootstrap(&RouterConfig::default(), stores, EventBus::new(64))
        .await
        .unwrap();
    assert_eq!(coordinator.execution_count(), 0);
}
