// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the repository abstractions defined in
//! the domain layer.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve routing state
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! ## JSON File Repositories
//!
//! Durable single-node storage, one JSON document per collection:
//! - **JsonFileSpecialistRepository** - `specialists.json`
//! - **JsonFileApproachRepository** - `approaches.json`
//! - **JsonFileSignalRepository** - `signals.json`
//!
//! The execution ledger lives in [`crate::infrastructure::storage`].
//!
//! ## In-Memory Repositories
//!
//! Lightweight implementations for testing and development:
//! - **InMemorySpecialistRepository**
//! - **InMemoryApproachRepository**
//! - **InMemorySignalRepository**
//! - **InMemoryExecutionHistory**

pub mod json_file;
pub mod json_store;

pub use json_file::{JsonFileApproachRepository, JsonFileSignalRepository, JsonFileSpecialistRepository};
pub use json_store::JsonCollectionStore;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::approach::{Approach, ApproachId};
use crate::domain::execution::{ExecutionRecord, HistoryQuery};
use crate::domain::repository::{
    ApproachRepository, ExecutionHistoryRepository, RepositoryError, SignalRepository, SpecialistRepository,
};
use crate::domain::signal::{Signal, SignalKey};
use crate::domain::specialist::{Specialist, SpecialistId};

#[derive(Clone, Default)]
pub struct InMemorySpecialistRepository {
    specialists: Arc<RwLock<HashMap<SpecialistId, Specialist>>>,
}

impl InMemorySpecialistRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SpecialistRepository for InMemorySpecialistRepository {
    async fn save(&self, specialist: &Specialist) -> Result<(), RepositoryError> {
        self.specialists
            .write()
            .insert(specialist.id.clone(), specialist.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &SpecialistId) -> Result<Option<Specialist>, RepositoryError> {
        Ok(self.specialists.read().get(id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Specialist>, RepositoryError> {
        let mut all: Vec<Specialist> = self.specialists.read().values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryApproachRepository {
    approaches: Arc<RwLock<HashMap<ApproachId, Approach>>>,
}

impl InMemoryApproachRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApproachRepository for InMemoryApproachRepository {
    async fn save(&self, approach: &Approach) -> Result<(), RepositoryError> {
        self.approaches
            .write()
            .insert(approach.id.clone(), approach.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &ApproachId) -> Result<Option<Approach>, RepositoryError> {
        Ok(self.approaches.read().get(id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Approach>, RepositoryError> {
        let mut all: Vec<Approach> = self.approaches.read().values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }
}

#[derive(Clone, Default)]
pub struct InMemorySignalRepository {
    signals: Arc<RwLock<HashMap<SignalKey, Signal>>>,
}

impl InMemorySignalRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SignalRepository for InMemorySignalRepository {
    async fn save(&self, signal: &Signal) -> Result<(), RepositoryError> {
        self.signals.write().insert(signal.key.clone(), signal.clone());
        Ok(())
    }

    async fn remove(&self, key: &SignalKey) -> Result<(), RepositoryError> {
        self.signals.write().remove(key);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Signal>, RepositoryError> {
        let mut all: Vec<Signal> = self.signals.read().values().cloned().collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(all)
    }
}

/// Ledger kept in append order
#[derive(Clone, Default)]
pub struct InMemoryExecutionHistory {
    records: Arc<RwLock<Vec<ExecutionRecord>>>,
}

impl InMemoryExecutionHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExecutionHistoryRepository for InMemoryExecutionHistory {
    async fn append(&self, record: &ExecutionRecord) -> Result<(), RepositoryError> {
        self.records.write().push(record.clone());
        Ok(())
    }

    async fn query_recent(&self, query: &HistoryQuery) -> Result<Vec<ExecutionRecord>, RepositoryError> {
        let records = self.records.read();
        Ok(records
            .iter()
            .rev()
            .filter(|r| query.matches(r))
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.records.read().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution::fixtures::record;
    use crate::domain::signature::TaskSignature;
    use chrono::{Duration, Utc};

    #[test]
    fn test_specialist_save_and_find() {
        let repo = InMemorySpecialistRepository::new();
        let sig = TaskSignature::single_domain("coding", 0.5, &[], "code");
        let specialist = Specialist::new(SpecialistId::from_signature(&sig), &sig, 0.6, Utc::now());

        tokio_test::block_on(repo.save(&specialist)).unwrap();
        let found = tokio_test::block_on(repo.find_by_id(&specialist.id)).unwrap().unwrap();
        assert_eq!(found.id, specialist.id);
        assert_eq!(tokio_test::block_on(repo.list_all()).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_history_is_newest_first_and_filtered() {
        let history = InMemoryExecutionHistory::new();
        let start = Utc::now();
        for i in 0..5 {
            let approach = if i % 2 == 0 { "seed_tutorial" } else { "seed_summary" };
            let quality = 0.5 + i as f64 * 0.1;
            history
                .append(&record(&format!("t{}", i), approach, quality, start + Duration::seconds(i)))
                .await
                .unwrap();
        }

        let recent = history.query_recent(&HistoryQuery::recent(2)).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].task_id.as_str(), "t4");
        assert_eq!(recent[1].task_id.as_str(), "t3");

        let tutorial = history
            .query_recent(&HistoryQuery::recent(10).for_approach(ApproachId::from("seed_tutorial")).with_min_quality(0.65))
            .await
            .unwrap();
        let ids: Vec<&str> = tutorial.iter().map(|r| r.task_id.as_str()).collect();
        assert_eq!(ids, vec!["t4", "t2"]);
        assert_eq!(history.count().await.unwrap(), 5);
    }
}
