// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates concrete repository implementations based on storage backend configuration,
//! keeping the Domain Layer free of infrastructure dependencies.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Wires the four router stores for a storage backend

use std::sync::Arc;

use crate::domain::repository::{
    ApproachRepository, ExecutionHistoryRepository, RepositoryError, SignalRepository, SpecialistRepository,
    StorageBackend,
};
use crate::infrastructure::repositories::{
    InMemoryApproachRepository, InMemoryExecutionHistory, InMemorySignalRepository, InMemorySpecialistRepository,
    JsonFileApproachRepository, JsonFileSignalRepository, JsonFileSpecialistRepository,
};
use crate::infrastructure::storage::JsonlExecutionHistory;

/// Subdirectory of the data dir holding the partitioned history log.
pub const HISTORY_DIR: &str = "history";

/// The independently loadable entity collections behind the coordinator.
#[derive(Clone)]
pub struct RouterStores {
    pub specialists: Arc<dyn SpecialistRepository>,
    pub approaches: Arc<dyn ApproachRepository>,
    pub signals: Arc<dyn SignalRepository>,
    pub history: Arc<dyn ExecutionHistoryRepository>,
}

impl RouterStores {
    pub fn in_memory() -> Self {
        Self {
            specialists: Arc::new(InMemorySpecialistRepository::new()),
            approaches: Arc::new(InMemoryApproachRepository::new()),
            signals: Arc::new(InMemorySignalRepository::new()),
            history: Arc::new(InMemoryExecutionHistory::new()),
        }
    }
}

/// Creates the router stores for the configured backend
pub async fn create_router_stores(backend: &StorageBackend) -> Result<RouterStores, RepositoryError> {
    match backend {
        StorageBackend::InMemory => Ok(RouterStores::in_memory()),
        StorageBackend::FileSystem(data_dir) => Ok(RouterStores {
            specialists: Arc::new(JsonFileSpecialistRepository::open(data_dir).await?),
            approaches: Arc::new(JsonFileApproachRepository::open(data_dir).await?),
            signals: Arc::new(JsonFileSignalRepository::open(data_dir).await?),
            history: Arc::new(JsonlExecutionHistory::open(data_dir.join(HISTORY_DIR)).await?),
        }),
    }
}
