// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for each entity collection. Every collection is
//! independently loadable and storable; the coordinator is the only
//! component that sequences writes across them.
//!
//! | Trait | Entity | Implementations |
//! |-------|--------|----------------|
//! | `SpecialistRepository` | `Specialist` | `InMemorySpecialistRepository`, `JsonFileSpecialistRepository` |
//! | `ApproachRepository` | `Approach` | `InMemoryApproachRepository`, `JsonFileApproachRepository` |
//! | `SignalRepository` | `Signal` | `InMemorySignalRepository`, `JsonFileSignalRepository` |
//! | `ExecutionHistoryRepository` | `ExecutionRecord` | `InMemoryExecutionHistory`, `JsonlExecutionHistory` |
//!
//! A failed `save` must leave the stored state exactly as it was before the
//! call, so callers can treat each write as all-or-nothing.

use async_trait::async_trait;
use thiserror::Error;

use super::approach::{Approach, ApproachId};
use super::execution::{ExecutionRecord, HistoryQuery};
use super::signal::{Signal, SignalKey};
use super::specialist::{Specialist, SpecialistId};

/// Storage backend selection
#[derive(Debug, Clone, PartialEq)]
pub enum StorageBackend {
    InMemory,
    /// JSON collections plus a partitioned JSONL ledger under a data directory.
    FileSystem(std::path::PathBuf),
}

/// Repository interface for specialist profiles
#[async_trait]
pub trait SpecialistRepository: Send + Sync {
    /// Save specialist (create or update)
    async fn save(&self, specialist: &Specialist) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &SpecialistId) -> Result<Option<Specialist>, RepositoryError>;

    /// List all specialists, evicted ones included
    async fn list_all(&self) -> Result<Vec<Specialist>, RepositoryError>;
}

/// Repository interface for the approach catalog
#[async_trait]
pub trait ApproachRepository: Send + Sync {
    /// Save approach (create or update)
    async fn save(&self, approach: &Approach) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &ApproachId) -> Result<Option<Approach>, RepositoryError>;

    /// List all approaches, pruned ones included
    async fn list_all(&self) -> Result<Vec<Approach>, RepositoryError>;
}

/// Repository interface for the signal board
#[async_trait]
pub trait SignalRepository: Send + Sync {
    async fn save(&self, signal: &Signal) -> Result<(), RepositoryError>;

    async fn remove(&self, key: &SignalKey) -> Result<(), RepositoryError>;

    async fn list_all(&self) -> Result<Vec<Signal>, RepositoryError>;
}

/// Append-only execution ledger. There is no update or delete.
#[async_trait]
pub trait ExecutionHistoryRepository: Send + Sync {
    /// Durable before returning
    async fn append(&self, record: &ExecutionRecord) -> Result<(), RepositoryError>;

    /// Newest first, filtered, at most `query.limit` records
    async fn query_recent(&self, query: &HistoryQuery) -> Result<Vec<ExecutionRecord>, RepositoryError>;

    /// Total number of records ever appended
    async fn count(&self) -> Result<u64, RepositoryError>;
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for RepositoryError {
    fn from(err: std::io::Error) -> Self {
        RepositoryError::Io(err.to_string())
    }
}
