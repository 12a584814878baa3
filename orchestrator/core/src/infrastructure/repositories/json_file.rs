// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! File-backed repositories for specialists, approaches and signals.
//! Each collection is an independent [`JsonCollectionStore`] under the data directory.

use async_trait::async_trait;
use std::path::Path;

use super::json_store::JsonCollectionStore;
use crate::domain::approach::{Approach, ApproachId};
use crate::domain::repository::{ApproachRepository, RepositoryError, SignalRepository, SpecialistRepository};
use crate::domain::signal::{Signal, SignalKey};
use crate::domain::specialist::{Specialist, SpecialistId};

pub const SPECIALISTS_FILE: &str = "specialists.json";
pub const APPROACHES_FILE: &str = "approaches.json";
pub const SIGNALS_FILE: &str = "signals.json";

pub struct JsonFileSpecialistRepository {
    store: JsonCollectionStore<Specialist>,
}

impl JsonFileSpecialistRepository {
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        Ok(Self {
            store: JsonCollectionStore::open(data_dir.as_ref().join(SPECIALISTS_FILE)).await?,
        })
    }
}

#[async_trait]
impl SpecialistRepository for JsonFileSpecialistRepository {
    async fn save(&self, specialist: &Specialist) -> Result<(), RepositoryError> {
        self.store.upsert(specialist.id.0.clone(), specialist.clone()).await
    }

    async fn find_by_id(&self, id: &SpecialistId) -> Result<Option<Specialist>, RepositoryError> {
        Ok(self.store.get(id.as_str()))
    }

    async fn list_all(&self) -> Result<Vec<Specialist>, RepositoryError> {
        let mut all = self.store.values();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }
}

pub struct JsonFileApproachRepository {
    store: JsonCollectionStore<Approach>,
}

impl JsonFileApproachRepository {
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        Ok(Self {
            store: JsonCollectionStore::open(data_dir.as_ref().join(APPROACHES_FILE)).await?,
        })
    }
}

#[async_trait]
impl ApproachRepository for JsonFileApproachRepository {
    async fn save(&self, approach: &Approach) -> Result<(), RepositoryError> {
        self.store.upsert(approach.id.0.clone(), approach.clone()).await
    }

    async fn find_by_id(&self, id: &ApproachId) -> Result<Option<Approach>, RepositoryError> {
        Ok(self.store.get(id.as_str()))
    }

    async fn list_all(&self) -> Result<Vec<Approach>, RepositoryError> {
        let mut all = self.store.values();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }
}

pub struct JsonFileSignalRepository {
    store: JsonCollectionStore<Signal>,
}

impl JsonFileSignalRepository {
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        Ok(Self {
            store: JsonCollectionStore::open(data_dir.as_ref().join(SIGNALS_FILE)).await?,
        })
    }
}

#[async_trait]
impl SignalRepository for JsonFileSignalRepository {
    async fn save(&self, signal: &Signal) -> Result<(), RepositoryError> {
        self.store.upsert(signal.key.storage_key(), signal.clone()).await
    }

    async fn remove(&self, key: &SignalKey) -> Result<(), RepositoryError> {
        self.store.remove(&key.storage_key()).await
    }

    async fn list_all(&self) -> Result<Vec<Signal>, RepositoryError> {
        Ok(self.store.values())
    }
}
