// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Keyed JSON Collection Store
//!
//! One JSON object per collection, keyed by entity id, cached in memory.
//!
//! **Write discipline:**
//! - Every write serializes the next state, writes it to a sibling temp file,
//!   fsyncs and renames it over the collection file.
//! - The in-memory cache is swapped only after the rename succeeded, so a
//!   failed write leaves both disk and cache at the previous state.
//!
//! **Load discipline:**
//! - A missing file is an empty collection.
//! - A corrupt file is moved aside to `<name>.corrupt` and replaced by an
//!   empty collection; startup never fails on bad state.

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::repository::RepositoryError;

pub struct JsonCollectionStore<T> {
    path: PathBuf,
    cache: RwLock<BTreeMap<String, T>>,
    /// Serializes writers so snapshots are never interleaved
    write_lock: Mutex<()>,
}

impl<T> JsonCollectionStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    /// Open (or create) the collection stored at `path`
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                RepositoryError::Io(format!("Failed to create directory {}: {}", parent.display(), e))
            })?;
        }

        let entries = Self::load(&path).await;
        debug!(path = %path.display(), entries = entries.len(), "Opened JSON collection");

        Ok(Self {
            path,
            cache: RwLock::new(entries),
            write_lock: Mutex::new(()),
        })
    }

    async fn load(path: &Path) -> BTreeMap<String, T> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                warn!("Failed to read {}: {}; starting empty", path.display(), e);
                return BTreeMap::new();
            }
        };

        match serde_json::from_slice::<BTreeMap<String, T>>(&bytes) {
            Ok(entries) => entries,
            Err(e) => {
                let quarantine = path.with_extension("corrupt");
                warn!(
                    "Corrupt collection {}: {}; moving it to {} and starting empty",
                    path.display(),
                    e,
                    quarantine.display()
                );
                if let Err(e) = tokio::fs::rename(path, &quarantine).await {
                    warn!("Failed to quarantine {}: {}", path.display(), e);
                }
                BTreeMap::new()
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<T> {
        self.cache.read().get(key).cloned()
    }

    /// All values in key order
    pub fn values(&self) -> Vec<T> {
        self.cache.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    pub async fn upsert(&self, key: String, value: T) -> Result<(), RepositoryError> {
        let _guard = self.write_lock.lock().await;
        let mut next = self.cache.read().clone();
        next.insert(key, value);
        self.persist(&next).await?;
        *self.cache.write() = next;
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<(), RepositoryError> {
        let _guard = self.write_lock.lock().await;
        if !self.cache.read().contains_key(key) {
            return Ok(());
        }
        let mut next = self.cache.read().clone();
        next.remove(key);
        self.persist(&next).await?;
        *self.cache.write() = next;
        Ok(())
    }

    async fn persist(&self, entries: &BTreeMap<String, T>) -> Result<(), RepositoryError> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");

        let mut file = tokio::fs::File::create(&tmp).await.map_err(|e| {
            RepositoryError::Io(format!("Failed to create {}: {}", tmp.display(), e))
        })?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            RepositoryError::Io(format!("Failed to replace {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");

        let store: JsonCollectionStore<u32> = JsonCollectionStore::open(&path).await.unwrap();
        store.upsert("a".into(), 1).await.unwrap();
        store.upsert("b".into(), 2).await.unwrap();
        store.remove("a").await.unwrap();

        let reopened: JsonCollectionStore<u32> = JsonCollectionStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("b"), Some(2));
        assert_eq!(reopened.get("a"), None);
        assert_eq!(reopened.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty_and_is_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        std::fs::write(&path, b"{not json").unwrap();

        let store: JsonCollectionStore<u32> = JsonCollectionStore::open(&path).await.unwrap();
        assert!(store.is_empty());
        assert!(dir.path().join("items.corrupt").exists());

        store.upsert("a".into(), 7).await.unwrap();
        assert_eq!(store.get("a"), Some(7));
    }

    #[tokio::test]
    async fn test_failed_write_keeps_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        let store: JsonCollectionStore<u32> = JsonCollectionStore::open(&path).await.unwrap();
        store.upsert("a".into(), 1).await.unwrap();

        // A directory squatting on the temp path makes the next write fail.
        std::fs::create_dir(dir.path().join("items.json.tmp")).unwrap();
        assert!(store.upsert("b".into(), 2).await.is_err());
        assert_eq!(store.get("b"), None);
        assert_eq!(store.get("a"), Some(1));
    }
}
