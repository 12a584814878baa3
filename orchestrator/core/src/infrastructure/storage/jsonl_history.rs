// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Partitioned JSONL Execution Ledger
//!
//! Append-only file implementation of [`ExecutionHistoryRepository`] for
//! single-node deployments.
//!
//! **Layout:**
//! ```text
//! <root>/
//!   index.json                   totals, first/last timestamp, partition files
//!   2026-03/records_20260301.jsonl
//!   2026-03/records_20260302.jsonl
//! ```
//!
//! Each line is one serialized [`ExecutionRecord`]. A line is fsync'd before
//! `append` returns. `index.json` is a cache: when it is missing or corrupt
//! it is rebuilt by scanning the partitions.
//!
//! **Limitations:**
//! - Single writer per directory (no cross-process locking)
//! - Queries scan partition files; there is no secondary index

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::execution::{ExecutionRecord, HistoryQuery};
use crate::domain::repository::{ExecutionHistoryRepository, RepositoryError};

const INDEX_FILE: &str = "index.json";
const PARTITION_PREFIX: &str = "records_";
const PARTITION_SUFFIX: &str = ".jsonl";

/// Summary persisted next to the partitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryIndex {
    pub total_records: u64,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
    /// Partition files relative to the root, e.g. `2026-03/records_20260301.jsonl`.
    pub partitions: BTreeSet<String>,
}

impl HistoryIndex {
    fn observe(&mut self, record: &ExecutionRecord, partition: &str) {
        self.total_records += 1;
        self.first_timestamp = Some(match self.first_timestamp {
            Some(first) => first.min(record.timestamp),
            None => record.timestamp,
        });
        self.last_timestamp = Some(match self.last_timestamp {
            Some(last) => last.max(record.timestamp),
            None => record.timestamp,
        });
        self.partitions.insert(partition.to_string());
    }
}

pub struct JsonlExecutionHistory {
    root: PathBuf,
    /// Also serializes appends
    index: Mutex<HistoryIndex>,
}

impl JsonlExecutionHistory {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            RepositoryError::Io(format!("Failed to create history directory {}: {}", root.display(), e))
        })?;

        let index = match Self::load_index(&root).await {
            Some(index) => index,
            None => {
                let rebuilt = Self::rebuild_index(&root).await?;
                info!(
                    root = %root.display(),
                    total_records = rebuilt.total_records,
                    "Rebuilt execution history index"
                );
                rebuilt
            }
        };

        debug!(root = %root.display(), total_records = index.total_records, "Opened execution history");
        Ok(Self {
            root,
            index: Mutex::new(index),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn index(&self) -> HistoryIndex {
        self.index.lock().await.clone()
    }

    /// `YYYY-MM/records_YYYYMMDD.jsonl` for the record's timestamp.
    pub fn partition_for(timestamp: DateTime<Utc>) -> String {
        format!(
            "{}/{}{}{}",
            timestamp.format("%Y-%m"),
            PARTITION_PREFIX,
            timestamp.format("%Y%m%d"),
            PARTITION_SUFFIX
        )
    }

    async fn load_index(root: &Path) -> Option<HistoryIndex> {
        let path = root.join(INDEX_FILE);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read {}: {}; rebuilding", path.display(), e);
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(index) => Some(index),
            Err(e) => {
                warn!("Corrupt history index {}: {}; rebuilding", path.display(), e);
                None
            }
        }
    }

    async fn rebuild_index(root: &Path) -> Result<HistoryIndex, RepositoryError> {
        let mut index = HistoryIndex::default();
        for partition in Self::list_partitions(root).await? {
            for record in Self::read_partition(root, &partition).await? {
                index.observe(&record, &partition);
            }
            index.partitions.insert(partition);
        }
        Ok(index)
    }

    /// Partition files found on disk, oldest first.
    async fn list_partitions(root: &Path) -> Result<Vec<String>, RepositoryError> {
        let mut partitions = Vec::new();
        let mut months = tokio::fs::read_dir(root).await?;
        while let Some(month) = months.next_entry().await? {
            if !month.file_type().await?.is_dir() {
                continue;
            }
            let month_name = month.file_name().to_string_lossy().into_owned();
            let mut files = tokio::fs::read_dir(month.path()).await?;
            while let Some(file) = files.next_entry().await? {
                let name = file.file_name().to_string_lossy().into_owned();
                if name.starts_with(PARTITION_PREFIX) && name.ends_with(PARTITION_SUFFIX) {
                    partitions.push(format!("{}/{}", month_name, name));
                }
            }
        }
        partitions.sort();
        Ok(partitions)
    }

    /// Records of one partition in append order; corrupt lines are skipped.
    async fn read_partition(root: &Path, partition: &str) -> Result<Vec<ExecutionRecord>, RepositoryError> {
        let path = root.join(partition);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ExecutionRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    partition = %partition,
                    line = line_no + 1,
                    "Skipping corrupt history line: {}",
                    e
                ),
            }
        }
        Ok(records)
    }

    async fn write_index(&self, index: &HistoryIndex) -> Result<(), RepositoryError> {
        let path = self.root.join(INDEX_FILE);
        let tmp = self.root.join(format!("{}.tmp", INDEX_FILE));
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(index)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl ExecutionHistoryRepository for JsonlExecutionHistory {
    async fn append(&self, record: &ExecutionRecord) -> Result<(), RepositoryError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let partition = Self::partition_for(record.timestamp);
        let path = self.root.join(&partition);

        let mut index = self.index.lock().await;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| RepositoryError::Io(format!("Failed to open {}: {}", path.display(), e)))?;
        file.write_all(&line).await?;
        file.sync_all().await?;

        index.observe(record, &partition);

        // The line is already durable; a stale index is rebuilt on the next open.
        if let Err(e) = self.write_index(&index).await {
            warn!("Failed to update history index: {}", e);
            let _ = tokio::fs::remove_file(self.root.join(INDEX_FILE)).await;
        }

        debug!(task_id = %record.task_id, partition = %partition, "Appended execution record");
        Ok(())
    }

    async fn query_recent(&self, query: &HistoryQuery) -> Result<Vec<ExecutionRecord>, RepositoryError> {
        let mut results = Vec::with_capacity(query.limit.min(1024));
        if query.limit == 0 {
            return Ok(results);
        }

        let partitions = Self::list_partitions(&self.root).await?;
        for partition in partitions.iter().rev() {
            let records = Self::read_partition(&self.root, partition).await?;
            for record in records.into_iter().rev() {
                if query.matches(&record) {
                    results.push(record);
                    if results.len() >= query.limit {
                        return Ok(results);
                    }
                }
            }
        }
        Ok(results)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.index.lock().await.total_records)
    }
}
