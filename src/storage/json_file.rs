// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! JSON-file persistence for the queue and statistics.
//!
//! Two files under a data directory, written atomically (temp file +
//! rename) so a crash mid-write leaves the previous snapshot intact.
//! Missing files read back as empty state, which is what a first launch
//! looks like.

use std::path::{Path, PathBuf};
use async_trait::async_trait;

use crate::error::StoreError;
use crate::stats::SyncStatistics;
use crate::sync_item::SyncItem;
use super::traits::SyncStore;

const QUEUE_FILE: &str = "sync_queue.json";
const STATS_FILE: &str = "sync_statistics.json";

pub struct JsonFileStore {
    queue_path: PathBuf,
    stats_path: PathBuf,
}

impl JsonFileStore {
    /// Store snapshots under `dir`. The directory is created on first save.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            queue_path: dir.join(QUEUE_FILE),
            stats_path: dir.join(STATS_FILE),
        }
    }

    async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn read_or_default<T: Default + serde::de::DeserializeOwned>(
        path: &Path,
    ) -> Result<T, StoreError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl SyncStore for JsonFileStore {
    async fn save_queue(&self, items: &[SyncItem]) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(items)?;
        Self::write_atomic(&self.queue_path, &bytes).await
    }

    async fn load_queue(&self) -> Result<Vec<SyncItem>, StoreError> {
        Self::read_or_default(&self.queue_path).await
    }

    async fn save_statistics(&self, stats: &SyncStatistics) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(stats)?;
        Self::write_atomic(&self.stats_path, &bytes).await
    }

    async fn load_statistics(&self) -> Result<SyncStatistics, StoreError> {
        Self::read_or_default(&self.stats_path).await
    }
}
