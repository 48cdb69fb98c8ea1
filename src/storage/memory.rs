use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::StoreError;
use crate::stats::SyncStatistics;
use crate::sync_item::SyncItem;
use super::traits::SyncStore;

/// In-memory store for tests and ephemeral (no-durability) use.
#[derive(Default)]
pub struct MemoryStore {
    queue: Mutex<Vec<SyncItem>>,
    stats: Mutex<SyncStatistics>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items in the persisted queue snapshot.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.lock().len()
    }
}

#[async_trait]
impl SyncStore for MemoryStore {
    async fn save_queue(&self, items: &[SyncItem]) -> Result<(), StoreError> {
        *self.queue.lock() = items.to_vec();
        Ok(())
    }

    async fn load_queue(&self) -> Result<Vec<SyncItem>, StoreError> {
        Ok(self.queue.lock().clone())
    }

    async fn save_statistics(&self, stats: &SyncStatistics) -> Result<(), StoreError> {
        *self.stats.lock() = stats.clone();
        Ok(())
    }

    async fn load_statistics(&self) -> Result<SyncStatistics, StoreError> {
        Ok(self.stats.lock().clone())
    }
}
