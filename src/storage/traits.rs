use async_trait::async_trait;

use crate::error::StoreError;
use crate::stats::SyncStatistics;
use crate::sync_item::SyncItem;

/// Persistence collaborator for the scheduler.
///
/// The queue is saved write-through as a full snapshot on every mutation
/// (queue sizes are small, tens of items). Load failures at startup and
/// save failures at runtime are logged by the caller and never abort
/// scheduling.
#[async_trait]
pub trait SyncStore: Send + Sync {
    async fn save_queue(&self, items: &[SyncItem]) -> Result<(), StoreError>;
    async fn load_queue(&self) -> Result<Vec<SyncItem>, StoreError>;
    async fn save_statistics(&self, stats: &SyncStatistics) -> Result<(), StoreError>;
    async fn load_statistics(&self) -> Result<SyncStatistics, StoreError>;
}
