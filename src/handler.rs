//! Per-type sync handlers.
//!
//! Each job type registers one handler; the run loop dispatches through the
//! registry table so new types can be added without touching the executor.

use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;

use crate::error::SyncError;
use crate::sync_item::{SyncItem, SyncType};

/// One remote fetch/push operation for a single job type.
///
/// Handlers own the actual backend interaction and translate their domain
/// failures into the scheduler's [`SyncError`] taxonomy. The scheduler has
/// no knowledge of handler internals.
#[async_trait]
pub trait SyncHandler: Send + Sync {
    async fn execute(&self, item: &SyncItem) -> Result<(), SyncError>;
}

/// Strategy table mapping job types to handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<SyncType, Arc<dyn SyncHandler>>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the handler for a job type.
    pub fn register(&mut self, kind: SyncType, handler: Arc<dyn SyncHandler>) {
        self.handlers.insert(kind, handler);
    }

    #[must_use]
    pub fn get(&self, kind: SyncType) -> Option<Arc<dyn SyncHandler>> {
        self.handlers.get(&kind).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
