// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Scheduler facade.
//!
//! [`SyncScheduler`] is the public entry point used by the application and
//! by the host's background-execution callback. All shared state (queue,
//! active set, statistics) is owned here and mutated only through the
//! facade and the run loop; handlers never touch it directly.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──start()/schedule()──▶ Running ──budget/keep-alive/drained──▶ Idle
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::watch;
//! use sync_scheduler::{
//!     SyncScheduler, SyncConfiguration, SyncItem, SyncType,
//!     MemoryStore, UnmanagedHost, NetworkStatus,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let (_net, net_rx) = watch::channel(NetworkStatus::online());
//! let (_pwr, pwr_rx) = watch::channel(false);
//! let scheduler = SyncScheduler::new(
//!     SyncConfiguration::default(),
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(UnmanagedHost::new()),
//!     net_rx,
//!     pwr_rx,
//! );
//!
//! scheduler.schedule(SyncItem::new("favorites.refresh", SyncType::Favorites)).await;
//! # }
//! ```

mod types;
mod lifecycle;

pub use types::{RunSummary, SchedulerState, StopReason, TerminalFailure};

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::config::SyncConfiguration;
use crate::handler::{HandlerRegistry, SyncHandler};
use crate::host::{BackgroundHost, NetworkStatus};
use crate::queue::SyncQueue;
use crate::retry::RetryPolicy;
use crate::stats::SyncStatistics;
use crate::storage::traits::SyncStore;
use crate::sync_item::{SyncItem, SyncPriority, SyncType};

/// Public entry point to the background sync scheduler.
///
/// Cheap to clone; all clones share the same state. Public methods may be
/// called concurrently from any task; mutations funnel through one
/// serialization point per piece of state.
#[derive(Clone)]
pub struct SyncScheduler {
    pub(crate) inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) config: RwLock<SyncConfiguration>,
    pub(crate) queue: Mutex<SyncQueue>,
    /// Ids currently dispatched to a handler and not yet completed.
    pub(crate) active: DashMap<String, ()>,
    pub(crate) stats: Mutex<SyncStatistics>,
    pub(crate) handlers: RwLock<HandlerRegistry>,
    pub(crate) retry_policy: RetryPolicy,
    pub(crate) store: Arc<dyn SyncStore>,
    pub(crate) host: Arc<dyn BackgroundHost>,
    pub(crate) network_rx: watch::Receiver<NetworkStatus>,
    pub(crate) power_rx: watch::Receiver<bool>,
    pub(crate) state_tx: watch::Sender<SchedulerState>,
    pub(crate) state_rx: watch::Receiver<SchedulerState>,
    pub(crate) terminal_tx: broadcast::Sender<TerminalFailure>,
    /// Guards the single-run invariant; `state` is only for observers.
    pub(crate) running: AtomicBool,
    pub(crate) stop_requested: AtomicBool,
}

impl SyncScheduler {
    /// Create a scheduler with injected collaborators.
    ///
    /// `network_rx` and `power_rx` are push channels owned by the host's
    /// status monitors; the scheduler never polls them.
    pub fn new(
        config: SyncConfiguration,
        store: Arc<dyn SyncStore>,
        host: Arc<dyn BackgroundHost>,
        network_rx: watch::Receiver<NetworkStatus>,
        power_rx: watch::Receiver<bool>,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(SchedulerState::Idle);
        let (terminal_tx, _) = broadcast::channel(32);

        Self {
            inner: Arc::new(Inner {
                config: RwLock::new(config),
                queue: Mutex::new(SyncQueue::new()),
                active: DashMap::new(),
                stats: Mutex::new(SyncStatistics::default()),
                handlers: RwLock::new(HandlerRegistry::new()),
                retry_policy: RetryPolicy,
                store,
                host,
                network_rx,
                power_rx,
                state_tx,
                state_rx,
                terminal_tx,
                running: AtomicBool::new(false),
                stop_requested: AtomicBool::new(false),
            }),
        }
    }

    /// Register (or replace) the handler for a job type.
    pub fn register_handler(&self, kind: SyncType, handler: Arc<dyn SyncHandler>) {
        self.inner.handlers.write().register(kind, handler);
    }

    /// Load the persisted queue and statistics. Call once at process start,
    /// before the first run.
    pub async fn restore(&self) -> Result<(), crate::error::StoreError> {
        let items = self.inner.store.load_queue().await?;
        let stats = self.inner.store.load_statistics().await?;
        info!(
            pending = items.len(),
            total_syncs = stats.total_syncs,
            "restored scheduler state"
        );
        *self.inner.queue.lock() = SyncQueue::from_snapshot(items);
        *self.inner.stats.lock() = stats;
        Ok(())
    }

    /// Enqueue an item, replacing any pending item with the same id, and
    /// kick off a run if the scheduler is idle.
    ///
    /// Scheduling a type that is not in `enabled_types` is a silent no-op.
    pub async fn schedule(&self, item: SyncItem) {
        {
            let config = self.inner.config.read();
            if !config.enabled_types.contains(&item.kind) {
                debug!(id = %item.id, kind = %item.kind, "type disabled, item not enqueued");
                return;
            }
        }

        debug!(id = %item.id, kind = %item.kind, priority = ?item.priority, "item scheduled");
        self.inner.queue.lock().upsert(item);
        self.persist_queue().await;
        self.start();
    }

    /// Remove a pending item. Idempotent; does not preempt an item already
    /// dispatched to a handler.
    pub async fn cancel(&self, id: &str) {
        let removed = self.inner.queue.lock().cancel(id);
        if removed {
            debug!(id, "pending item cancelled");
            self.persist_queue().await;
        }
    }

    /// Hot-swap the configuration. An in-progress run finishes under the
    /// budget it started with; retry caps for items without an explicit cap
    /// follow the new default immediately.
    pub fn update_configuration(&self, config: SyncConfiguration) {
        info!(
            max_sync_duration_ms = config.max_sync_duration_ms,
            max_retries = config.max_retries,
            "configuration updated"
        );
        *self.inner.config.write() = config;
    }

    #[must_use]
    pub fn configuration(&self) -> SyncConfiguration {
        self.inner.config.read().clone()
    }

    /// Synthesize a high-priority, immediately-eligible item for `kind`
    /// (user-initiated "refresh now"). Repeated calls for the same type
    /// coalesce into one pending item.
    pub async fn force_run(&self, kind: SyncType) {
        let item = SyncItem::new(format!("manual.{kind}"), kind)
            .with_priority(SyncPriority::High);
        self.schedule(item).await;
    }

    /// Snapshot of the running statistics. Never blocks the executor.
    #[must_use]
    pub fn statistics(&self) -> SyncStatistics {
        self.inner.stats.lock().clone()
    }

    /// Number of pending items.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Whether an item with `id` is pending.
    #[must_use]
    pub fn is_pending(&self, id: &str) -> bool {
        self.inner.queue.lock().contains(id)
    }

    #[must_use]
    pub fn state(&self) -> SchedulerState {
        *self.inner.state_rx.borrow()
    }

    /// Watch state transitions (Idle ⇄ Running).
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<SchedulerState> {
        self.inner.state_rx.clone()
    }

    /// Subscribe to terminal failures (items that exhausted their retries).
    #[must_use]
    pub fn terminal_failures(&self) -> broadcast::Receiver<TerminalFailure> {
        self.inner.terminal_tx.subscribe()
    }

    /// Begin a background run on the current tokio runtime, unless one is
    /// already in flight or background sync is disabled. Returns whether a
    /// run was spawned.
    pub fn start(&self) -> bool {
        if self.inner.running.load(std::sync::atomic::Ordering::Acquire) {
            return false;
        }
        if !self.inner.config.read().background_sync_enabled {
            debug!("background sync disabled, not starting a run");
            return false;
        }
        let this = self.clone();
        tokio::spawn(async move {
            this.run_once().await;
        });
        true
    }

    /// Cooperatively stop the current run: no new dispatches; an attempt
    /// already in flight finishes and its outcome is discarded.
    pub fn stop(&self) {
        info!("stop requested");
        self.inner
            .stop_requested
            .store(true, std::sync::atomic::Ordering::Release);
    }

    pub(crate) async fn persist_queue(&self) {
        let snapshot = self.inner.queue.lock().snapshot();
        crate::metrics::set_queue_depth(snapshot.len());
        if let Err(e) = self.inner.store.save_queue(&snapshot).await {
            warn!(error = %e, "failed to persist queue snapshot");
            crate::metrics::record_store_error("save_queue");
        }
    }

    pub(crate) async fn persist_statistics(&self) {
        let stats = self.inner.stats.lock().clone();
        if let Err(e) = self.inner.store.save_statistics(&stats).await {
            warn!(error = %e, "failed to persist statistics");
            crate::metrics::record_store_error("save_statistics");
        }
    }
}
