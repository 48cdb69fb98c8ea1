//! # Sync Scheduler
//!
//! A priority-ordered background sync scheduler for opportunistic execution
//! under a hard wall-clock budget.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     SyncScheduler (facade)                  │
//! │  • schedule / cancel / force_run / update_configuration    │
//! │  • start() triggered by the host's background callback     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Run loop (budgeted)                   │
//! │  • Pulls next eligible item from the SyncQueue             │
//! │  • Gated on network / power / dependencies / schedule      │
//! │  • Dispatches to the registered per-type SyncHandler       │
//! │  • Halts when the budget or keep-alive expires             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              RetryPolicy + SyncStatistics + SyncStore       │
//! │  • Failed items re-enqueued until retries are exhausted    │
//! │  • Queue and statistics persisted write-through            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::watch;
//! use sync_scheduler::{
//!     SyncScheduler, SyncConfiguration, SyncItem, SyncType,
//!     MemoryStore, UnmanagedHost, NetworkStatus,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let (_net_tx, net_rx) = watch::channel(NetworkStatus::online());
//!     let (_pwr_tx, pwr_rx) = watch::channel(false);
//!
//!     let scheduler = SyncScheduler::new(
//!         SyncConfiguration::default(),
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(UnmanagedHost::new()),
//!         net_rx,
//!         pwr_rx,
//!     );
//!
//!     // scheduler.register_handler(SyncType::Favorites, Arc::new(MyFavoritesHandler));
//!     scheduler.restore().await.expect("failed to load persisted queue");
//!
//!     let item = SyncItem::new("favorites.refresh", SyncType::Favorites);
//!     scheduler.schedule(item).await;
//!
//!     // A run has been kicked off implicitly; the host's periodic wake-up
//!     // callback would otherwise call scheduler.start().
//! }
//! ```
//!
//! ## Modules
//!
//! - [`scheduler`]: The [`SyncScheduler`] facade and budgeted run loop
//! - [`queue`]: Priority-ordered pending queue with upsert-by-id and expiry
//! - [`gate`]: Pure admission predicate (network, power, dependencies)
//! - [`retry`]: Fixed-interval retry policy with per-item bounds
//! - [`stats`]: Running statistics over completed attempts
//! - [`storage`]: Durable snapshots of queue and statistics
//! - [`handler`]: Per-type handler trait and registry
//! - [`host`]: Injected host collaborators (keep-alive, wake-up, network, power)

pub mod config;
pub mod sync_item;
pub mod queue;
pub mod gate;
pub mod error;
pub mod retry;
pub mod stats;
pub mod storage;
pub mod handler;
pub mod host;
pub mod scheduler;
pub mod metrics;

pub use config::SyncConfiguration;
pub use sync_item::{SyncItem, SyncType, SyncPriority, epoch_ms};
pub use queue::SyncQueue;
pub use error::{SyncError, StoreError};
pub use retry::RetryPolicy;
pub use stats::SyncStatistics;
pub use storage::traits::SyncStore;
pub use storage::memory::MemoryStore;
pub use storage::json_file::JsonFileStore;
pub use handler::{SyncHandler, HandlerRegistry};
pub use host::{BackgroundHost, UnmanagedHost, NetworkStatus};
pub use scheduler::{SyncScheduler, SchedulerState, RunSummary, StopReason, TerminalFailure};
