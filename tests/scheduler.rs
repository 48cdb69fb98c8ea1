//! End-to-end scheduler tests.
//!
//! Everything runs against in-process fakes (`MemoryStore`, `UnmanagedHost`,
//! watch channels owned by the test), so no external services are needed and
//! no test is `#[ignore]`d.
//!
//! # Test Organization
//! - `happy_*`     - Normal operation: dispatch order, dependencies, persistence
//! - `retry_*`     - Failure classification and retry exhaustion
//! - `gating_*`    - Network / power / schedule admission rules
//! - `budget_*`    - Wall-clock budget adherence
//! - `lifecycle_*` - Start/stop, single-run invariant, host interaction

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use sync_scheduler::{
    BackgroundHost, MemoryStore, NetworkStatus, StopReason, SyncConfiguration, SyncError, SyncHandler,
    SyncItem, SyncPriority, SyncScheduler, SyncStore, SyncType, UnmanagedHost, epoch_ms,
};

// =============================================================================
// Harness
// =============================================================================

struct Harness {
    scheduler: SyncScheduler,
    store: Arc<MemoryStore>,
    host: Arc<UnmanagedHost>,
    net_tx: Arc<watch::Sender<NetworkStatus>>,
    _pwr_tx: watch::Sender<bool>,
}

fn harness_with(config: SyncConfiguration, network: NetworkStatus) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let host = Arc::new(UnmanagedHost::new());
    let (net_tx, net_rx) = watch::channel(network);
    let (pwr_tx, pwr_rx) = watch::channel(false);

    let scheduler = SyncScheduler::new(config, store.clone(), host.clone(), net_rx, pwr_rx);
    Harness {
        scheduler,
        store,
        host,
        net_tx: Arc::new(net_tx),
        _pwr_tx: pwr_tx,
    }
}

fn harness(config: SyncConfiguration) -> Harness {
    harness_with(config, NetworkStatus::online())
}

/// Runs only when the test drives them explicitly, and retries become
/// eligible again almost immediately.
fn manual_config() -> SyncConfiguration {
    SyncConfiguration {
        background_sync_enabled: false,
        retry_delay_ms: 1,
        ..Default::default()
    }
}

/// Wait for `predicate` to hold, polling the scheduler. Panics after 5s.
async fn wait_for(what: &str, mut predicate: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !predicate() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

// =============================================================================
// Fake Handlers
// =============================================================================

/// Records dispatched item ids in order and succeeds.
#[derive(Default)]
struct RecordingHandler {
    calls: Mutex<Vec<String>>,
}

impl RecordingHandler {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn attempts_for(&self, id: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == id).count()
    }
}

#[async_trait]
impl SyncHandler for RecordingHandler {
    async fn execute(&self, item: &SyncItem) -> Result<(), SyncError> {
        self.calls.lock().push(item.id.clone());
        Ok(())
    }
}

/// Records attempts and always fails with a server error.
#[derive(Default)]
struct FailingHandler {
    calls: Mutex<Vec<String>>,
}

impl FailingHandler {
    fn attempts_for(&self, id: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == id).count()
    }

    fn attempts(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl SyncHandler for FailingHandler {
    async fn execute(&self, item: &SyncItem) -> Result<(), SyncError> {
        self.calls.lock().push(item.id.clone());
        Err(SyncError::Server { code: 500 })
    }
}

/// Sleeps for a fixed time, then succeeds. Used to burn run budget.
struct SleepingHandler {
    delay: Duration,
}

#[async_trait]
impl SyncHandler for SleepingHandler {
    async fn execute(&self, _item: &SyncItem) -> Result<(), SyncError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// Succeeds, but drops the network mid-run (e.g. the user walks out of
/// wifi range while a sync is in progress).
struct NetworkDroppingHandler {
    net_tx: Arc<watch::Sender<NetworkStatus>>,
}

#[async_trait]
impl SyncHandler for NetworkDroppingHandler {
    async fn execute(&self, _item: &SyncItem) -> Result<(), SyncError> {
        let _ = self.net_tx.send(NetworkStatus::offline());
        Ok(())
    }
}

/// Revokes its own keep-alive grant and then hangs, as if the OS reclaimed
/// background time during a slow request.
struct RevokingHandler {
    host: Arc<UnmanagedHost>,
}

#[async_trait]
impl SyncHandler for RevokingHandler {
    async fn execute(&self, _item: &SyncItem) -> Result<(), SyncError> {
        self.host.revoke_keep_alive();
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }
}

/// Drops the keep-alive sender outright (channel close, no explicit false),
/// as a host tearing down its grant bookkeeping would.
struct GrantDroppingHandler {
    host: Arc<UnmanagedHost>,
}

#[async_trait]
impl SyncHandler for GrantDroppingHandler {
    async fn execute(&self, _item: &SyncItem) -> Result<(), SyncError> {
        self.host.end_run();
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }
}

// =============================================================================
// Happy Path
// =============================================================================

#[tokio::test]
async fn happy_schedule_triggers_implicit_run() {
    // Default config: background sync enabled, so schedule() kicks off a run
    let h = harness(SyncConfiguration::default());
    let handler = Arc::new(RecordingHandler::default());
    h.scheduler.register_handler(SyncType::Favorites, handler.clone());

    h.scheduler
        .schedule(SyncItem::new("favorites.refresh", SyncType::Favorites))
        .await;

    let scheduler = h.scheduler.clone();
    wait_for("the scheduled item to complete", || {
        scheduler.statistics().successful_syncs == 1
    })
    .await;

    assert_eq!(handler.calls(), vec!["favorites.refresh"]);
    assert_eq!(h.scheduler.pending(), 0);
}

#[tokio::test]
async fn happy_dispatch_follows_priority_order() {
    let h = harness(manual_config());
    let handler = Arc::new(RecordingHandler::default());
    h.scheduler.register_handler(SyncType::Favorites, handler.clone());

    h.scheduler
        .schedule(SyncItem::new("low", SyncType::Favorites).with_priority(SyncPriority::Low))
        .await;
    h.scheduler
        .schedule(
            SyncItem::new("critical", SyncType::Favorites)
                .with_priority(SyncPriority::Critical),
        )
        .await;
    h.scheduler
        .schedule(SyncItem::new("normal", SyncType::Favorites))
        .await;

    let summary = h.scheduler.run_once().await;

    assert_eq!(summary.reason, StopReason::QueueDrained);
    assert_eq!(summary.dispatched, 3);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(handler.calls(), vec!["critical", "normal", "low"]);
}

#[tokio::test]
async fn happy_dependent_items_both_complete() {
    let h = harness(manual_config());
    let handler = Arc::new(RecordingHandler::default());
    h.scheduler.register_handler(SyncType::Favorites, handler.clone());
    h.scheduler.register_handler(SyncType::UserSettings, handler.clone());

    h.scheduler
        .schedule(SyncItem::new("favorites", SyncType::Favorites).with_dependency("settings"))
        .await;
    h.scheduler
        .schedule(SyncItem::new("settings", SyncType::UserSettings))
        .await;

    let summary = h.scheduler.run_once().await;

    assert_eq!(summary.reason, StopReason::QueueDrained);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(handler.attempts_for("favorites"), 1);
    assert_eq!(handler.attempts_for("settings"), 1);
    assert_eq!(h.scheduler.pending(), 0);
}

#[tokio::test]
async fn happy_statistics_are_written_through() {
    let h = harness(manual_config());
    h.scheduler
        .register_handler(SyncType::Streams, Arc::new(RecordingHandler::default()));
    h.scheduler.schedule(SyncItem::new("streams", SyncType::Streams)).await;

    h.scheduler.run_once().await;

    // The store sees the same numbers the facade reports
    let persisted = h.store.load_statistics().await.unwrap();
    assert_eq!(persisted.total_syncs, 1);
    assert_eq!(persisted.successful_syncs, 1);
    assert_eq!(persisted.syncs_by_type.get(&SyncType::Streams), Some(&1));
    assert!(persisted.last_sync_time.is_some());
}

#[tokio::test]
async fn happy_restored_queue_executes() {
    let h = harness(manual_config());
    h.store
        .save_queue(&[SyncItem::new("carried-over", SyncType::Subscriptions)])
        .await
        .unwrap();
    let handler = Arc::new(RecordingHandler::default());
    h.scheduler.register_handler(SyncType::Subscriptions, handler.clone());

    h.scheduler.restore().await.unwrap();
    let summary = h.scheduler.run_once().await;

    assert_eq!(summary.succeeded, 1);
    assert_eq!(handler.calls(), vec!["carried-over"]);
}

// =============================================================================
// Retry
// =============================================================================

#[tokio::test]
async fn retry_exhaustion_is_terminal() {
    let mut config = manual_config();
    config.max_retries = 2;
    let h = harness(config);
    let handler = Arc::new(FailingHandler::default());
    h.scheduler.register_handler(SyncType::Notifications, handler.clone());
    let mut terminal_rx = h.scheduler.terminal_failures();

    h.scheduler
        .schedule(SyncItem::new("push-token", SyncType::Notifications))
        .await;
    let summary = h.scheduler.run_once().await;

    // Initial attempt + 2 retries, all within one run (1ms retry delay)
    assert_eq!(summary.reason, StopReason::QueueDrained);
    assert_eq!(summary.failed, 3);
    assert_eq!(handler.attempts(), 3);
    assert_eq!(h.scheduler.pending(), 0);

    let stats = h.scheduler.statistics();
    assert_eq!(stats.failed_syncs, 3);
    assert_eq!(stats.errors_by_kind.get("server_error"), Some(&3));

    let failure = terminal_rx.try_recv().unwrap();
    assert_eq!(failure.id, "push-token");
    assert_eq!(failure.error_kind, "server_error");
}

#[tokio::test]
async fn retry_cap_changes_apply_to_uncapped_items_only() {
    let mut config = manual_config();
    config.max_retries = 2;
    let h = harness(config);
    let handler = Arc::new(FailingHandler::default());
    h.scheduler.register_handler(SyncType::Analytics, handler.clone());

    h.scheduler
        .schedule(SyncItem::new("uncapped", SyncType::Analytics))
        .await;
    h.scheduler
        .schedule(SyncItem::new("pinned", SyncType::Analytics).with_max_retries(2))
        .await;

    // Dropping the default to zero before the run: items without an
    // explicit cap stop retrying, pinned items keep their own cap.
    let mut config = h.scheduler.configuration();
    config.max_retries = 0;
    h.scheduler.update_configuration(config);

    h.scheduler.run_once().await;

    assert_eq!(handler.attempts_for("uncapped"), 1);
    assert_eq!(handler.attempts_for("pinned"), 3);
    assert_eq!(h.scheduler.pending(), 0);
}

#[tokio::test]
async fn retry_unhandled_type_fails_terminally() {
    let h = harness(manual_config());
    // No handler registered for Thumbnails
    let mut terminal_rx = h.scheduler.terminal_failures();
    h.scheduler
        .schedule(SyncItem::new("thumb", SyncType::Thumbnails))
        .await;

    let summary = h.scheduler.run_once().await;

    // No retries: a type with no handler can never succeed
    assert_eq!(summary.failed, 1);
    assert_eq!(h.scheduler.pending(), 0);
    assert_eq!(terminal_rx.try_recv().unwrap().error_kind, "unknown");
}

// =============================================================================
// Gating
// =============================================================================

#[tokio::test]
async fn gating_offline_items_wait_for_network() {
    let h = harness_with(manual_config(), NetworkStatus::offline());
    let handler = Arc::new(RecordingHandler::default());
    h.scheduler.register_handler(SyncType::Favorites, handler.clone());
    h.scheduler.register_handler(SyncType::Analytics, handler.clone());

    h.scheduler
        .schedule(SyncItem::new("needs-net", SyncType::Favorites))
        .await;
    h.scheduler
        .schedule(
            SyncItem::new("local-only", SyncType::Analytics).with_requires_network(false),
        )
        .await;

    let summary = h.scheduler.run_once().await;
    assert_eq!(summary.dispatched, 1);
    assert_eq!(handler.calls(), vec!["local-only"]);
    assert!(h.scheduler.is_pending("needs-net"));

    // Network comes back; the waiting item now runs
    h.net_tx.send(NetworkStatus::online()).unwrap();
    let summary = h.scheduler.run_once().await;
    assert_eq!(summary.succeeded, 1);
    assert_eq!(h.scheduler.pending(), 0);
}

#[tokio::test]
async fn gating_network_loss_mid_run_parks_remaining_items() {
    let h = harness(manual_config());
    h.scheduler.register_handler(
        SyncType::Analytics,
        Arc::new(NetworkDroppingHandler { net_tx: h.net_tx.clone() }),
    );
    let handler = Arc::new(RecordingHandler::default());
    h.scheduler.register_handler(SyncType::Favorites, handler.clone());

    // The analytics item runs first and takes the network down with it
    h.scheduler
        .schedule(
            SyncItem::new("dropper", SyncType::Analytics)
                .with_priority(SyncPriority::Critical)
                .with_requires_network(false),
        )
        .await;
    h.scheduler
        .schedule(SyncItem::new("favorites", SyncType::Favorites))
        .await;

    let summary = h.scheduler.run_once().await;

    assert_eq!(summary.reason, StopReason::QueueDrained);
    assert_eq!(summary.dispatched, 1);
    assert!(handler.calls().is_empty());
    assert!(h.scheduler.is_pending("favorites"));
}

#[tokio::test]
async fn gating_future_items_wait_and_stale_items_purge() {
    let h = harness(manual_config());
    let handler = Arc::new(RecordingHandler::default());
    h.scheduler.register_handler(SyncType::Streams, handler.clone());

    let now = epoch_ms();
    h.scheduler
        .schedule(
            SyncItem::new("tomorrow", SyncType::Streams)
                .with_scheduled_at(now + 24 * 60 * 60 * 1000),
        )
        .await;
    h.scheduler
        .schedule(
            SyncItem::new("last-week", SyncType::Streams)
                .with_scheduled_at(now - 7 * 24 * 60 * 60 * 1000),
        )
        .await;

    let summary = h.scheduler.run_once().await;

    // The stale item is purged, the future one just waits
    assert_eq!(summary.dispatched, 0);
    assert!(h.scheduler.is_pending("tomorrow"));
    assert!(!h.scheduler.is_pending("last-week"));
}

// =============================================================================
// Budget
// =============================================================================

#[tokio::test]
async fn budget_exhaustion_stops_mid_queue() {
    let mut config = manual_config();
    config.max_sync_duration_ms = 200;
    let h = harness(config);
    h.scheduler.register_handler(
        SyncType::Favorites,
        Arc::new(SleepingHandler { delay: Duration::from_millis(150) }),
    );

    for i in 0..3 {
        h.scheduler
            .schedule(SyncItem::new(format!("slow.{i}"), SyncType::Favorites))
            .await;
    }
    let summary = h.scheduler.run_once().await;

    // One 150ms attempt plus the inter-item yield blows the 200ms budget
    assert_eq!(summary.reason, StopReason::BudgetExhausted);
    assert_eq!(summary.dispatched, 1);
    assert_eq!(h.scheduler.pending(), 2);
}

#[tokio::test]
async fn budget_skips_items_estimated_too_large() {
    let mut config = manual_config();
    config.max_sync_duration_ms = 500;
    let h = harness(config);
    h.scheduler
        .register_handler(SyncType::Thumbnails, Arc::new(RecordingHandler::default()));

    h.scheduler
        .schedule(
            SyncItem::new("bulk-thumbs", SyncType::Thumbnails)
                .with_requires_network(false)
                .with_estimated_duration_ms(10_000),
        )
        .await;

    let summary = h.scheduler.run_once().await;

    // Too big for the remaining budget: held for a future, roomier run
    assert_eq!(summary.reason, StopReason::QueueDrained);
    assert_eq!(summary.dispatched, 0);
    assert!(h.scheduler.is_pending("bulk-thumbs"));
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn lifecycle_stop_discards_inflight_outcome() {
    let h = harness(manual_config());
    h.scheduler.register_handler(
        SyncType::Favorites,
        Arc::new(SleepingHandler { delay: Duration::from_millis(300) }),
    );
    h.scheduler.schedule(SyncItem::new("a", SyncType::Favorites)).await;
    h.scheduler.schedule(SyncItem::new("b", SyncType::Favorites)).await;

    let scheduler = h.scheduler.clone();
    let run = tokio::spawn(async move { scheduler.run_once().await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.scheduler.stop();

    let summary = run.await.unwrap();
    assert_eq!(summary.reason, StopReason::Stopped);
    assert_eq!(summary.dispatched, 0);
    assert_eq!(h.scheduler.statistics().total_syncs, 0);
    assert!(h.scheduler.is_pending("b"));
}

#[tokio::test]
async fn lifecycle_concurrent_run_is_rejected() {
    let h = harness(manual_config());
    h.scheduler.register_handler(
        SyncType::Favorites,
        Arc::new(SleepingHandler { delay: Duration::from_millis(300) }),
    );
    h.scheduler.schedule(SyncItem::new("a", SyncType::Favorites)).await;

    let scheduler = h.scheduler.clone();
    let first = tokio::spawn(async move { scheduler.run_once().await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = h.scheduler.run_once().await;
    assert_eq!(second.reason, StopReason::AlreadyRunning);
    assert_eq!(second.dispatched, 0);

    let first = first.await.unwrap();
    assert_eq!(first.succeeded, 1);
}

#[tokio::test]
async fn lifecycle_keep_alive_revocation_abandons_attempt() {
    let h = harness(manual_config());
    h.scheduler.register_handler(
        SyncType::LiveStatus,
        Arc::new(RevokingHandler { host: h.host.clone() }),
    );
    h.scheduler.schedule(SyncItem::new("live", SyncType::LiveStatus)).await;

    let summary = h.scheduler.run_once().await;

    assert_eq!(summary.reason, StopReason::KeepAliveRevoked);
    assert_eq!(summary.failed, 1);
    // The abandoned attempt counts as expired time and is retried later
    assert_eq!(
        h.scheduler.statistics().errors_by_kind.get("time_expired"),
        Some(&1)
    );
    assert!(h.scheduler.is_pending("live"));
}

#[tokio::test]
async fn lifecycle_keep_alive_channel_close_halts_run() {
    let h = harness(manual_config());
    h.scheduler.register_handler(
        SyncType::LiveStatus,
        Arc::new(GrantDroppingHandler { host: h.host.clone() }),
    );
    let handler = Arc::new(RecordingHandler::default());
    h.scheduler.register_handler(SyncType::Favorites, handler.clone());

    h.scheduler
        .schedule(
            SyncItem::new("live", SyncType::LiveStatus).with_priority(SyncPriority::Critical),
        )
        .await;
    h.scheduler
        .schedule(SyncItem::new("untouched", SyncType::Favorites))
        .await;

    let summary = h.scheduler.run_once().await;

    // A closed grant halts the run just like an explicit revocation; the
    // remaining item is neither dispatched nor charged a retry
    assert_eq!(summary.reason, StopReason::KeepAliveRevoked);
    assert_eq!(summary.dispatched, 1);
    assert_eq!(summary.failed, 1);
    assert!(handler.calls().is_empty());
    let untouched = h.scheduler.statistics();
    assert_eq!(untouched.syncs_by_type.get(&SyncType::Favorites), None);
    assert!(h.scheduler.is_pending("untouched"));
}

#[tokio::test]
async fn lifecycle_run_registers_next_wakeup() {
    let h = harness(manual_config());
    assert!(h.host.pending_wakeup().is_none());

    h.scheduler.run_once().await;

    let interval = h.scheduler.configuration().sync_interval();
    assert_eq!(h.host.pending_wakeup(), Some(interval));
}
