//! The budgeted run loop.
//!
//! One pass: repeatedly pull the next eligible item, dispatch it to its
//! handler, apply success/failure bookkeeping, and yield briefly, until the
//! queue drains, the wall-clock budget elapses, the host revokes the
//! keep-alive, or `stop()` is requested. Handler errors never escape the
//! loop; they are classified and handed to the retry policy.

use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::gate;
use crate::retry::RetryDecision;
use crate::sync_item::epoch_ms;

use super::types::{RunSummary, SchedulerState, StopReason, TerminalFailure};
use super::SyncScheduler;

/// Pause between items so a run does not saturate the host.
const ITEM_YIELD: Duration = Duration::from_millis(100);

impl SyncScheduler {
    /// Execute one full run to completion and return its summary.
    ///
    /// The host's background callback awaits this directly; [`start()`]
    /// (and implicit kicks from `schedule`) spawn it instead. At most one
    /// run executes at a time; a second caller gets
    /// [`StopReason::AlreadyRunning`] back immediately.
    ///
    /// [`start()`]: SyncScheduler::start
    #[tracing::instrument(skip(self))]
    pub async fn run_once(&self) -> RunSummary {
        if self
            .inner
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return RunSummary {
                dispatched: 0,
                succeeded: 0,
                failed: 0,
                elapsed: Duration::ZERO,
                reason: StopReason::AlreadyRunning,
            };
        }
        self.inner.stop_requested.store(false, Ordering::Release);
        let _ = self.inner.state_tx.send(SchedulerState::Running);

        // The run executes under the configuration captured at start;
        // update_configuration applies from the next run.
        let cfg = self.inner.config.read().clone();
        let budget = cfg.max_sync_duration();
        let mut keep_alive = self.inner.host.begin_run();
        let started = Instant::now();
        info!(budget_ms = cfg.max_sync_duration_ms, pending = self.pending(), "sync run started");

        let mut dispatched = 0usize;
        let mut succeeded = 0usize;
        let mut failed = 0usize;

        let reason = loop {
            if self.inner.stop_requested.load(Ordering::Acquire) {
                break StopReason::Stopped;
            }
            if started.elapsed() >= budget {
                break StopReason::BudgetExhausted;
            }
            // A dropped sender leaves the last value in the watch, so a
            // closed channel must be checked for separately.
            if !*keep_alive.borrow() || keep_alive.has_changed().is_err() {
                break StopReason::KeepAliveRevoked;
            }
            if dispatched >= cfg.batch_size {
                break StopReason::BatchLimit;
            }

            let now = epoch_ms();
            let network = *self.inner.network_rx.borrow();
            let low_power = *self.inner.power_rx.borrow();
            let active: HashSet<String> =
                self.inner.active.iter().map(|e| e.key().clone()).collect();
            let remaining = budget.saturating_sub(started.elapsed());

            let (purged, item) = {
                let mut queue = self.inner.queue.lock();
                queue.next_eligible(now, |it| {
                    Duration::from_millis(it.estimated_duration_ms) <= remaining
                        && gate::can_process(it, &active, &cfg, &network, low_power, now)
                })
            };
            if purged > 0 {
                crate::metrics::record_expired(purged);
            }
            if purged > 0 || item.is_some() {
                self.persist_queue().await;
            }

            let Some(item) = item else {
                break StopReason::QueueDrained;
            };

            self.inner.active.insert(item.id.clone(), ());
            let handler = self.inner.handlers.read().get(item.kind);
            let attempt_start = Instant::now();
            debug!(id = %item.id, kind = %item.kind, retry_count = item.retry_count, "dispatching");

            let outcome = match &handler {
                None => {
                    warn!(id = %item.id, kind = %item.kind, "no handler registered for type");
                    Err(SyncError::Unknown("no handler registered".into()))
                }
                Some(h) => {
                    tokio::select! {
                        result = h.execute(&item) => result,
                        () = keep_alive_lost(&mut keep_alive) => {
                            warn!(id = %item.id, "keep-alive revoked mid-attempt, abandoning");
                            Err(SyncError::TimeExpired)
                        }
                    }
                }
            };
            self.inner.active.remove(&item.id);

            if self.inner.stop_requested.load(Ordering::Acquire) {
                // stop() during the attempt: its outcome is discarded
                break StopReason::Stopped;
            }

            let attempt_time = attempt_start.elapsed();
            dispatched += 1;
            match outcome {
                Ok(()) => {
                    succeeded += 1;
                    self.inner
                        .stats
                        .lock()
                        .record_success(item.kind, attempt_time, epoch_ms());
                    crate::metrics::record_item(item.kind.label(), "success");
                    crate::metrics::record_item_latency(item.kind.label(), attempt_time);
                    debug!(id = %item.id, elapsed_ms = attempt_time.as_millis() as u64, "item synced");
                }
                Err(err) => {
                    failed += 1;
                    self.inner.stats.lock().record_failure(
                        item.kind,
                        err.kind(),
                        attempt_time,
                        epoch_ms(),
                    );
                    crate::metrics::record_item(item.kind.label(), "failure");
                    crate::metrics::record_error(err.kind());

                    // Retry caps re-resolve against the live configuration,
                    // not the snapshot this run started with.
                    let retry_cfg = self.inner.config.read().clone();
                    // A type with no handler can never succeed; drop it now.
                    let decision = if handler.is_some() {
                        self.inner
                            .retry_policy
                            .on_failure(&item, &err, &retry_cfg, epoch_ms())
                    } else {
                        RetryDecision::Terminal
                    };

                    match decision {
                        RetryDecision::Reschedule(next) => {
                            crate::metrics::record_retry(item.kind.label());
                            self.inner.queue.lock().upsert(next);
                            self.persist_queue().await;
                        }
                        RetryDecision::Terminal => {
                            info!(id = %item.id, kind = %item.kind, error = %err, "terminal failure");
                            crate::metrics::record_item(item.kind.label(), "terminal");
                            let _ = self.inner.terminal_tx.send(TerminalFailure {
                                id: item.id.clone(),
                                kind: item.kind,
                                error_kind: err.kind(),
                            });
                        }
                    }
                }
            }
            self.persist_statistics().await;

            tokio::time::sleep(ITEM_YIELD).await;
        };

        // In-flight work is never hard-cancelled, but nothing survives the
        // run in the active set.
        self.inner.active.clear();
        self.inner.host.end_run();
        self.inner.host.schedule_wakeup(cfg.sync_interval());
        let _ = self.inner.state_tx.send(SchedulerState::Idle);
        self.inner.running.store(false, Ordering::Release);

        let elapsed = started.elapsed();
        crate::metrics::record_run(reason.as_str(), elapsed);
        info!(
            dispatched,
            succeeded,
            failed,
            reason = reason.as_str(),
            elapsed_ms = elapsed.as_millis() as u64,
            "sync run finished"
        );
        RunSummary {
            dispatched,
            succeeded,
            failed,
            elapsed,
            reason,
        }
    }
}

/// Resolves once the keep-alive grant flips to false or the host drops the
/// sender (treated as revocation).
async fn keep_alive_lost(rx: &mut watch::Receiver<bool>) {
    while *rx.borrow() {
        if rx.changed().await.is_err() {
            break;
        }
    }
}
