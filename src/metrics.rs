// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for the sync scheduler.
//!
//! Uses the `metrics` crate for backend-agnostic collection; the host
//! application chooses the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `sync_scheduler_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `kind`: job type (favorites, streams, ...)
//! - `status`: success, failure, terminal
//! - `reason`: run stop reason

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record the outcome of one item attempt.
pub fn record_item(kind: &str, status: &str) {
    counter!(
        "sync_scheduler_items_total",
        "kind" => kind.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record one attempt's duration.
pub fn record_item_latency(kind: &str, duration: Duration) {
    histogram!(
        "sync_scheduler_item_seconds",
        "kind" => kind.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record an attempt failure by error kind.
pub fn record_error(error_kind: &str) {
    counter!(
        "sync_scheduler_errors_total",
        "error_kind" => error_kind.to_string()
    )
    .increment(1);
}

/// Record a retry re-enqueue.
pub fn record_retry(kind: &str) {
    counter!(
        "sync_scheduler_retries_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record a completed run and why it stopped.
pub fn record_run(reason: &str, duration: Duration) {
    counter!(
        "sync_scheduler_runs_total",
        "reason" => reason.to_string()
    )
    .increment(1);
    histogram!("sync_scheduler_run_seconds").record(duration.as_secs_f64());
}

/// Record expired items purged from the queue.
pub fn record_expired(count: usize) {
    counter!("sync_scheduler_expired_total").increment(count as u64);
}

/// Set the current pending queue depth.
pub fn set_queue_depth(depth: usize) {
    gauge!("sync_scheduler_queue_depth").set(depth as f64);
}

/// Record a persistence failure (best-effort durability).
pub fn record_store_error(operation: &str) {
    counter!(
        "sync_scheduler_store_errors_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}
