// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Retry policy for failed sync attempts.
//!
//! On failure, an item is either re-enqueued with an incremented retry count
//! and a fixed-interval delay, or dropped as a terminal failure once its
//! retry budget is exhausted. The delay is deliberately fixed rather than
//! exponential: attempts are already spaced out by whole background runs.
//!
//! An item's retry cap is its own `max_retries` if it carries one,
//! otherwise the live configuration default (re-read at every failure, so
//! lowering the default takes effect immediately for capless items).

use tracing::{debug, info};

use crate::config::SyncConfiguration;
use crate::error::SyncError;
use crate::sync_item::SyncItem;

/// Outcome of applying the retry policy to a failed attempt.
#[derive(Debug)]
pub enum RetryDecision {
    /// Re-enqueue this item; it becomes eligible at its new scheduled time.
    Reschedule(SyncItem),
    /// Retries exhausted; the failure is terminal for this id.
    Terminal,
}

/// Stateless policy object; all inputs arrive per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct RetryPolicy;

impl RetryPolicy {
    /// Decide what happens to `item` after `error`.
    ///
    /// A rescheduled item is identical to the original except for
    /// `retry_count + 1` and `scheduled_at = now + retry_delay`.
    pub fn on_failure(
        &self,
        item: &SyncItem,
        error: &SyncError,
        config: &SyncConfiguration,
        now_ms: i64,
    ) -> RetryDecision {
        if !item.can_retry(config.max_retries) {
            info!(
                id = %item.id,
                kind = %item.kind,
                retry_count = item.retry_count,
                error = %error,
                "retries exhausted, dropping item"
            );
            return RetryDecision::Terminal;
        }

        let mut next = item.clone();
        next.retry_count += 1;
        next.scheduled_at = Some(now_ms + config.retry_delay_ms as i64);

        debug!(
            id = %next.id,
            kind = %next.kind,
            retry_count = next.retry_count,
            error_kind = error.kind(),
            "rescheduling failed item"
        );
        RetryDecision::Reschedule(next)
    }
}
