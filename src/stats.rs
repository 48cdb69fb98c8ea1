//! Running statistics over completed sync attempts.
//!
//! Loaded once at process start, updated after every attempt, persisted
//! after every update, never reset automatically.

use std::collections::BTreeMap;
use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::sync_item::SyncType;

/// Cumulative counters and a running average over attempt durations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncStatistics {
    /// Total attempts (successes and failures).
    #[serde(default)]
    pub total_syncs: u64,
    #[serde(default)]
    pub successful_syncs: u64,
    #[serde(default)]
    pub failed_syncs: u64,
    /// Incrementally maintained mean attempt duration, in milliseconds.
    #[serde(default)]
    pub average_sync_duration_ms: f64,
    /// Epoch millis of the most recent attempt.
    #[serde(default)]
    pub last_sync_time: Option<i64>,
    /// Attempt counts per job type.
    #[serde(default)]
    pub syncs_by_type: BTreeMap<SyncType, u64>,
    /// Failure counts per error kind label.
    #[serde(default)]
    pub errors_by_kind: BTreeMap<String, u64>,
}

impl SyncStatistics {
    pub fn record_success(&mut self, kind: SyncType, duration: Duration, now_ms: i64) {
        self.successful_syncs += 1;
        self.record_attempt(kind, duration, now_ms);
    }

    pub fn record_failure(
        &mut self,
        kind: SyncType,
        error_kind: &str,
        duration: Duration,
        now_ms: i64,
    ) {
        self.failed_syncs += 1;
        *self.errors_by_kind.entry(error_kind.to_string()).or_insert(0) += 1;
        self.record_attempt(kind, duration, now_ms);
    }

    fn record_attempt(&mut self, kind: SyncType, duration: Duration, now_ms: i64) {
        self.total_syncs += 1;
        *self.syncs_by_type.entry(kind).or_insert(0) += 1;
        self.last_sync_time = Some(now_ms);

        // Welford-style incremental mean: no stored sum to overflow
        let ms = duration.as_secs_f64() * 1000.0;
        self.average_sync_duration_ms +=
            (ms - self.average_sync_duration_ms) / self.total_syncs as f64;
    }

    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total_syncs == 0 {
            return 0.0;
        }
        self.successful_syncs as f64 / self.total_syncs as f64
    }
}
