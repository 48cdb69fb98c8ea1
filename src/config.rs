//! Configuration for the sync scheduler.
//!
//! # Example
//!
//! ```
//! use sync_scheduler::SyncConfiguration;
//!
//! // Minimal config (uses defaults)
//! let config = SyncConfiguration::default();
//! assert_eq!(config.max_sync_duration_ms, 25_000); // under a 30s host ceiling
//!
//! // Full config
//! let config = SyncConfiguration {
//!     sync_interval_secs: 600,
//!     max_retries: 5,
//!     background_sync_enabled: true,
//!     ..Default::default()
//! };
//! ```

use std::collections::BTreeSet;
use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::sync_item::SyncType;

/// Process-wide scheduler configuration, hot-swappable through the facade.
///
/// Durations are stored as integers so the whole struct round-trips
/// losslessly through any serde format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfiguration {
    /// Interval between periodic background wake-ups, in seconds.
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,

    /// Hard wall-clock budget per run, in milliseconds. Must stay below
    /// the host's grant (e.g. 25s under a 30s OS ceiling).
    #[serde(default = "default_max_sync_duration_ms")]
    pub max_sync_duration_ms: u64,

    /// Fixed delay before a failed item becomes eligible again, in millis.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Default retry cap for items that carry no explicit cap of their own.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Maximum items dispatched in a single run.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Job types the scheduler will accept; scheduling a disabled type is a
    /// silent no-op.
    #[serde(default = "default_enabled_types")]
    pub enabled_types: BTreeSet<SyncType>,

    /// Types that always require network, regardless of the item flag.
    #[serde(default)]
    pub network_required_types: BTreeSet<SyncType>,

    /// Types that only run on an unmetered connection.
    #[serde(default = "default_wifi_only_types")]
    pub wifi_only_types: BTreeSet<SyncType>,

    #[serde(default = "default_background_sync_enabled")]
    pub background_sync_enabled: bool,

    /// Whether sync is permitted while the device is in a power-saving state.
    #[serde(default)]
    pub low_power_sync_enabled: bool,
}

fn default_sync_interval_secs() -> u64 { 15 * 60 }
fn default_max_sync_duration_ms() -> u64 { 25_000 }
fn default_retry_delay_ms() -> u64 { 30_000 }
fn default_max_retries() -> u32 { 3 }
fn default_batch_size() -> usize { 20 }
fn default_enabled_types() -> BTreeSet<SyncType> { SyncType::ALL.into_iter().collect() }
fn default_wifi_only_types() -> BTreeSet<SyncType> {
    [SyncType::Thumbnails].into_iter().collect()
}
fn default_background_sync_enabled() -> bool { true }

impl Default for SyncConfiguration {
    fn default() -> Self {
        Self {
            sync_interval_secs: default_sync_interval_secs(),
            max_sync_duration_ms: default_max_sync_duration_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            max_retries: default_max_retries(),
            batch_size: default_batch_size(),
            enabled_types: default_enabled_types(),
            network_required_types: BTreeSet::new(),
            wifi_only_types: default_wifi_only_types(),
            background_sync_enabled: default_background_sync_enabled(),
            low_power_sync_enabled: false,
        }
    }
}

impl SyncConfiguration {
    #[must_use]
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    #[must_use]
    pub fn max_sync_duration(&self) -> Duration {
        Duration::from_millis(self.max_sync_duration_ms)
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfiguration::default();

        assert_eq!(config.sync_interval(), Duration::from_secs(900));
        assert_eq!(config.max_sync_duration(), Duration::from_millis(25_000));
        assert_eq!(config.retry_delay(), Duration::from_millis(30_000));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.enabled_types.len(), 8);
        assert!(config.network_required_types.is_empty());
        assert!(config.wifi_only_types.contains(&SyncType::Thumbnails));
        assert!(config.background_sync_enabled);
        assert!(!config.low_power_sync_enabled);
    }

    #[test]
    fn test_budget_stays_under_host_ceiling() {
        // The host grants ~30s; the default budget must leave headroom
        let config = SyncConfiguration::default();
        assert!(config.max_sync_duration() < Duration::from_secs(30));
    }

    #[test]
    fn test_serde_roundtrip_is_lossless() {
        let config = SyncConfiguration {
            sync_interval_secs: 60,
            max_sync_duration_ms: 10_000,
            retry_delay_ms: 500,
            max_retries: 7,
            batch_size: 5,
            enabled_types: [SyncType::Streams, SyncType::LiveStatus].into_iter().collect(),
            network_required_types: [SyncType::Streams].into_iter().collect(),
            wifi_only_types: [SyncType::Thumbnails, SyncType::Analytics].into_iter().collect(),
            background_sync_enabled: false,
            low_power_sync_enabled: true,
        };

        let json = serde_json::to_string(&config).unwrap();
        let back: SyncConfiguration = serde_json::from_str(&json).unwrap();

        assert_eq!(back, config);
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let config: SyncConfiguration = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SyncConfiguration::default());
    }
}
