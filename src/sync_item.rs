//! Sync item data structure.
//!
//! The [`SyncItem`] is the unit of schedulable work that flows through the
//! scheduler. Each item has a stable id (re-scheduling an existing id
//! replaces the pending entry), a job type, a priority, and retry
//! bookkeeping. The payload is opaque to the scheduler; its schema per type
//! is owned by the matching handler.

use std::collections::BTreeSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Items whose scheduled time is more than this far in the past are
/// considered expired and are purged instead of executed.
pub const EXPIRY_GRACE_MS: i64 = 60 * 60 * 1000;

/// Current wall-clock time as epoch milliseconds.
pub fn epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Closed set of background job categories.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    Streams,
    Favorites,
    Subscriptions,
    UserSettings,
    Notifications,
    Analytics,
    Thumbnails,
    LiveStatus,
}

impl SyncType {
    /// All job categories, for building default type sets.
    pub const ALL: [SyncType; 8] = [
        Self::Streams,
        Self::Favorites,
        Self::Subscriptions,
        Self::UserSettings,
        Self::Notifications,
        Self::Analytics,
        Self::Thumbnails,
        Self::LiveStatus,
    ];

    /// Stable label used for ids, statistics keys, and metric labels.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Streams => "streams",
            Self::Favorites => "favorites",
            Self::Subscriptions => "subscriptions",
            Self::UserSettings => "user_settings",
            Self::Notifications => "notifications",
            Self::Analytics => "analytics",
            Self::Thumbnails => "thumbnails",
            Self::LiveStatus => "live_status",
        }
    }
}

impl std::fmt::Display for SyncType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Item priority. Higher priorities are dispatched first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SyncPriority {
    Low,
    Normal,
    High,
    Critical,
}

/// One schedulable unit of background work.
///
/// # Example
///
/// ```
/// use sync_scheduler::{SyncItem, SyncType, SyncPriority};
///
/// let item = SyncItem::new("favorites.refresh", SyncType::Favorites)
///     .with_priority(SyncPriority::High)
///     .with_requires_network(false);
///
/// assert_eq!(item.id, "favorites.refresh");
/// assert_eq!(item.retry_count, 0);
/// assert!(!item.is_expired(sync_scheduler::epoch_ms()));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncItem {
    /// Stable identity; upserting an existing id replaces the pending entry.
    pub id: String,
    /// Job category, used for handler dispatch and per-type gating.
    pub kind: SyncType,
    pub priority: SyncPriority,
    /// Earliest eligible execution time (epoch millis). `None` means
    /// "as soon as possible".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<i64>,
    /// Attempts consumed so far, monotonically non-decreasing per id.
    #[serde(default)]
    pub retry_count: u32,
    /// Explicit per-item retry cap. `None` re-resolves against the live
    /// configuration default at each failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default = "default_requires_network")]
    pub requires_network: bool,
    /// Rough cost hint for budget-aware selection; never enforced precisely.
    #[serde(default)]
    pub estimated_duration_ms: u64,
    /// Ids that must not be in flight when this item is dispatched.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub dependencies: BTreeSet<String>,
    /// Handler-specific data, opaque to the scheduler.
    #[serde(default)]
    pub payload: Value,
    /// Queue insertion order, used as the final sort tie-break.
    #[serde(default)]
    pub(crate) seq: u64,
}

fn default_requires_network() -> bool {
    true
}

impl SyncItem {
    /// Create a new item with normal priority, immediate schedule, and no
    /// explicit retry cap.
    pub fn new(id: impl Into<String>, kind: SyncType) -> Self {
        Self {
            id: id.into(),
            kind,
            priority: SyncPriority::Normal,
            scheduled_at: None,
            retry_count: 0,
            max_retries: None,
            requires_network: true,
            estimated_duration_ms: 0,
            dependencies: BTreeSet::new(),
            payload: Value::Null,
            seq: 0,
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: SyncPriority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_scheduled_at(mut self, at_ms: i64) -> Self {
        self.scheduled_at = Some(at_ms);
        self
    }

    /// Pin the retry cap for this item. Items without an explicit cap follow
    /// the configuration default, re-read at each failure.
    #[must_use]
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = Some(max);
        self
    }

    #[must_use]
    pub fn with_requires_network(mut self, requires: bool) -> Self {
        self.requires_network = requires;
        self
    }

    #[must_use]
    pub fn with_estimated_duration_ms(mut self, ms: u64) -> Self {
        self.estimated_duration_ms = ms;
        self
    }

    #[must_use]
    pub fn with_dependency(mut self, id: impl Into<String>) -> Self {
        self.dependencies.insert(id.into());
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// An item is expired once its scheduled time is more than
    /// [`EXPIRY_GRACE_MS`] in the past without having run. Items with no
    /// scheduled time never expire.
    #[must_use]
    pub fn is_expired(&self, now_ms: i64) -> bool {
        match self.scheduled_at {
            Some(at) => now_ms.saturating_sub(at) > EXPIRY_GRACE_MS,
            None => false,
        }
    }

    /// Retry cap in effect for this item given the configuration default.
    #[must_use]
    pub fn effective_max_retries(&self, default_max: u32) -> u32 {
        self.max_retries.unwrap_or(default_max)
    }

    /// Whether another attempt is permitted.
    #[must_use]
    pub fn can_retry(&self, default_max: u32) -> bool {
        self.retry_count < self.effective_max_retries(default_max)
    }
}
