//! Priority-ordered pending queue.
//!
//! The [`SyncQueue`] owns all pending [`SyncItem`]s. It is kept sorted by
//! `(priority desc, scheduled time asc)`, ties broken by insertion order,
//! and purges expired items lazily whenever it is consulted. The queue has
//! no awareness of gating; eligibility is supplied by the caller as a
//! predicate.

use tracing::debug;

use crate::sync_item::SyncItem;

/// Ordered collection of pending sync items.
///
/// Small by design (tens of items); every consultation re-sorts or scans
/// linearly rather than maintaining a heap.
#[derive(Debug, Default)]
pub struct SyncQueue {
    items: Vec<SyncItem>,
    next_seq: u64,
}

impl SyncQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a queue from a persisted snapshot, preserving the recorded
    /// insertion order.
    #[must_use]
    pub fn from_snapshot(items: Vec<SyncItem>) -> Self {
        let next_seq = items.iter().map(|i| i.seq + 1).max().unwrap_or(0);
        let mut queue = Self { items, next_seq };
        queue.sort();
        queue
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Insert a new item or replace the pending item with the same id.
    /// Always succeeds. A replacement keeps the original insertion slot so
    /// re-scheduling does not shuffle equal-priority peers.
    pub fn upsert(&mut self, mut item: SyncItem) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.id == item.id) {
            item.seq = existing.seq;
            *existing = item;
        } else {
            item.seq = self.next_seq;
            self.next_seq += 1;
            self.items.push(item);
        }
        self.sort();
    }

    /// Remove a pending item by id. Idempotent; returns whether an item was
    /// removed. Work already dispatched to a handler is not affected.
    pub fn cancel(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.id != id);
        self.items.len() != before
    }

    /// Drop every expired item. Returns the number purged.
    pub fn purge_expired(&mut self, now_ms: i64) -> usize {
        let before = self.items.len();
        self.items.retain(|i| !i.is_expired(now_ms));
        let purged = before - self.items.len();
        if purged > 0 {
            debug!(purged, "purged expired items from queue");
        }
        purged
    }

    /// Purge expired items, then remove and return the first item in sort
    /// order for which `is_eligible` holds. The purge count is returned
    /// alongside so callers do not need a separate scan.
    pub fn next_eligible<F>(&mut self, now_ms: i64, is_eligible: F) -> (usize, Option<SyncItem>)
    where
        F: Fn(&SyncItem) -> bool,
    {
        let purged = self.purge_expired(now_ms);
        let item = self
            .items
            .iter()
            .position(is_eligible)
            .map(|pos| self.items.remove(pos));
        (purged, item)
    }

    /// Clone of the pending items, in sort order, for persistence.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SyncItem> {
        self.items.clone()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|i| i.id == id)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SyncItem> {
        self.items.iter().find(|i| i.id == id)
    }

    fn sort(&mut self) {
        // scheduled_at None means "as soon as possible" and sorts first
        self.items.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| {
                    a.scheduled_at
                        .unwrap_or(i64::MIN)
                        .cmp(&b.scheduled_at.unwrap_or(i64::MIN))
                })
                .then_with(|| a.seq.cmp(&b.seq))
        });
    }
}
