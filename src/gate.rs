// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Admission gating for queued items.
//!
//! [`can_process`] is a pure predicate: it never mutates state, and a
//! rejected item simply stays queued for a later pass. Checks run in a fixed
//! order and short-circuit on the first failure.

use std::collections::HashSet;

use crate::config::SyncConfiguration;
use crate::host::NetworkStatus;
use crate::sync_item::SyncItem;

/// Whether `item` may be dispatched right now.
///
/// Checks, in order:
/// 1. the item's id is not already in flight;
/// 2. network is available if the item (or its type) requires it;
/// 3. wifi-only types get an available, unmetered connection;
/// 4. low-power mode blocks unless the configuration permits it;
/// 5. no dependency id is currently in flight;
/// 6. the scheduled time, if set, has arrived.
#[must_use]
pub fn can_process(
    item: &SyncItem,
    active_ids: &HashSet<String>,
    config: &SyncConfiguration,
    network: &NetworkStatus,
    low_power: bool,
    now_ms: i64,
) -> bool {
    if active_ids.contains(&item.id) {
        return false;
    }

    let needs_network =
        item.requires_network || config.network_required_types.contains(&item.kind);
    if needs_network && !network.available {
        return false;
    }

    if config.wifi_only_types.contains(&item.kind) && !(network.available && !network.metered) {
        return false;
    }

    if low_power && !config.low_power_sync_enabled {
        return false;
    }

    if item.dependencies.iter().any(|dep| active_ids.contains(dep)) {
        return false;
    }

    if let Some(at) = item.scheduled_at {
        if at > now_ms {
            return false;
        }
    }

    true
}
