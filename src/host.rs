//! Injected host collaborators.
//!
//! The host OS grants a revocable keep-alive for each background run and a
//! periodic wake-up registration; network and power state are pushed to the
//! scheduler over watch channels rather than polled. Everything here is an
//! injection seam so tests can supply fakes.

use std::time::Duration;
use parking_lot::Mutex;
use tokio::sync::watch;

/// Snapshot of network reachability, pushed by the network-status
/// collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkStatus {
    pub available: bool,
    /// Whether the current connection is metered (cellular). Wifi-only
    /// types refuse to run on metered connections.
    pub metered: bool,
}

impl NetworkStatus {
    /// Available, unmetered (wifi-like).
    #[must_use]
    pub fn online() -> Self {
        Self { available: true, metered: false }
    }

    /// Available but metered (cellular).
    #[must_use]
    pub fn cellular() -> Self {
        Self { available: true, metered: true }
    }

    #[must_use]
    pub fn offline() -> Self {
        Self { available: false, metered: false }
    }
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::online()
    }
}

/// Host background-execution API.
///
/// One run holds at most one keep-alive grant; the scheduler registers
/// exactly one pending wake-up at a time (re-registration replaces it).
pub trait BackgroundHost: Send + Sync {
    /// Acquire a keep-alive grant for a run. The receiver reads `true` while
    /// the grant is held and flips to `false` (or closes) when the host
    /// revokes it.
    fn begin_run(&self) -> watch::Receiver<bool>;

    /// Release the keep-alive at the end of a run.
    fn end_run(&self);

    /// Register the next periodic wake-up, replacing any pending one.
    fn schedule_wakeup(&self, delay: Duration);
}

/// A host with no OS backing: the keep-alive is never revoked by anyone but
/// the caller and wake-ups are only recorded. Useful for foreground use and
/// tests.
#[derive(Default)]
pub struct UnmanagedHost {
    keep_alive: Mutex<Option<watch::Sender<bool>>>,
    pending_wakeup: Mutex<Option<Duration>>,
}

impl UnmanagedHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Revoke the current keep-alive grant, as the OS would when reclaiming
    /// background time.
    pub fn revoke_keep_alive(&self) {
        if let Some(tx) = self.keep_alive.lock().as_ref() {
            let _ = tx.send(false);
        }
    }

    /// The most recently registered wake-up delay, if any.
    #[must_use]
    pub fn pending_wakeup(&self) -> Option<Duration> {
        *self.pending_wakeup.lock()
    }
}

impl BackgroundHost for UnmanagedHost {
    fn begin_run(&self) -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(true);
        *self.keep_alive.lock() = Some(tx);
        rx
    }

    fn end_run(&self) {
        self.keep_alive.lock().take();
    }

    fn schedule_wakeup(&self, delay: Duration) {
        *self.pending_wakeup.lock() = Some(delay);
    }
}
