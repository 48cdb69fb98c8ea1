//! Public types for the scheduler facade.

use std::time::Duration;

/// Executor state. The scheduler is either idle or driving exactly one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No run in progress
    Idle,
    /// A budgeted run is executing
    Running,
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Running => write!(f, "Running"),
        }
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Queue exhausted or nothing currently eligible
    QueueDrained,
    /// The wall-clock budget elapsed
    BudgetExhausted,
    /// The per-run item cap was reached
    BatchLimit,
    /// The host revoked the keep-alive grant
    KeepAliveRevoked,
    /// `stop()` was requested
    Stopped,
    /// Another run was already in flight; nothing was executed
    AlreadyRunning,
}

impl StopReason {
    /// Stable label for logs and metrics.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QueueDrained => "queue_drained",
            Self::BudgetExhausted => "budget_exhausted",
            Self::BatchLimit => "batch_limit",
            Self::KeepAliveRevoked => "keep_alive_revoked",
            Self::Stopped => "stopped",
            Self::AlreadyRunning => "already_running",
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one run of the executor loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Attempts whose outcome was recorded during this run. An attempt cut
    /// short by `stop()` is discarded and not counted.
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Wall-clock time the run consumed
    pub elapsed: Duration,
    pub reason: StopReason,
}

/// A job that exhausted its retry budget; surfaced to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalFailure {
    pub id: String,
    pub kind: crate::sync_item::SyncType,
    pub error_kind: &'static str,
}
