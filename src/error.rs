// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error taxonomy for sync attempts and persistence.
//!
//! Handlers translate their domain failures into [`SyncError`] so the
//! scheduler can classify, count, and retry them uniformly. Handler errors
//! are always caught at the run-loop boundary and never escape it.

use thiserror::Error;

/// Failure of a single sync attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("network unavailable")]
    NetworkUnavailable,

    /// The run budget or the host's keep-alive expired mid-attempt.
    #[error("execution time expired")]
    TimeExpired,

    #[error("data corrupted: {0}")]
    DataCorrupted(String),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("rate limited")]
    RateLimited,

    #[error("server error: {code}")]
    Server { code: u16 },

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl SyncError {
    /// Stable label for statistics and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NetworkUnavailable => "network_unavailable",
            Self::TimeExpired => "time_expired",
            Self::DataCorrupted(_) => "data_corrupted",
            Self::AuthenticationFailed => "auth_failed",
            Self::RateLimited => "rate_limited",
            Self::Server { .. } => "server_error",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// Failure of the persistence collaborator. Never aborts scheduling; the
/// run loop logs these and carries on (best-effort durability).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
