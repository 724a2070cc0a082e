//! Shared error taxonomy (see spec §7 for the policy attached to each kind).

use thiserror::Error;

/// Errors that can cross a kernel subsystem boundary.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("transient network error: {0}")]
    Transient(String),

    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("data quality: {0}")]
    DataQuality(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("strategy {strategy_id} produced a malformed signal: {reason}")]
    MalformedSignal {
        strategy_id: String,
        reason: String,
    },

    #[error("circuit breaker is open: {0}")]
    CircuitOpen(String),

    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

impl KernelError {
    /// Whether this error kind warrants an unlimited-with-cap retry per §7.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::RateLimited { .. })
    }
}

pub type KernelResult<T> = Result<T, KernelError>;
