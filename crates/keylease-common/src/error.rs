//! Error types for lease operations
//!
//! Two of these are recoverable by design and meant to be handled by the
//! caller: `TokenMismatch` (retry with a fresh lease, or skip) and
//! `Timeout` (retry with a longer deadline). Storage failures propagate
//! unchanged and are fatal to the operation that hit them.

/// Errors surfaced by the lease manager and the key/value façade
#[derive(thiserror::Error, Debug)]
pub enum LeaseError {
    /// The presented token does not match the current holder of the key,
    /// or the key is not locked at all. Never retried internally.
    #[error("token does not match the current holder of key '{key}'")]
    TokenMismatch { key: String },

    /// A waiting operation ran out its deadline without acquiring.
    #[error("timed out after {waited_ms}ms waiting to acquire {keys:?}")]
    Timeout { keys: Vec<String>, waited_ms: u64 },

    /// Failure from the row store, passed through as-is.
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl LeaseError {
    /// Whether this error signals contention rather than a hard failure
    pub fn is_contention(&self) -> bool {
        matches!(
            self,
            LeaseError::TokenMismatch { .. } | LeaseError::Timeout { .. }
        )
    }
}
