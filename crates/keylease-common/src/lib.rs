//! Keylease Common - Shared types and utilities
//!
//! This crate provides the foundational types used across all Keylease
//! components:
//! - Error types for lease operations
//! - Lease tokens and the unlocked sentinel
//! - Timestamp utilities

pub mod error;
pub mod token;
pub mod utils;

// Re-exports for convenience
pub use error::LeaseError;
pub use token::{LeaseToken, UNLOCKED};
pub use utils::unix_now;

/// Default lease duration in seconds
pub const DEFAULT_LEASE_SECS: f64 = 30.0;

/// Default sleep between acquisition attempts while waiting, in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default deadline for waiting operations, in milliseconds
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;
