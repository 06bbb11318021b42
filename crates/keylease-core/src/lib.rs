//! Keylease Core - Lease manager and key/value façade
//!
//! This crate provides:
//! - `LeaseManager`: time-bounded exclusive leases over a shared durable
//!   table, with scoped acquire/release helpers
//! - `KvStore`: ordinary map operations guarded by lease tokens
//! - `KvProperties`: runtime tuning knobs
//! - Metric descriptions for lease activity

pub mod config;
pub mod kv;
pub mod lease;
pub mod metrics;

pub use config::KvProperties;
pub use kv::KvStore;
pub use lease::LeaseManager;

// Re-export the types callers handle directly
pub use keylease_common::{LeaseError, LeaseToken};
