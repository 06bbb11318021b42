//! Runtime properties
//!
//! Explicit per-instance configuration; there is no process-wide state.

use std::time::Duration;

use serde::Deserialize;

use keylease_common::{DEFAULT_LEASE_SECS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS};

/// Tuning knobs for lease acquisition and waiting
///
/// Deserializable from any serde source; unset fields fall back to the
/// defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KvProperties {
    /// How long a granted lease stays valid, in seconds
    pub lease_secs: f64,
    /// Sleep between acquisition attempts while waiting, in milliseconds
    pub poll_interval_ms: u64,
    /// Deadline for waiting operations, in milliseconds
    pub wait_timeout_ms: u64,
}

impl Default for KvProperties {
    fn default() -> Self {
        Self {
            lease_secs: DEFAULT_LEASE_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
        }
    }
}

impl KvProperties {
    pub fn lease_duration(&self) -> Duration {
        Duration::from_secs_f64(self.lease_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }
}
