//! Lease tokens
//!
//! A token is an unguessable value proving current lease ownership for a
//! key. Tokens are random `f64` nonces: two concurrent acquirers draw from
//! 53 bits of entropy, so a collision is negligible without needing a
//! node ID in the mix. The reserved sentinel `UNLOCKED` marks a row nobody
//! holds and can never be generated.

use serde::{Deserialize, Serialize};

/// Raw column value meaning "no current holder"
pub const UNLOCKED: f64 = -1.0;

/// An unguessable value proving lease ownership for a key
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaseToken(f64);

impl LeaseToken {
    /// Generate a fresh random token, drawn uniformly from `[0, 1)`
    pub fn generate() -> Self {
        Self(rand::random::<f64>())
    }

    /// Token carrying the raw column value `raw`
    pub fn from_raw(raw: f64) -> Self {
        Self(raw)
    }

    /// Raw column value for this token
    pub fn raw(self) -> f64 {
        self.0
    }

    /// Whether this token is the unlocked sentinel
    pub fn is_unlocked(self) -> bool {
        self.0 == UNLOCKED
    }
}

impl std::fmt::Display for LeaseToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
