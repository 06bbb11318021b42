//! Domain model for the durable row store
//!
//! One row per key: the serialized value plus the two lease columns that
//! make conditional acquisition possible. The predicate and update types
//! here are shared by every backend, so the SQL `WHERE` clause and the
//! in-memory test-and-set cannot drift apart.

use keylease_common::{LeaseToken, UNLOCKED};
use serde::{Deserialize, Serialize};

/// One row of the `lease_record` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaseRecord {
    /// Unique key, never empty
    pub key: String,
    /// Serialized payload; `None` while the key exists only as a lock
    /// placeholder
    pub value: Option<String>,
    /// Nonce of the current holder, or the `UNLOCKED` sentinel
    pub lock_token: f64,
    /// UNIX timestamp (seconds); the lease is valid only while
    /// `now < locked_until`
    pub locked_until: f64,
}

impl LeaseRecord {
    /// A fresh row holding no value, leased to `token` until `locked_until`
    pub fn placeholder(key: impl Into<String>, token: LeaseToken, locked_until: f64) -> Self {
        Self {
            key: key.into(),
            value: None,
            lock_token: token.raw(),
            locked_until,
        }
    }

    /// Whether an unexpired lease holds this row at `now`
    pub fn is_locked(&self, now: f64) -> bool {
        self.lock_token != UNLOCKED && self.locked_until > now
    }

    /// Whether `token` holds an unexpired lease on this row at `now`
    pub fn is_held_by(&self, token: LeaseToken, now: f64) -> bool {
        self.lock_token == token.raw() && self.locked_until > now
    }
}

/// Predicate guarding a conditional row write
///
/// The three shapes the leasing protocol needs. Backends must evaluate the
/// predicate atomically with the write it guards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowPredicate {
    /// The row can be granted to `token` at `now`: unlocked, already held
    /// by `token` (renewal), or expired
    Acquirable { token: LeaseToken, now: f64 },
    /// The row is held by `token` and the lease has not expired at `now`
    HeldBy { token: LeaseToken, now: f64 },
    /// The row's lock token equals `token`, expired or not
    TokenEquals(LeaseToken),
}

impl RowPredicate {
    /// Evaluate against an in-memory row
    pub fn matches(&self, record: &LeaseRecord) -> bool {
        match *self {
            RowPredicate::Acquirable { token, now } => {
                record.lock_token == UNLOCKED
                    || record.lock_token == token.raw()
                    || record.locked_until <= now
            }
            RowPredicate::HeldBy { token, now } => record.is_held_by(token, now),
            RowPredicate::TokenEquals(token) => record.lock_token == token.raw(),
        }
    }
}

/// Partial column update applied where a predicate matches
///
/// Unset fields leave the column as it is.
#[derive(Debug, Clone, Default)]
pub struct RowUpdate {
    pub value: Option<Option<String>>,
    pub lock_token: Option<f64>,
    pub locked_until: Option<f64>,
}

impl RowUpdate {
    /// Grant or renew: point the lease columns at `token` until `until`
    pub fn grant(token: LeaseToken, until: f64) -> Self {
        Self {
            lock_token: Some(token.raw()),
            locked_until: Some(until),
            ..Default::default()
        }
    }

    /// Reset the lock token to the unlocked sentinel
    ///
    /// `value` and `locked_until` stay as they are: releasing a lease does
    /// not end the life of the stored data.
    pub fn unlock() -> Self {
        Self {
            lock_token: Some(UNLOCKED),
            ..Default::default()
        }
    }

    /// Overwrite the stored value, leaving the lease columns untouched
    pub fn set_value(value: impl Into<String>) -> Self {
        Self {
            value: Some(Some(value.into())),
            ..Default::default()
        }
    }

    /// Extend the lease expiry only
    pub fn extend(until: f64) -> Self {
        Self {
            locked_until: Some(until),
            ..Default::default()
        }
    }

    /// Apply to an in-memory row
    pub fn apply(&self, record: &mut LeaseRecord) {
        if let Some(ref value) = self.value {
            record.value = value.clone();
        }
        if let Some(lock_token) = self.lock_token {
            record.lock_token = lock_token;
        }
        if let Some(locked_until) = self.locked_until {
            record.locked_until = locked_until;
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn record(token: f64, locked_until: f64) -> LeaseRecord {
        LeaseRecord {
            key: "k".to_string(),
            value: None,
            lock_token: token,
            locked_until,
        }
    }

    #[test]
    fn test_is_locked() {
        assert!(record(0.5, 100.0).is_locked(99.0));
        // Expired
        assert!(!record(0.5, 100.0).is_locked(100.0));
        // Unlocked sentinel, expiry in the future
        assert!(!record(UNLOCKED, 100.0).is_locked(99.0));
    }

    #[test]
    fn test_acquirable_matches() {
        let token = LeaseToken::from_raw(0.25);
        let pred = RowPredicate::Acquirable { token, now: 50.0 };

        // Unlocked row
        assert!(pred.matches(&record(UNLOCKED, 100.0)));
        // Held by the same token (renewal)
        assert!(pred.matches(&record(0.25, 100.0)));
        // Held by someone else but expired
        assert!(pred.matches(&record(0.75, 50.0)));
        // Held by someone else, unexpired
        assert!(!pred.matches(&record(0.75, 100.0)));
    }

    #[test]
    fn test_held_by_matches() {
        let token = LeaseToken::from_raw(0.25);
        let pred = RowPredicate::HeldBy { token, now: 50.0 };

        assert!(pred.matches(&record(0.25, 100.0)));
        // Own lease but expired
        assert!(!pred.matches(&record(0.25, 50.0)));
        // Someone else's lease
        assert!(!pred.matches(&record(0.75, 100.0)));
        assert!(!pred.matches(&record(UNLOCKED, 100.0)));
    }

    #[test]
    fn test_token_equals_ignores_expiry() {
        let token = LeaseToken::from_raw(0.25);
        let pred = RowPredicate::TokenEquals(token);

        assert!(pred.matches(&record(0.25, 0.0)));
        assert!(pred.matches(&record(0.25, f64::MAX)));
        assert!(!pred.matches(&record(0.75, 0.0)));
    }

    #[test]
    fn test_unlock_preserves_value_and_expiry() {
        let mut row = record(0.25, 100.0);
        row.value = Some("payload".to_string());

        RowUpdate::unlock().apply(&mut row);

        assert_eq!(row.lock_token, UNLOCKED);
        assert_eq!(row.value.as_deref(), Some("payload"));
        assert_eq!(row.locked_until, 100.0);
    }

    #[test]
    fn test_set_value_leaves_lease_columns() {
        let mut row = record(0.25, 100.0);

        RowUpdate::set_value("v2").apply(&mut row);

        assert_eq!(row.value.as_deref(), Some("v2"));
        assert_eq!(row.lock_token, 0.25);
        assert_eq!(row.locked_until, 100.0);
    }

    #[test]
    fn test_grant_sets_both_lease_columns() {
        let mut row = record(UNLOCKED, 0.0);
        let token = LeaseToken::from_raw(0.5);

        RowUpdate::grant(token, 123.0).apply(&mut row);

        assert_eq!(row.lock_token, 0.5);
        assert_eq!(row.locked_until, 123.0);
        assert_eq!(row.value, None);
    }

    proptest! {
        // A row an Acquirable predicate rejects must be locked by a
        // different holder; everything else is implicitly free.
        #[test]
        fn prop_acquirable_rejects_only_live_foreign_leases(
            row_token in 0.0f64..1.0,
            my_token in 0.0f64..1.0,
            locked_until in 0.0f64..200.0,
            now in 0.0f64..200.0,
        ) {
            let row = record(row_token, locked_until);
            let pred = RowPredicate::Acquirable {
                token: LeaseToken::from_raw(my_token),
                now,
            };
            let foreign_live = row.is_locked(now) && row_token != my_token;
            prop_assert_eq!(pred.matches(&row), !foreign_live);
        }
    }
}
