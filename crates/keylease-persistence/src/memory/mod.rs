//! In-memory row store
//!
//! Per-key atomicity comes from DashMap's shard locks: every predicate is
//! evaluated while the entry guard is held, so each operation is a single
//! test-and-set just like the SQL backend's one-statement writes.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::model::{LeaseRecord, RowPredicate, RowUpdate};
use crate::traits::RowStore;

/// Row store held entirely in process memory
///
/// Behaves like the SQL backend down to affected-row counts. Intended for
/// tests and single-process embedding; independent instances model
/// independent storage backends.
#[derive(Debug, Default)]
pub struct MemoryRowStore {
    rows: DashMap<String, LeaseRecord>,
}

impl MemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently stored
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl RowStore for MemoryRowStore {
    async fn read(&self, key: &str) -> anyhow::Result<Option<LeaseRecord>> {
        Ok(self.rows.get(key).map(|row| row.clone()))
    }

    async fn conditional_update(
        &self,
        key: &str,
        predicate: RowPredicate,
        update: RowUpdate,
    ) -> anyhow::Result<u64> {
        match self.rows.get_mut(key) {
            Some(mut row) if predicate.matches(&row) => {
                update.apply(&mut row);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn insert_if_absent(&self, record: LeaseRecord) -> anyhow::Result<bool> {
        match self.rows.entry(record.key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(true)
            }
            Entry::Occupied(_) => Ok(false),
        }
    }

    async fn delete_where(&self, key: &str, predicate: RowPredicate) -> anyhow::Result<u64> {
        let removed = self.rows.remove_if(key, |_, row| predicate.matches(row));
        Ok(u64::from(removed.is_some()))
    }

    async fn scan(&self) -> anyhow::Result<Vec<LeaseRecord>> {
        Ok(self.rows.iter().map(|entry| entry.value().clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use keylease_common::{LeaseToken, UNLOCKED};

    use super::*;

    fn seeded(key: &str, token: f64, locked_until: f64) -> MemoryRowStore {
        let store = MemoryRowStore::new();
        store.rows.insert(
            key.to_string(),
            LeaseRecord {
                key: key.to_string(),
                value: Some("v".to_string()),
                lock_token: token,
                locked_until,
            },
        );
        store
    }

    #[tokio::test]
    async fn test_insert_if_absent_once() {
        let store = MemoryRowStore::new();
        let token = LeaseToken::generate();

        assert!(
            store
                .insert_if_absent(LeaseRecord::placeholder("k1", token, 100.0))
                .await
                .unwrap()
        );
        assert!(
            !store
                .insert_if_absent(LeaseRecord::placeholder("k1", token, 200.0))
                .await
                .unwrap()
        );
        assert_eq!(store.len(), 1);
        // The losing insert did not clobber the row
        assert_eq!(store.read("k1").await.unwrap().unwrap().locked_until, 100.0);
    }

    #[tokio::test]
    async fn test_conditional_update_respects_predicate() {
        let holder = LeaseToken::from_raw(0.25);
        let stranger = LeaseToken::from_raw(0.75);
        let store = seeded("k1", holder.raw(), 100.0);

        let pred = RowPredicate::HeldBy {
            token: stranger,
            now: 50.0,
        };
        assert_eq!(
            store
                .conditional_update("k1", pred, RowUpdate::set_value("hijack"))
                .await
                .unwrap(),
            0
        );
        assert_eq!(
            store.read("k1").await.unwrap().unwrap().value.as_deref(),
            Some("v")
        );

        let pred = RowPredicate::HeldBy {
            token: holder,
            now: 50.0,
        };
        assert_eq!(
            store
                .conditional_update("k1", pred, RowUpdate::set_value("v2"))
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            store.read("k1").await.unwrap().unwrap().value.as_deref(),
            Some("v2")
        );
    }

    #[tokio::test]
    async fn test_conditional_update_missing_key() {
        let store = MemoryRowStore::new();
        let affected = store
            .conditional_update(
                "missing",
                RowPredicate::TokenEquals(LeaseToken::generate()),
                RowUpdate::unlock(),
            )
            .await
            .unwrap();
        assert_eq!(affected, 0);
    }

    #[tokio::test]
    async fn test_delete_where_guarded() {
        let holder = LeaseToken::from_raw(0.25);
        let store = seeded("k1", holder.raw(), 100.0);

        let wrong = RowPredicate::HeldBy {
            token: LeaseToken::from_raw(0.75),
            now: 50.0,
        };
        assert_eq!(store.delete_where("k1", wrong).await.unwrap(), 0);
        assert_eq!(store.len(), 1);

        let right = RowPredicate::HeldBy {
            token: holder,
            now: 50.0,
        };
        assert_eq!(store.delete_where("k1", right).await.unwrap(), 1);
        assert!(store.is_empty());
        assert!(store.read("k1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scan_returns_all_rows() {
        let store = seeded("k1", UNLOCKED, 0.0);
        store.rows.insert(
            "k2".to_string(),
            LeaseRecord::placeholder("k2", LeaseToken::generate(), 100.0),
        );

        let mut keys: Vec<String> = store
            .scan()
            .await
            .unwrap()
            .into_iter()
            .map(|row| row.key)
            .collect();
        keys.sort();
        assert_eq!(keys, vec!["k1".to_string(), "k2".to_string()]);
    }
}
