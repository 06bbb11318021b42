//! Row store trait
//!
//! Defines the interface the leasing protocol requires from a durable
//! table: atomic conditional update (the sole source of mutual exclusion),
//! insert-if-absent, point read, conditional delete, and a full scan.

use async_trait::async_trait;

use crate::model::{LeaseRecord, RowPredicate, RowUpdate};

/// Durable row storage with atomic test-and-set semantics
///
/// `conditional_update` and `delete_where` must evaluate their predicate
/// atomically with the write (a single `UPDATE`/`DELETE ... WHERE`, or an
/// equivalent per-key CAS); callers rely on the affected-row count to
/// learn whether the predicate held. Keys are non-empty strings.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Read the row for `key`
    async fn read(&self, key: &str) -> anyhow::Result<Option<LeaseRecord>>;

    /// Atomically apply `update` to the row for `key` where `predicate`
    /// holds; returns the affected-row count (0 or 1)
    async fn conditional_update(
        &self,
        key: &str,
        predicate: RowPredicate,
        update: RowUpdate,
    ) -> anyhow::Result<u64>;

    /// Insert `record` unless a row for its key already exists
    async fn insert_if_absent(&self, record: LeaseRecord) -> anyhow::Result<bool>;

    /// Delete the row for `key` where `predicate` holds; returns the
    /// affected-row count (0 or 1)
    async fn delete_where(&self, key: &str, predicate: RowPredicate) -> anyhow::Result<u64>;

    /// All rows, in unspecified order
    async fn scan(&self) -> anyhow::Result<Vec<LeaseRecord>>;
}
