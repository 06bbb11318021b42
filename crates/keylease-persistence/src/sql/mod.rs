//! SQL row store over an external database (MySQL or PostgreSQL)
//!
//! Every conditional write compiles to a single statement, so the
//! database is the only arbiter of who holds a lease; the store itself
//! keeps no state beyond the connection handle.

use sea_orm::sea_query::{Expr, OnConflict, TableCreateStatement};
use sea_orm::{
    ColumnTrait, Condition, DatabaseBackend, DatabaseConnection, EntityTrait, QueryFilter, Schema,
    Set, TryInsertResult,
};

use keylease_common::UNLOCKED;

use crate::entity::lease_record;
use crate::model::{LeaseRecord, RowPredicate, RowUpdate};
use crate::traits::RowStore;

/// Row store backed by an external database via SeaORM
pub struct SqlRowStore {
    db: DatabaseConnection,
}

impl SqlRowStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// `CREATE TABLE` statement for the backing table, for provisioning
    /// the shared storage before first use
    pub fn create_table_statement(backend: DatabaseBackend) -> TableCreateStatement {
        Schema::new(backend).create_table_from_entity(lease_record::Entity)
    }
}

/// Compile a predicate to the `WHERE` condition of a conditional write
fn predicate_condition(predicate: RowPredicate) -> Condition {
    match predicate {
        RowPredicate::Acquirable { token, now } => Condition::any()
            .add(lease_record::Column::LockToken.eq(UNLOCKED))
            .add(lease_record::Column::LockToken.eq(token.raw()))
            .add(lease_record::Column::LockedUntil.lte(now)),
        RowPredicate::HeldBy { token, now } => Condition::all()
            .add(lease_record::Column::LockToken.eq(token.raw()))
            .add(lease_record::Column::LockedUntil.gt(now)),
        RowPredicate::TokenEquals(token) => {
            Condition::all().add(lease_record::Column::LockToken.eq(token.raw()))
        }
    }
}

fn entity_to_record(model: lease_record::Model) -> LeaseRecord {
    LeaseRecord {
        key: model.key,
        value: model.value,
        lock_token: model.lock_token,
        locked_until: model.locked_until,
    }
}

#[async_trait::async_trait]
impl RowStore for SqlRowStore {
    async fn read(&self, key: &str) -> anyhow::Result<Option<LeaseRecord>> {
        let found = lease_record::Entity::find_by_id(key.to_owned())
            .one(&self.db)
            .await?;
        Ok(found.map(entity_to_record))
    }

    async fn conditional_update(
        &self,
        key: &str,
        predicate: RowPredicate,
        update: RowUpdate,
    ) -> anyhow::Result<u64> {
        let mut stmt = lease_record::Entity::update_many()
            .filter(lease_record::Column::Key.eq(key))
            .filter(predicate_condition(predicate));
        if let Some(value) = update.value {
            stmt = stmt.col_expr(lease_record::Column::Value, Expr::value(value));
        }
        if let Some(lock_token) = update.lock_token {
            stmt = stmt.col_expr(lease_record::Column::LockToken, Expr::value(lock_token));
        }
        if let Some(locked_until) = update.locked_until {
            stmt = stmt.col_expr(lease_record::Column::LockedUntil, Expr::value(locked_until));
        }
        let result = stmt.exec(&self.db).await?;
        Ok(result.rows_affected)
    }

    async fn insert_if_absent(&self, record: LeaseRecord) -> anyhow::Result<bool> {
        let active = lease_record::ActiveModel {
            key: Set(record.key),
            value: Set(record.value),
            lock_token: Set(record.lock_token),
            locked_until: Set(record.locked_until),
        };
        let result = lease_record::Entity::insert(active)
            .on_conflict(
                OnConflict::column(lease_record::Column::Key)
                    .do_nothing()
                    .to_owned(),
            )
            .do_nothing()
            .exec(&self.db)
            .await?;
        Ok(matches!(result, TryInsertResult::Inserted(_)))
    }

    async fn delete_where(&self, key: &str, predicate: RowPredicate) -> anyhow::Result<u64> {
        let result = lease_record::Entity::delete_many()
            .filter(lease_record::Column::Key.eq(key))
            .filter(predicate_condition(predicate))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    async fn scan(&self) -> anyhow::Result<Vec<LeaseRecord>> {
        let rows = lease_record::Entity::find().all(&self.db).await?;
        Ok(rows.into_iter().map(entity_to_record).collect())
    }
}
