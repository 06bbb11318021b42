//! Keylease Persistence - Durable row storage for the leasing protocol
//!
//! This crate provides:
//! - The `LeaseRecord` row model and the conditional-write predicates
//! - The `RowStore` trait abstraction for unified storage
//! - A SeaORM backend for an external MySQL/PostgreSQL table
//! - An in-memory backend for tests and single-process embedding

pub mod entity;
pub mod memory;
pub mod model;
pub mod sql;
pub mod traits;

// Re-export sea-orm for convenience
pub use sea_orm;

// Re-export entity prelude
pub use entity::prelude::*;

// Re-export the row store trait
pub use traits::RowStore;

// Re-export backends
pub use memory::MemoryRowStore;
pub use sql::SqlRowStore;

// Re-export model types
pub use model::{LeaseRecord, RowPredicate, RowUpdate};
