//! SeaORM entity definitions

pub mod lease_record;
pub mod prelude;
