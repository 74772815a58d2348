//! # Repository Layer
//!
//! Repository implementations that encapsulate SeaORM operations for the
//! event store tables. Each repository borrows any [`sea_orm::ConnectionTrait`]
//! so the same calls run against the pool or inside a transaction.

pub mod attribution;
pub mod order;
pub mod touchpoint;

pub use attribution::AttributionRepository;
pub use order::{OrderFilter, OrderRepository};
pub use touchpoint::TouchpointRepository;

/// Maximum number of bind parameters used for a single `IN (...)` filter.
pub(crate) const IN_CLAUSE_CHUNK: usize = 500;
