//! Database abstraction layer.
//!
//! This module provides persistence for column classifications:
//! - The `ColumnStore` contract shared by all dialects
//! - Schema reconciliation (create, relax legacy constraints, add columns)
//! - PostgreSQL and Oracle adapters
//! - The router that picks an adapter per connection string

pub mod oracle;
pub mod postgres;
pub mod router;
pub mod schema;
pub mod store;

pub use oracle::OracleStore;
pub use postgres::PostgresStore;
pub use router::{BatchInsertReport, ConnectionReport, Operation, PersistenceRouter};
pub use store::{BatchAtomicity, ColumnStore, ReconcileReport, StoreSettings};
