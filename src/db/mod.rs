//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - The connection capability the executor depends on
//! - sqlx-backed connections for PostgreSQL, MySQL and SQLite
//! - Batch execution with connectivity probe
//! - An in-memory connector for tests
//! - Database dispatch macros for reducing code duplication

pub mod connection;
pub mod driver;
pub mod executor;
#[macro_use]
pub mod macros;
pub mod mock;

pub use connection::{Connector, DatabaseConnection};
pub use driver::{DbConnection, SqlxConnector};
pub use executor::{BatchExecutor, RunSummary};
pub use macros::DatabaseType;
pub use mock::MockConnector;
