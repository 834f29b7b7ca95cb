//! sql-batch library
//!
//! Executes SQL statements from an inline query and/or script files against a
//! database, in order, on a single connection, stopping at the first failure.

pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod models;
pub mod run;
pub mod settings;
pub mod splitter;

pub use config::{Config, RunConfig};
pub use error::{BatchError, BatchResult};
pub use models::{ConnectionCredentials, Transaction};
