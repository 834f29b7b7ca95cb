//! Database connection capability.
//!
//! The executor never talks to a driver directly. It is handed a
//! [`Connector`] that opens a single [`DatabaseConnection`], which keeps the
//! executor testable with in-memory fakes and free of any global driver
//! registry.

use crate::error::DriverError;
use crate::models::ConnectionCredentials;
use async_trait::async_trait;

/// An open connection, exclusively owned by one run.
#[async_trait]
pub trait DatabaseConnection: Send {
    /// Execute one statement, discarding any result rows.
    async fn execute(&mut self, sql: &str) -> Result<(), DriverError>;

    /// Run a query and return the first column of its first row as an integer,
    /// or `None` when the query returned no rows.
    async fn query_scalar(&mut self, sql: &str) -> Result<Option<i64>, DriverError>;

    /// Close the connection.
    async fn close(self: Box<Self>) -> Result<(), DriverError>;
}

/// Factory for database connections.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection for `driver` at `url` with the given credentials.
    async fn open(
        &self,
        driver: &str,
        url: &str,
        credentials: &ConnectionCredentials,
    ) -> Result<Box<dyn DatabaseConnection>, DriverError>;
}
