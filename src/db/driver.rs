//! sqlx-backed database connections.
//!
//! Opens exactly one connection (not a pool) per run. PostgreSQL and MySQL
//! receive the resolved credentials through their connect options; SQLite has
//! no authentication and ignores them.

use crate::db::connection::{Connector, DatabaseConnection};
use crate::db::macros::DatabaseType;
use crate::error::DriverError;
use crate::impl_db_dispatch;
use crate::models::ConnectionCredentials;
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{Connection, Executor};
use std::str::FromStr;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

/// Database-specific connection.
#[derive(Debug)]
pub enum DbConnection {
    MySql(MySqlConnection),
    Postgres(PgConnection),
    SQLite(SqliteConnection),
}

#[async_trait]
impl DatabaseConnection for DbConnection {
    async fn execute(&mut self, sql: &str) -> Result<(), DriverError> {
        // Raw SQL, not a prepared statement: DDL and procedure bodies
        // are not always preparable.
        impl_db_dispatch!(self, {
            MySql(c) => c.execute(sql).await.map(|_| ())?,
            Postgres(c) => c.execute(sql).await.map(|_| ())?,
            SQLite(c) => c.execute(sql).await.map(|_| ())?,
        });
        Ok(())
    }

    async fn query_scalar(&mut self, sql: &str) -> Result<Option<i64>, DriverError> {
        let value = match self {
            // PostgreSQL types integer literals as INT4.
            DbConnection::Postgres(c) => sqlx::query_scalar::<_, i32>(sql)
                .fetch_optional(&mut *c)
                .await?
                .map(i64::from),
            DbConnection::MySql(c) => {
                sqlx::query_scalar::<_, i64>(sql)
                    .fetch_optional(&mut *c)
                    .await?
            }
            DbConnection::SQLite(c) => {
                sqlx::query_scalar::<_, i64>(sql)
                    .fetch_optional(&mut *c)
                    .await?
            }
        };
        Ok(value)
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        impl_db_dispatch!(*self, {
            MySql(c) => c.close().await?,
            Postgres(c) => c.close().await?,
            SQLite(c) => c.close().await?,
        });
        Ok(())
    }
}

/// Connector that opens sqlx connections.
#[derive(Debug, Clone)]
pub struct SqlxConnector {
    connect_timeout: Duration,
}

impl SqlxConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    async fn connect(
        &self,
        db_type: DatabaseType,
        url: &str,
        credentials: &ConnectionCredentials,
    ) -> Result<DbConnection, DriverError> {
        let connection = match db_type {
            DatabaseType::Postgres => {
                let options = PgConnectOptions::from_str(url)?
                    .username(&credentials.user)
                    .password(&credentials.password);
                DbConnection::Postgres(PgConnection::connect_with(&options).await?)
            }
            DatabaseType::MySql => {
                let options = MySqlConnectOptions::from_str(url)?
                    .username(&credentials.user)
                    .password(&credentials.password);
                DbConnection::MySql(MySqlConnection::connect_with(&options).await?)
            }
            DatabaseType::SQLite => {
                let options = SqliteConnectOptions::from_str(url)?;
                DbConnection::SQLite(SqliteConnection::connect_with(&options).await?)
            }
        };
        Ok(connection)
    }
}

impl Default for SqlxConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(crate::config::DEFAULT_CONNECT_TIMEOUT_SECS))
    }
}

#[async_trait]
impl Connector for SqlxConnector {
    async fn open(
        &self,
        driver: &str,
        url: &str,
        credentials: &ConnectionCredentials,
    ) -> Result<Box<dyn DatabaseConnection>, DriverError> {
        let db_type = DatabaseType::from_driver(driver)
            .ok_or_else(|| DriverError::new(format!("No suitable driver found for '{}'", driver)))?;

        info!(
            db_type = %db_type,
            url = %mask_url(url),
            user = %credentials.user,
            "Connecting to database"
        );
        if !db_type.uses_credentials() {
            debug!(db_type = %db_type, "Backend does not authenticate, ignoring credentials");
        }

        match timeout(self.connect_timeout, self.connect(db_type, url, credentials)).await {
            Ok(Ok(connection)) => Ok(Box::new(connection)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(DriverError::new(format!(
                "Connection attempt timed out after {}s",
                self.connect_timeout.as_secs()
            ))),
        }
    }
}

/// Get a display-safe version of a connection URL (password masked).
pub fn mask_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) if parsed.password().is_some() => {
            if parsed.set_password(Some("****")).is_ok() {
                parsed.to_string()
            } else {
                "<redacted>".to_string()
            }
        }
        Ok(_) => raw.to_string(),
        Err(_) => "<unparseable url>".to_string(),
    }
}
