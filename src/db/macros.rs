//! Database backend selection and dispatch.
//!
//! The `driver` setting names a backend; [`impl_db_dispatch!`] expands one
//! match arm per [`DbConnection`](crate::db::driver::DbConnection) variant so
//! that backend-specific code stays side by side.

use std::fmt;

/// Database backend type for dispatch operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    /// Includes MariaDB
    MySql,
    Postgres,
    SQLite,
}

impl DatabaseType {
    /// Parse a driver identifier such as `postgres` or `mysql`.
    pub fn from_driver(driver: &str) -> Option<Self> {
        match driver.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            "mysql" | "mariadb" => Some(Self::MySql),
            "sqlite" | "sqlite3" => Some(Self::SQLite),
            _ => None,
        }
    }

    /// Get the display name for this database type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MySql => "MySQL",
            Self::Postgres => "PostgreSQL",
            Self::SQLite => "SQLite",
        }
    }

    /// Whether the backend authenticates with a username and password.
    pub fn uses_credentials(&self) -> bool {
        !matches!(self, Self::SQLite)
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Macro for generating database dispatch match arms.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(conn, {
///     MySql(c) => do_mysql(c),
///     Postgres(c) => do_postgres(c),
///     SQLite(c) => do_sqlite(c),
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($conn:expr, { $($variant:ident($c:ident) => $body:expr),+ $(,)? }) => {
        match $conn {
            $(
                $crate::db::driver::DbConnection::$variant($c) => $body,
            )+
        }
    };
}

pub use impl_db_dispatch;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_driver() {
        assert_eq!(DatabaseType::from_driver("postgres"), Some(DatabaseType::Postgres));
        assert_eq!(DatabaseType::from_driver("PostgreSQL"), Some(DatabaseType::Postgres));
        assert_eq!(DatabaseType::from_driver("mariadb"), Some(DatabaseType::MySql));
        assert_eq!(DatabaseType::from_driver(" sqlite "), Some(DatabaseType::SQLite));
        assert_eq!(DatabaseType::from_driver("org.h2.Driver"), None);
        assert_eq!(DatabaseType::from_driver(""), None);
    }

    #[test]
    fn test_database_type_display() {
        assert_eq!(DatabaseType::MySql.to_string(), "MySQL");
        assert_eq!(DatabaseType::Postgres.to_string(), "PostgreSQL");
        assert_eq!(DatabaseType::SQLite.to_string(), "SQLite");
    }

    #[test]
    fn test_uses_credentials() {
        assert!(DatabaseType::Postgres.uses_credentials());
        assert!(!DatabaseType::SQLite.uses_credentials());
    }
}
