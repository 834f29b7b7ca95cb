//! Error types for sql-batch.
//!
//! Every failure the batch can hit is fatal to the run, so this module only
//! needs to describe *what* went wrong and map it to a process exit status.
//! Errors reported by the database driver are first normalized into a
//! [`DriverError`] and then wrapped into the [`BatchError`] kind matching the
//! step that failed (connect, probe or execute).

use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

/// Driver-level failure, independent of the step that triggered it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DriverError {
    pub message: String,
    /// e.g., "42P01" for undefined table
    pub sql_state: Option<String>,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sql_state: None,
        }
    }

    pub fn with_sql_state(message: impl Into<String>, sql_state: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sql_state: Some(sql_state.into()),
        }
    }
}

/// Convert sqlx errors to DriverError.
impl From<sqlx::Error> for DriverError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DriverError {
                    message: db_err.message().to_string(),
                    sql_state: code,
                }
            }
            sqlx::Error::Configuration(msg) => {
                DriverError::new(format!("Invalid connection configuration: {}", msg))
            }
            sqlx::Error::Io(io_err) => DriverError::new(format!("I/O error: {}", io_err)),
            sqlx::Error::Tls(tls_err) => DriverError::new(format!("TLS error: {}", tls_err)),
            sqlx::Error::Protocol(msg) => DriverError::new(format!("Protocol error: {}", msg)),
            sqlx::Error::RowNotFound => DriverError::new("No rows returned"),
            sqlx::Error::ColumnDecode { index, source } => {
                DriverError::new(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DriverError::new(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DriverError::new("Database worker crashed"),
            _ => DriverError::new(format!("Unknown database error: {}", err)),
        }
    }
}

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Failed to establish connection to database: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Testing database connection failed: {message}")]
    Probe { message: String },

    #[error("Configured sql source {} could not be read: {source}", path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to execute sql ({transaction}, statement {statement}): {message}")]
    Execution {
        /// Label of the transaction the statement came from.
        transaction: String,
        /// 1-based position of the statement within its transaction.
        statement: usize,
        message: String,
        sql_state: Option<String>,
    },

    #[error("Run cancelled after {completed} statement(s)")]
    Cancelled { completed: usize },

    /// The run was abandoned without waiting for the statement in flight.
    #[error("Run interrupted while waiting on the database")]
    Interrupted,
}

impl BatchError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a probe error.
    pub fn probe(message: impl Into<String>) -> Self {
        Self::Probe {
            message: message.into(),
        }
    }

    /// Create a source error for an unreadable script.
    pub fn unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Source {
            path: path.into(),
            source,
        }
    }

    /// Wrap a driver failure raised while executing a statement.
    pub fn execution(transaction: impl Into<String>, statement: usize, err: DriverError) -> Self {
        Self::Execution {
            transaction: transaction.into(),
            statement,
            message: err.message,
            sql_state: err.sql_state,
        }
    }

    /// Create a cancellation error.
    pub fn cancelled(completed: usize) -> Self {
        Self::Cancelled { completed }
    }

    /// Short, stable name of the error kind for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration",
            Self::Connection { .. } => "connection",
            Self::Probe { .. } => "probe",
            Self::Source { .. } => "source",
            Self::Execution { .. } => "execution",
            Self::Cancelled { .. } => "cancelled",
            Self::Interrupted => "interrupted",
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Process exit status reported for this error.
    pub fn exit_code(&self) -> ExitCode {
        let code: u8 = match self {
            Self::Configuration { .. } => 2,
            Self::Connection { .. } => 3,
            Self::Probe { .. } => 4,
            Self::Source { .. } => 5,
            Self::Execution { .. } => 6,
            Self::Cancelled { .. } | Self::Interrupted => 130,
        };
        ExitCode::from(code)
    }
}

/// Result type alias for batch operations.
pub type BatchResult<T> = Result<T, BatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BatchError::connection("refused", "Check the server");
        assert!(err.to_string().contains("Failed to establish connection"));
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn test_error_suggestion() {
        let err = BatchError::connection("refused", "Check the server");
        assert_eq!(err.suggestion(), Some("Check the server"));
        assert_eq!(BatchError::probe("bad").suggestion(), None);
    }

    #[test]
    fn test_execution_error_keeps_sql_state() {
        let err = BatchError::execution(
            "file schema.sql",
            3,
            DriverError::with_sql_state("relation \"users\" does not exist", "42P01"),
        );
        match &err {
            BatchError::Execution {
                statement,
                sql_state,
                ..
            } => {
                assert_eq!(*statement, 3);
                assert_eq!(sql_state.as_deref(), Some("42P01"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("file schema.sql"));
        assert!(err.to_string().contains("statement 3"));
    }

    #[test]
    fn test_source_error_names_path() {
        let err = BatchError::unreadable(
            "missing.sql",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert!(err.to_string().contains("missing.sql"));
        assert_eq!(err.kind(), "source");
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        let errors = [
            BatchError::configuration("x"),
            BatchError::connection("x", "y"),
            BatchError::probe("x"),
            BatchError::unreadable("f", std::io::Error::other("x")),
            BatchError::execution("t", 1, DriverError::new("x")),
            BatchError::cancelled(0),
        ];
        let codes: Vec<String> = errors
            .iter()
            .map(|e| format!("{:?}", e.exit_code()))
            .collect();
        for (i, a) in codes.iter().enumerate() {
            for b in codes.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
        assert_ne!(
            format!("{:?}", BatchError::probe("x").exit_code()),
            format!("{:?}", ExitCode::SUCCESS)
        );
    }

    #[test]
    fn test_interrupt_exits_like_cancellation() {
        assert_eq!(
            format!("{:?}", BatchError::Interrupted.exit_code()),
            format!("{:?}", BatchError::cancelled(3).exit_code())
        );
        assert_eq!(BatchError::Interrupted.kind(), "interrupted");
    }

    #[test]
    fn test_driver_error_from_sqlx() {
        let err: DriverError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.message, "No rows returned");
        assert!(err.sql_state.is_none());
    }
}
