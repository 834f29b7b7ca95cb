//! Configuration handling for sql-batch.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use crate::credentials::CredentialInputs;
use crate::models::Transaction;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration for a batch run.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sql-batch",
    about = "Execute SQL scripts and inline queries against a database",
    version,
    author
)]
pub struct Config {
    /// Database driver: postgres, mysql (or mariadb), sqlite
    #[arg(long, env = "SQL_BATCH_DRIVER")]
    pub driver: String,

    /// Connection URL, e.g. postgres://localhost:5432/app or sqlite:app.db
    #[arg(long, env = "SQL_BATCH_URL")]
    pub url: String,

    /// Database user. Overridden by a matching --server entry.
    #[arg(long, env = "SQL_BATCH_USER")]
    pub user: Option<String>,

    /// Database password. Overridden by a matching --server entry.
    #[arg(long, env = "SQL_BATCH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Id of a server entry in the settings file holding the credentials.
    /// This is the preferred way of storing credentials.
    #[arg(long, env = "SQL_BATCH_SERVER")]
    pub server: Option<String>,

    /// Settings file with server entries (default: <config dir>/sql-batch/servers.toml)
    #[arg(long, value_name = "PATH", env = "SQL_BATCH_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// SQL to execute. May hold several statements, each ending in ";" at end of line.
    #[arg(short = 'q', long = "query", value_name = "SQL", env = "SQL_BATCH_QUERY")]
    pub query: Option<String>,

    /// SQL script files, executed in the given order after --query.
    /// Can be specified multiple times or as comma-separated values.
    #[arg(
        short = 'f',
        long = "file",
        value_name = "PATH",
        env = "SQL_BATCH_FILES",
        value_delimiter = ','
    )]
    pub files: Vec<PathBuf>,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "SQL_BATCH_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,

    /// Per-statement timeout in seconds (no limit when unset)
    #[arg(long, env = "SQL_BATCH_STATEMENT_TIMEOUT")]
    pub statement_timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = DEFAULT_LOG_LEVEL, env = "SQL_BATCH_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "SQL_BATCH_JSON_LOGS")]
    pub json_logs: bool,
}

/// Everything a run needs, detached from the CLI surface.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub driver: String,
    pub url: String,
    pub credentials: CredentialInputs,
    pub transactions: Vec<Transaction>,
    pub statement_timeout: Option<Duration>,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Path of the settings file to read server entries from.
    pub fn settings_path(&self) -> PathBuf {
        self.settings
            .clone()
            .unwrap_or_else(crate::settings::ServerSettings::default_path)
    }

    /// Get the connection timeout as a Duration.
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Get the statement timeout as a Duration, if one is set.
    pub fn statement_timeout_duration(&self) -> Option<Duration> {
        self.statement_timeout.map(Duration::from_secs)
    }

    /// Build the run input. The inline query comes first, then the files.
    pub fn to_run_config(&self) -> RunConfig {
        RunConfig {
            driver: self.driver.clone(),
            url: self.url.clone(),
            credentials: CredentialInputs {
                user: self.user.clone(),
                password: self.password.clone(),
                server: self.server.clone(),
            },
            transactions: Transaction::collect(self.query.as_deref(), self.files.iter().cloned()),
            statement_timeout: self.statement_timeout_duration(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["sql-batch"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_minimal_config() {
        let config = parse(&["--driver", "postgres", "--url", "postgres://localhost/app"]);
        assert_eq!(config.driver, "postgres");
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT_SECS);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert!(config.statement_timeout.is_none());
        assert!(config.to_run_config().transactions.is_empty());
    }

    #[test]
    fn test_driver_and_url_are_required() {
        let result = Config::try_parse_from(["sql-batch", "--url", "postgres://localhost/app"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_files_repeated_and_comma_separated() {
        let config = parse(&[
            "--driver", "mysql", "--url", "mysql://h/db", "-f", "a.sql,b.sql", "--file", "c.sql",
        ]);
        assert_eq!(
            config.files,
            vec![
                PathBuf::from("a.sql"),
                PathBuf::from("b.sql"),
                PathBuf::from("c.sql")
            ]
        );
    }

    #[test]
    fn test_run_config_orders_query_before_files() {
        let config = parse(&[
            "--driver", "sqlite", "--url", "sqlite::memory:", "-f", "b.sql", "-q", "SELECT 1;",
            "-f", "a.sql",
        ]);
        let run = config.to_run_config();
        assert_eq!(
            run.transactions,
            vec![
                Transaction::Inline("SELECT 1;".to_string()),
                Transaction::ScriptFile(PathBuf::from("b.sql")),
                Transaction::ScriptFile(PathBuf::from("a.sql")),
            ]
        );
    }

    #[test]
    fn test_credentials_carried_over() {
        let config = parse(&[
            "--driver", "postgres", "--url", "postgres://h/db", "--user", "alice", "--password",
            "pw", "--server", "prod",
        ]);
        let run = config.to_run_config();
        assert_eq!(run.credentials.user.as_deref(), Some("alice"));
        assert_eq!(run.credentials.password.as_deref(), Some("pw"));
        assert_eq!(run.credentials.server.as_deref(), Some("prod"));
    }

    #[test]
    fn test_timeout_durations() {
        let config = parse(&[
            "--driver", "postgres", "--url", "postgres://h/db", "--connect-timeout", "15",
            "--statement-timeout", "120",
        ]);
        assert_eq!(config.connect_timeout_duration(), Duration::from_secs(15));
        assert_eq!(
            config.statement_timeout_duration(),
            Some(Duration::from_secs(120))
        );
    }

    #[test]
    fn test_explicit_settings_path() {
        let config = parse(&[
            "--driver", "postgres", "--url", "postgres://h/db", "--settings", "/etc/servers.toml",
        ]);
        assert_eq!(config.settings_path(), PathBuf::from("/etc/servers.toml"));
    }
}
