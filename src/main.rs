//! sql-batch - Main entry point.
//!
//! Executes SQL statements from an inline query and/or script files against a
//! database as one step of a build or deploy pipeline. Exits non-zero on the
//! first failure.

use sql_batch::config::Config;
use sql_batch::db::SqlxConnector;
use sql_batch::settings::ServerSettings;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Parse configuration from command line and environment
    let config = Config::parse_args();

    init_tracing(&config);

    info!("Starting sql-batch v{}", env!("CARGO_PKG_VERSION"));

    let settings = match ServerSettings::load_from_file(&config.settings_path()) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Failed to load settings");
            return e.exit_code();
        }
    };

    let cancel = CancellationToken::new();
    let run_config = config.to_run_config();
    let connector = SqlxConnector::new(config.connect_timeout_duration());
    let batch = sql_batch::run::run(&run_config, connector, &settings, cancel.clone());

    // First Ctrl-C stops at the next statement boundary, the second aborts.
    match sql_batch::run::until_interrupted(batch, cancel, ctrl_c).await {
        Ok(summary) => {
            info!(
                transactions = summary.transactions,
                statements = summary.statements,
                "sql-batch finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            match e.suggestion() {
                Some(suggestion) => error!(kind = e.kind(), suggestion, "{}", e),
                None => error!(kind = e.kind(), "{}", e),
            }
            e.exit_code()
        }
    }
}
