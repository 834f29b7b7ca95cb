//! End-to-end run: validate, resolve credentials, execute.

use crate::config::RunConfig;
use crate::credentials::{self, CredentialStore};
use crate::db::connection::Connector;
use crate::db::executor::{self, BatchExecutor, RunSummary};
use crate::error::{BatchError, BatchResult};
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Execute a configured batch.
///
/// Configuration problems, including unusable credentials, are reported
/// before any connection is attempted.
pub async fn run<C, S>(
    config: &RunConfig,
    connector: C,
    store: &S,
    cancel: CancellationToken,
) -> BatchResult<RunSummary>
where
    C: Connector,
    S: CredentialStore + ?Sized,
{
    executor::validate_target(&config.driver, &config.url)?;
    let credentials = credentials::resolve(&config.credentials, store)?;

    info!(
        driver = %config.driver,
        transactions = config.transactions.len(),
        "Starting sql batch"
    );

    BatchExecutor::new(connector)
        .with_statement_timeout(config.statement_timeout)
        .with_cancellation(cancel)
        .run(
            &config.driver,
            &config.url,
            &config.transactions,
            &credentials,
        )
        .await
}

/// Drive `run` while listening for interrupts.
///
/// The first interrupt cancels `cancel`, so the run stops at the next
/// statement boundary and closes its connection. A second interrupt abandons
/// the run even if a statement (or the connectivity probe) is still waiting
/// on the database; dropping the run drops its connection, which closes the
/// socket without a goodbye to the server.
pub async fn until_interrupted<F, I, Fut>(
    run: F,
    cancel: CancellationToken,
    mut interrupt: I,
) -> BatchResult<RunSummary>
where
    F: Future<Output = BatchResult<RunSummary>>,
    I: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => return result,
        () = interrupt() => {
            warn!("Interrupt received, stopping after the current statement. Interrupt again to abort");
            cancel.cancel();
        }
    }

    tokio::select! {
        result = &mut run => result,
        () = interrupt() => {
            warn!("Second interrupt received, abandoning the statement in flight");
            Err(BatchError::Interrupted)
        }
    }
}
