//! Batch execution engine.
//!
//! Runs transactions against a single connection, strictly in order:
//!
//! 1. validate the driver and URL,
//! 2. open the connection,
//! 3. probe it with `SELECT 1`,
//! 4. split each transaction into statements and execute them one by one.
//!
//! The first failure aborts the run. Statements that already ran are not
//! rolled back. Once opened, the connection is closed on every exit path; a
//! failed close is logged and never replaces the run's outcome.

use crate::db::connection::{Connector, DatabaseConnection};
use crate::error::{BatchError, BatchResult, DriverError};
use crate::models::{ConnectionCredentials, Transaction};
use crate::splitter::{self, Statements};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Query used to check that a freshly opened connection is usable.
pub const PROBE_QUERY: &str = "SELECT 1";
/// Value the probe query must return.
pub const PROBE_SENTINEL: i64 = 1;

/// Counts of what a successful run executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub transactions: usize,
    pub statements: usize,
}

/// Per-run state threaded through the execution steps.
struct RunContext {
    connection: Box<dyn DatabaseConnection>,
    summary: RunSummary,
}

/// Executes transactions through an injected [`Connector`].
pub struct BatchExecutor<C> {
    connector: C,
    statement_timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl<C: Connector> BatchExecutor<C> {
    /// Create an executor without statement timeout or external cancellation.
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            statement_timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Limit how long a single statement may run.
    pub fn with_statement_timeout(mut self, statement_timeout: Option<Duration>) -> Self {
        self.statement_timeout = statement_timeout;
        self
    }

    /// Stop the run at the next statement boundary once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Run all transactions in order on one connection.
    pub async fn run(
        &self,
        driver: &str,
        url: &str,
        transactions: &[Transaction],
        credentials: &ConnectionCredentials,
    ) -> BatchResult<RunSummary> {
        validate_target(driver, url)?;

        let connection = self
            .connector
            .open(driver, url, credentials)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to establish connection to database");
                BatchError::connection(
                    e.message,
                    "Check the driver, connection URL and credentials, and that the database server is reachable",
                )
            })?;

        let mut ctx = RunContext {
            connection,
            summary: RunSummary::default(),
        };
        let outcome = self.drive(&mut ctx, transactions).await;
        release(ctx.connection).await;

        match outcome {
            Ok(()) => {
                info!(
                    transactions = ctx.summary.transactions,
                    statements = ctx.summary.statements,
                    "All transactions executed successfully"
                );
                Ok(ctx.summary)
            }
            Err(e) => {
                error!(
                    kind = e.kind(),
                    statements_executed = ctx.summary.statements,
                    error = %e,
                    "Batch aborted"
                );
                Err(e)
            }
        }
    }

    async fn drive(&self, ctx: &mut RunContext, transactions: &[Transaction]) -> BatchResult<()> {
        probe(ctx.connection.as_mut()).await?;

        for (index, transaction) in transactions.iter().enumerate() {
            self.check_cancelled(ctx)?;
            info!(
                transaction = %transaction,
                position = index + 1,
                total = transactions.len(),
                "Processing transaction"
            );
            self.process_transaction(ctx, transaction).await?;
            ctx.summary.transactions += 1;
        }

        Ok(())
    }

    /// Execute every statement of one transaction.
    ///
    /// An empty or whitespace-only inline query is skipped with a warning
    /// instead of failing the run; a script file that splits into no
    /// statements likewise succeeds without executing anything.
    async fn process_transaction(
        &self,
        ctx: &mut RunContext,
        transaction: &Transaction,
    ) -> BatchResult<()> {
        match transaction {
            Transaction::Inline(sql) => {
                if sql.trim().is_empty() {
                    warn!("Inline query is empty - skipping");
                    return Ok(());
                }
                self.execute_statements(ctx, transaction, splitter::split(sql.as_bytes()))
                    .await
            }
            Transaction::ScriptFile(path) => {
                let file = File::open(path).map_err(|e| {
                    error!(path = %path.display(), error = %e, "Configured sql file could not be opened");
                    BatchError::unreadable(path.clone(), e)
                })?;
                self.execute_statements(ctx, transaction, splitter::split(BufReader::new(file)))
                    .await
            }
        }
    }

    async fn execute_statements<R: BufRead>(
        &self,
        ctx: &mut RunContext,
        transaction: &Transaction,
        statements: Statements<R>,
    ) -> BatchResult<()> {
        for (index, statement) in statements.enumerate() {
            let number = index + 1;
            let statement = statement.map_err(|e| {
                error!(transaction = %transaction, error = %e, "Failed to read sql source");
                BatchError::unreadable(source_path(transaction), e)
            })?;

            self.check_cancelled(ctx)?;

            debug!(
                transaction = %transaction,
                statement = number,
                sql = %statement,
                "Executing statement"
            );

            if let Err(e) = self.execute_one(ctx.connection.as_mut(), &statement).await {
                error!(
                    transaction = %transaction,
                    statement = number,
                    sql_state = ?e.sql_state,
                    error = %e,
                    "Failed to execute sql"
                );
                return Err(BatchError::execution(transaction.label(), number, e));
            }
            ctx.summary.statements += 1;
        }

        Ok(())
    }

    async fn execute_one(
        &self,
        connection: &mut dyn DatabaseConnection,
        sql: &str,
    ) -> Result<(), DriverError> {
        match self.statement_timeout {
            Some(limit) => match timeout(limit, connection.execute(sql)).await {
                Ok(result) => result,
                Err(_) => Err(DriverError::new(format!(
                    "Statement timed out after {}s",
                    limit.as_secs()
                ))),
            },
            None => connection.execute(sql).await,
        }
    }

    fn check_cancelled(&self, ctx: &RunContext) -> BatchResult<()> {
        if self.cancel.is_cancelled() {
            warn!(
                statements_executed = ctx.summary.statements,
                "Cancellation requested, stopping before next statement"
            );
            return Err(BatchError::cancelled(ctx.summary.statements));
        }
        Ok(())
    }
}

/// Reject an empty driver or URL before any connection attempt.
pub fn validate_target(driver: &str, url: &str) -> BatchResult<()> {
    if driver.trim().is_empty() {
        return Err(BatchError::configuration("Missing required parameter driver"));
    }
    if url.trim().is_empty() {
        return Err(BatchError::configuration("Missing required parameter url"));
    }
    Ok(())
}

async fn probe(connection: &mut dyn DatabaseConnection) -> BatchResult<()> {
    match connection.query_scalar(PROBE_QUERY).await {
        Ok(Some(PROBE_SENTINEL)) => {
            info!("Connection to database was successful");
            Ok(())
        }
        Ok(other) => {
            error!(returned = ?other, "Testing database connection returned error");
            Err(BatchError::probe(format!(
                "'{}' returned {:?}, expected {}",
                PROBE_QUERY, other, PROBE_SENTINEL
            )))
        }
        Err(e) => {
            error!(error = %e, "Testing database connection failed");
            Err(BatchError::probe(e.message))
        }
    }
}

async fn release(connection: Box<dyn DatabaseConnection>) {
    match connection.close().await {
        Ok(()) => debug!("Connection closed"),
        Err(e) => warn!(error = %e, "Failed to close connection"),
    }
}

fn source_path(transaction: &Transaction) -> PathBuf {
    match transaction {
        Transaction::Inline(_) => PathBuf::from("<inline query>"),
        Transaction::ScriptFile(path) => path.clone(),
    }
}
