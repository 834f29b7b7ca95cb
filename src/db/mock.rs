//! In-memory connector for testing.
//!
//! Records every statement it is asked to execute and can be told to fail at
//! any step, so executor behavior can be checked without a database server.

use crate::db::connection::{Connector, DatabaseConnection};
use crate::error::DriverError;
use crate::models::ConnectionCredentials;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct MockState {
    opened: usize,
    closed: usize,
    executed: Vec<String>,
    probes: Vec<String>,
    credentials: Option<ConnectionCredentials>,
}

#[derive(Debug, Clone)]
struct MockBehavior {
    open_error: Option<String>,
    probe_result: Result<Option<i64>, String>,
    close_error: Option<String>,
    failing_statements: Vec<String>,
    hanging_statements: Vec<String>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            open_error: None,
            probe_result: Ok(Some(1)),
            close_error: None,
            failing_statements: Vec::new(),
            hanging_statements: Vec::new(),
            cancel_after: None,
        }
    }
}

/// A connector whose connections only record what they are asked to do.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
    behavior: MockBehavior,
}

impl MockConnector {
    /// Creates a connector whose connections accept everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `open` fail with the given message.
    pub fn fail_open(mut self, message: impl Into<String>) -> Self {
        self.behavior.open_error = Some(message.into());
        self
    }

    /// Value returned by scalar queries (the connectivity probe).
    pub fn with_probe_result(mut self, value: Option<i64>) -> Self {
        self.behavior.probe_result = Ok(value);
        self
    }

    /// Make scalar queries fail with the given message.
    pub fn fail_probe(mut self, message: impl Into<String>) -> Self {
        self.behavior.probe_result = Err(message.into());
        self
    }

    /// Make `close` fail with the given message.
    pub fn fail_close(mut self, message: impl Into<String>) -> Self {
        self.behavior.close_error = Some(message.into());
        self
    }

    /// Make executing exactly this statement fail. It is still recorded.
    pub fn fail_on(mut self, statement: impl Into<String>) -> Self {
        self.behavior.failing_statements.push(statement.into());
        self
    }

    /// Make executing exactly this statement never complete, like a
    /// statement stuck on a lock. It is still recorded.
    pub fn hang_on(mut self, statement: impl Into<String>) -> Self {
        self.behavior.hanging_statements.push(statement.into());
        self
    }

    /// Cancel `token` once `count` statements have executed.
    pub fn cancel_after(mut self, count: usize, token: CancellationToken) -> Self {
        self.behavior.cancel_after = Some((count, token));
        self
    }

    /// Statements executed so far, in order, across all connections.
    pub fn executed(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    /// Scalar queries issued so far.
    pub fn probes(&self) -> Vec<String> {
        self.lock().probes.clone()
    }

    pub fn open_count(&self) -> usize {
        self.lock().opened
    }

    pub fn close_count(&self) -> usize {
        self.lock().closed
    }

    /// Credentials passed to the last successful `open`.
    pub fn last_credentials(&self) -> Option<ConnectionCredentials> {
        self.lock().credentials.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        lock_state(&self.state)
    }
}

fn lock_state(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(
        &self,
        _driver: &str,
        _url: &str,
        credentials: &ConnectionCredentials,
    ) -> Result<Box<dyn DatabaseConnection>, DriverError> {
        if let Some(message) = &self.behavior.open_error {
            return Err(DriverError::new(message.clone()));
        }

        let mut state = self.lock();
        state.opened += 1;
        state.credentials = Some(credentials.clone());

        Ok(Box::new(MockConnection {
            state: Arc::clone(&self.state),
            behavior: self.behavior.clone(),
        }))
    }
}

struct MockConnection {
    state: Arc<Mutex<MockState>>,
    behavior: MockBehavior,
}

#[async_trait]
impl DatabaseConnection for MockConnection {
    async fn execute(&mut self, sql: &str) -> Result<(), DriverError> {
        let executed = {
            let mut state = lock_state(&self.state);
            state.executed.push(sql.to_string());
            state.executed.len()
        };

        if let Some((count, token)) = &self.behavior.cancel_after {
            if executed >= *count {
                token.cancel();
            }
        }

        if self.behavior.hanging_statements.iter().any(|s| s == sql) {
            std::future::pending::<()>().await;
        }

        if self.behavior.failing_statements.iter().any(|s| s == sql) {
            return Err(DriverError::with_sql_state(
                format!("mock failure for: {}", sql),
                "42000",
            ));
        }
        Ok(())
    }

    async fn query_scalar(&mut self, sql: &str) -> Result<Option<i64>, DriverError> {
        lock_state(&self.state).probes.push(sql.to_string());
        self.behavior
            .probe_result
            .clone()
            .map_err(DriverError::new)
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        lock_state(&self.state).closed += 1;
        match &self.behavior.close_error {
            Some(message) => Err(DriverError::new(message.clone())),
            None => Ok(()),
        }
    }
}
