//! Credential resolution for the database connection.
//!
//! Credentials come from two places, in order of precedence:
//!
//! 1. a server entry in the credential store, selected with `--server`;
//! 2. the `--user` / `--password` values given directly.
//!
//! An explicitly referenced server entry is authoritative: if it exists, its
//! values are used even when they are incomplete. A missing username there is
//! a configuration error; a missing password is accepted with a warning.

use crate::error::{BatchError, BatchResult};
use crate::models::{ConnectionCredentials, ServerEntry};
use tracing::{debug, warn};

/// Lookup of credential store entries by server id.
pub trait CredentialStore {
    fn lookup(&self, server_id: &str) -> Option<ServerEntry>;
}

impl<F> CredentialStore for F
where
    F: Fn(&str) -> Option<ServerEntry>,
{
    fn lookup(&self, server_id: &str) -> Option<ServerEntry> {
        self(server_id)
    }
}

/// Credential values supplied directly in the configuration.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialInputs {
    pub user: Option<String>,
    pub password: Option<String>,
    pub server: Option<String>,
}

impl std::fmt::Debug for CredentialInputs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialInputs")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("server", &self.server)
            .finish()
    }
}

/// Resolve the credentials to connect with.
pub fn resolve<S>(inputs: &CredentialInputs, store: &S) -> BatchResult<ConnectionCredentials>
where
    S: CredentialStore + ?Sized,
{
    let server_id = non_empty(inputs.server.as_deref());

    let from_store = match server_id {
        Some(id) => match store.lookup(id) {
            Some(entry) => Some(credentials_from_entry(id, entry)?),
            None => {
                debug!(
                    server = %id,
                    "No credential store entry for server, falling back to direct configuration"
                );
                None
            }
        },
        None => None,
    };

    if let Some(credentials) = from_store {
        return Ok(credentials);
    }

    let user = non_empty(inputs.user.as_deref()).ok_or_else(|| {
        BatchError::configuration("missing user: set --user or reference a server entry")
    })?;

    let password = match inputs.password.as_deref() {
        Some(password) => password,
        None => {
            warn!("No password set. Using empty password for connection");
            ""
        }
    };

    Ok(ConnectionCredentials::new(user, password))
}

fn credentials_from_entry(id: &str, entry: ServerEntry) -> BatchResult<ConnectionCredentials> {
    let user = match non_empty(entry.username.as_deref()) {
        Some(user) => user.to_string(),
        None => {
            return Err(BatchError::configuration(format!(
                "found server entry '{}' but its username is missing or empty",
                id
            )));
        }
    };

    let password = entry.password.unwrap_or_default();
    if password.is_empty() {
        warn!(
            server = %id,
            "Found server entry but its password is missing or empty"
        );
    }

    debug!(server = %id, user = %user, "Using credentials from credential store");
    Ok(ConnectionCredentials::new(user, password))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    /// Collects formatted log lines emitted while a closure runs.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn with_captured_warnings<T>(f: impl FnOnce() -> T) -> (T, String) {
        let buffer = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(buffer.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();
        let result = tracing::subscriber::with_default(subscriber, f);
        let logs = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        (result, logs)
    }

    fn inputs(user: Option<&str>, password: Option<&str>, server: Option<&str>) -> CredentialInputs {
        CredentialInputs {
            user: user.map(String::from),
            password: password.map(String::from),
            server: server.map(String::from),
        }
    }

    fn no_store(_: &str) -> Option<ServerEntry> {
        None
    }

    #[test]
    fn test_direct_credentials() {
        let creds = resolve(&inputs(Some("alice"), Some("pw"), None), &no_store).unwrap();
        assert_eq!(creds, ConnectionCredentials::new("alice", "pw"));
    }

    #[test]
    fn test_server_entry_takes_precedence() {
        let store = |id: &str| {
            (id == "prod").then(|| ServerEntry::new("prod", Some("svcacct"), Some("secret")))
        };
        let creds = resolve(&inputs(Some("alice"), Some("pw"), Some("prod")), &store).unwrap();
        assert_eq!(creds, ConnectionCredentials::new("svcacct", "secret"));
    }

    #[test]
    fn test_server_entry_without_password_does_not_fall_back() {
        let store = |_: &str| Some(ServerEntry::new("prod", Some("svcacct"), None));
        let creds = resolve(&inputs(Some("alice"), Some("pw"), Some("prod")), &store).unwrap();
        assert_eq!(creds, ConnectionCredentials::new("svcacct", ""));
    }

    #[test]
    fn test_server_entry_with_empty_username_is_fatal() {
        let store = |_: &str| Some(ServerEntry::new("prod", Some(""), Some("secret")));
        let err = resolve(&inputs(Some("alice"), Some("pw"), Some("prod")), &store).unwrap_err();
        assert!(matches!(err, BatchError::Configuration { .. }));
        assert!(err.to_string().contains("prod"));

        let store = |_: &str| Some(ServerEntry::new("prod", None, Some("secret")));
        let err = resolve(&inputs(Some("alice"), None, Some("prod")), &store).unwrap_err();
        assert!(matches!(err, BatchError::Configuration { .. }));
    }

    #[test]
    fn test_unknown_server_falls_back_to_direct() {
        let creds = resolve(&inputs(Some("alice"), Some("pw"), Some("nope")), &no_store).unwrap();
        assert_eq!(creds, ConnectionCredentials::new("alice", "pw"));
    }

    #[test]
    fn test_missing_user_is_fatal() {
        let err = resolve(&inputs(None, Some("pw"), None), &no_store).unwrap_err();
        assert!(matches!(err, BatchError::Configuration { .. }));
        assert!(err.to_string().contains("missing user"));

        let err = resolve(&inputs(Some(""), Some("pw"), None), &no_store).unwrap_err();
        assert!(matches!(err, BatchError::Configuration { .. }));
    }

    #[test]
    fn test_missing_password_defaults_to_empty() {
        let creds = resolve(&inputs(Some("alice"), None, None), &no_store).unwrap();
        assert_eq!(creds.password, "");
    }

    #[test]
    fn test_empty_server_id_is_ignored() {
        let store = |_: &str| -> Option<ServerEntry> { panic!("lookup must not be called") };
        let creds = resolve(&inputs(Some("alice"), Some("pw"), Some("")), &store).unwrap();
        assert_eq!(creds.user, "alice");
    }

    #[test]
    fn test_server_entry_without_password_warns() {
        let store = |_: &str| Some(ServerEntry::new("prod", Some("svcacct"), None));
        let (creds, logs) = with_captured_warnings(|| {
            resolve(&inputs(Some("alice"), Some("pw"), Some("prod")), &store).unwrap()
        });

        assert_eq!(creds, ConnectionCredentials::new("svcacct", ""));
        assert!(logs.contains("WARN"), "logs: {logs}");
        assert!(logs.contains("password is missing or empty"), "logs: {logs}");
        assert!(logs.contains("prod"), "logs: {logs}");
    }

    #[test]
    fn test_missing_direct_password_warns() {
        let (creds, logs) =
            with_captured_warnings(|| resolve(&inputs(Some("alice"), None, None), &no_store).unwrap());

        assert_eq!(creds, ConnectionCredentials::new("alice", ""));
        assert!(logs.contains("WARN"), "logs: {logs}");
        assert!(logs.contains("Using empty password"), "logs: {logs}");
    }

    #[test]
    fn test_complete_credentials_do_not_warn() {
        let store = |_: &str| Some(ServerEntry::new("prod", Some("svcacct"), Some("secret")));
        let (_, logs) = with_captured_warnings(|| {
            resolve(&inputs(None, None, Some("prod")), &store).unwrap();
            resolve(&inputs(Some("alice"), Some("pw"), None), &no_store).unwrap();
        });

        assert!(logs.is_empty(), "logs: {logs}");
    }
}
