//! Credential data models.

use serde::Deserialize;
use std::fmt;

/// Resolved username/password pair used to open the connection.
///
/// `user` is never empty. `password` may be empty for password-less accounts.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionCredentials {
    pub user: String,
    /// Contains sensitive data - never log
    pub password: String,
}

impl ConnectionCredentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }
}

impl fmt::Debug for ConnectionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionCredentials")
            .field("user", &self.user)
            .field("password", &if self.has_password() { "***" } else { "" })
            .finish()
    }
}

/// A server entry from the credential store.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ServerEntry {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl ServerEntry {
    pub fn new(
        id: impl Into<String>,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.map(String::from),
            password: password.map(String::from),
        }
    }
}

impl fmt::Debug for ServerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerEntry")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}
