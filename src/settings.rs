//! Credential store file.
//!
//! Server credentials are kept out of build scripts in a TOML file, by default
//! `<config dir>/sql-batch/servers.toml`:
//!
//! ```toml
//! [[server]]
//! id = "staging-db"
//! username = "deploy"
//! password = "secret"
//! ```

use crate::credentials::CredentialStore;
use crate::error::{BatchError, BatchResult};
use crate::models::ServerEntry;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    server: Vec<ServerEntry>,
}

/// Server entries loaded from a settings file.
#[derive(Debug, Default)]
pub struct ServerSettings {
    servers: Vec<ServerEntry>,
}

impl ServerSettings {
    /// Returns the default settings file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sql-batch")
            .join("servers.toml")
    }

    /// Load server entries from a TOML file.
    ///
    /// A missing file is not an error and yields an empty store.
    pub fn load_from_file(path: &Path) -> BatchResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Settings file not found, no server entries loaded");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            BatchError::configuration(format!(
                "Failed to read settings file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::parse_toml(&content, path)
    }

    /// Parses server entries from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> BatchResult<Self> {
        let file: SettingsFile = toml::from_str(content).map_err(|e| {
            BatchError::configuration(format!(
                "Settings error in {}:\n  {}",
                path.display(),
                e
            ))
        })?;

        debug!(
            path = %path.display(),
            count = file.server.len(),
            "Loaded server entries"
        );
        Ok(Self {
            servers: file.server,
        })
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

impl CredentialStore for ServerSettings {
    /// First entry with a matching id wins.
    fn lookup(&self, server_id: &str) -> Option<ServerEntry> {
        self.servers.iter().find(|s| s.id == server_id).cloned()
    }
}
