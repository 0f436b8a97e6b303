//! Server and document-store configuration files.

use crate::Result;
use crate::error::{AdminError, redact_database_url};
use crate::models::ExclusionSet;
use crate::security::Credentials;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3306
}

fn default_connect_timeout() -> u64 {
    30
}

fn read_config_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| AdminError::io(format!("Failed to read {}", path.display()), e))
}

/// MySQL server connection settings.
///
/// # Example
/// ```rust
/// use dbadmin_core::config::ServerConfig;
///
/// let config: ServerConfig = toml::from_str(r#"
///     name = "db01"
///     host = "10.0.0.5"
///     user = "maint"
///     password = "secret"
/// "#).unwrap();
///
/// assert_eq!(config.port, 3306);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Deserialize)]
pub struct ServerConfig {
    /// Display name copied into every result document
    pub name: String,
    /// Server host, `localhost` by default
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port, 3306 by default
    #[serde(default = "default_port")]
    pub port: u16,
    /// Login name
    pub user: String,
    /// Optional; `--ask-password` prompts instead
    #[serde(default)]
    pub password: Option<String>,
    /// Unix socket path, preferred over host/port when set
    #[serde(default)]
    pub socket: Option<PathBuf>,
    /// Replaces the default system database exclusions
    #[serde(default)]
    pub sys_dbs: Option<Vec<String>>,
    /// Seconds to wait for the connection, 30 by default
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("socket", &self.socket)
            .field("sys_dbs", &self.sys_dbs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish_non_exhaustive()
    }
}

impl ServerConfig {
    /// Loads and validates a server configuration file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// fails [`ServerConfig::validate`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = read_config_file(path)?;
        let config: Self = toml::from_str(&text).map_err(|e| {
            AdminError::configuration(format!("Invalid server config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AdminError::configuration("name cannot be empty"));
        }
        if self.socket.is_none() && self.host.trim().is_empty() {
            return Err(AdminError::configuration(
                "host cannot be empty when no socket is configured",
            ));
        }
        if self.port == 0 {
            return Err(AdminError::configuration("port must be greater than 0"));
        }
        if self.user.is_empty() {
            return Err(AdminError::configuration("user cannot be empty"));
        }
        if self.connect_timeout_secs == 0 {
            return Err(AdminError::configuration(
                "connect_timeout_secs must be greater than 0",
            ));
        }
        if let Some(sys_dbs) = &self.sys_dbs
            && sys_dbs.iter().any(|db| db.trim().is_empty())
        {
            return Err(AdminError::configuration(
                "sys_dbs cannot contain empty names",
            ));
        }
        Ok(())
    }

    /// System databases to skip, honoring the `sys_dbs` override.
    pub fn exclusions(&self) -> ExclusionSet {
        match &self.sys_dbs {
            Some(names) => ExclusionSet::new(names.iter().cloned()),
            None => ExclusionSet::default(),
        }
    }

    /// Moves the login into a zeroizing container.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.user.clone(), self.password.clone())
    }

    /// Connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Document store (MongoDB) connection settings.
#[derive(Clone, Deserialize)]
pub struct StoreConfig {
    /// `mongodb://` or `mongodb+srv://` connection string
    pub url: String,
    /// Application name reported to the server
    #[serde(default)]
    pub app_name: Option<String>,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &redact_database_url(&self.url))
            .field("app_name", &self.app_name)
            .finish()
    }
}

impl StoreConfig {
    /// Loads and validates a store configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = read_config_file(path)?;
        let config: Self = toml::from_str(&text).map_err(|e| {
            AdminError::configuration(format!("Invalid store config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the url parses and uses a MongoDB scheme.
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.url).map_err(|e| {
            AdminError::configuration(format!(
                "Invalid store url {}: {}",
                redact_database_url(&self.url),
                e
            ))
        })?;
        match parsed.scheme() {
            "mongodb" | "mongodb+srv" => Ok(()),
            other => Err(AdminError::configuration(format!(
                "Unsupported store url scheme '{}': expected mongodb:// or mongodb+srv://",
                other
            ))),
        }
    }
}
