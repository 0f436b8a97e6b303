//! MySQL connection setup.
//!
//! One pooled connection per invocation: every statement runs sequentially,
//! so a larger pool would only hold idle sessions open on the server.

use super::MySqlServer;
use crate::Result;
use crate::catalog::{ServerVersion, TableNameKey};
use crate::config::ServerConfig;
use crate::error::AdminError;
use crate::security::Credentials;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};

/// Builds driver options from the server file and the login.
pub(crate) fn connect_options(config: &ServerConfig, credentials: &Credentials) -> MySqlConnectOptions {
    let mut options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(credentials.username());

    if let Some(password) = credentials.password() {
        options = options.password(password);
    }
    if let Some(socket) = &config.socket {
        options = options.socket(socket);
    }
    options
}

/// Human-readable endpoint for logs and errors, without credentials.
pub(crate) fn endpoint(config: &ServerConfig) -> String {
    match &config.socket {
        Some(socket) => format!("{} ({})", config.name, socket.display()),
        None => format!("{} ({}:{})", config.name, config.host, config.port),
    }
}

impl MySqlServer {
    /// Connects to the server described by `config` and reads its version.
    ///
    /// # Errors
    /// Returns [`AdminError::Connection`] if the server is unreachable, the
    /// login is rejected, or `SELECT VERSION()` cannot be parsed.
    pub async fn connect(config: &ServerConfig, credentials: &Credentials) -> Result<Self> {
        let endpoint = endpoint(config);
        tracing::debug!("Connecting to {} as {}", endpoint, credentials.username());

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .min_connections(0)
            .acquire_timeout(config.connect_timeout())
            .connect_with(connect_options(config, credentials))
            .await
            .map_err(|e| AdminError::connection_failed(format!("Cannot connect to {}", endpoint), e))?;

        let raw_version: String = sqlx::query_scalar("SELECT VERSION()")
            .fetch_one(&pool)
            .await
            .map_err(|e| {
                AdminError::connection_failed(format!("Cannot read version of {}", endpoint), e)
            })?;
        let version = ServerVersion::parse(&raw_version)?;
        let key = TableNameKey::for_version(version);

        tracing::info!("Connected to {} (version {})", endpoint, version);

        Ok(Self {
            name: config.name.clone(),
            pool,
            version,
            key,
        })
    }
}
