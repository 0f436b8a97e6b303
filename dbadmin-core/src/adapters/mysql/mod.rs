//! MySQL server adapter.
//!
//! # Module Structure
//! - `connection`: connect options and the single-connection pool
//! - `maintenance`: CHECK/ANALYZE/OPTIMIZE/CHECKSUM statements and health
//!   queries
//!
//! Catalog queries read `information_schema` with the version-dependent
//! [`TableNameKey`] selected at connect time.

mod connection;
mod maintenance;

use crate::Result;
use crate::catalog::{SchemaCatalog, ServerVersion, TableNameKey};
use crate::error::AdminError;
use crate::models::{MaintenanceOp, MessageRow};
use crate::operations::{Disconnect, SqlExecutor};
use crate::status::ServerHealth;
use async_trait::async_trait;
use sqlx::MySqlPool;
use sqlx::Row;
use sqlx::mysql::MySqlRow;

/// One connected MySQL server.
pub struct MySqlServer {
    name: String,
    pool: MySqlPool,
    version: ServerVersion,
    key: TableNameKey,
}

impl std::fmt::Debug for MySqlServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlServer")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("key", &self.key)
            .field("pool_size", &self.pool.size())
            .finish_non_exhaustive()
    }
}

impl MySqlServer {
    /// Version read at connect time.
    pub fn version(&self) -> ServerVersion {
        self.version
    }
}

/// Reads a text column that the server may report as either VARCHAR or
/// VARBINARY (information_schema and SHOW output differ across versions).
pub(crate) fn text_column<I>(row: &MySqlRow, index: I) -> std::result::Result<String, sqlx::Error>
where
    I: sqlx::ColumnIndex<MySqlRow> + Copy,
{
    match row.try_get::<String, _>(index) {
        Ok(text) => Ok(text),
        Err(_) => row
            .try_get::<Vec<u8>, _>(index)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()),
    }
}

/// Backtick-quotes an identifier, doubling embedded backticks.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

#[async_trait]
impl SchemaCatalog for MySqlServer {
    async fn table_name_key(&self) -> Result<TableNameKey> {
        Ok(self.key)
    }

    async fn list_databases(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SHOW DATABASES")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AdminError::catalog_failed("Failed to list databases", e))?;

        rows.iter()
            .map(|row| {
                text_column(row, 0_usize)
                    .map_err(|e| AdminError::catalog_failed("Failed to read database name", e))
            })
            .collect()
    }

    async fn list_tables(&self, database: &str, key: TableNameKey) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = ? AND table_type = 'BASE TABLE'",
        )
        .bind(database)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AdminError::catalog_failed(format!("Failed to list tables of '{}'", database), e)
        })?;

        rows.iter()
            .map(|row| {
                text_column(row, key.column()).map_err(|e| {
                    AdminError::catalog_failed(
                        format!("Failed to read {} for '{}'", key.column(), database),
                        e,
                    )
                })
            })
            .collect()
    }
}

#[async_trait]
impl SqlExecutor for MySqlServer {
    fn server_name(&self) -> &str {
        &self.name
    }

    async fn check_table(&self, database: &str, table: &str) -> Result<Vec<MessageRow>> {
        maintenance::run_statement(&self.pool, MaintenanceOp::Check, database, table).await
    }

    async fn analyze_table(&self, database: &str, table: &str) -> Result<Vec<MessageRow>> {
        maintenance::run_statement(&self.pool, MaintenanceOp::Analyze, database, table).await
    }

    async fn optimize_table(&self, database: &str, table: &str) -> Result<Vec<MessageRow>> {
        maintenance::run_statement(&self.pool, MaintenanceOp::Optimize, database, table).await
    }

    async fn checksum_table(&self, database: &str, table: &str) -> Result<Vec<MessageRow>> {
        maintenance::checksum(&self.pool, database, table).await
    }

    async fn refresh_health(&self) -> Result<ServerHealth> {
        maintenance::health(&self.pool).await
    }
}

#[async_trait]
impl Disconnect for MySqlServer {
    async fn disconnect(&self) {
        tracing::debug!("Closing connection to {}", self.name);
        self.pool.close().await;
    }
}
