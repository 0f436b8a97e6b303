//! Maintenance statements and health queries.
//!
//! Admin statements go through the text protocol (`raw_sql`): `CHECK TABLE`
//! and the `SHOW GLOBAL` family are not all accepted as prepared statements.

use super::{quote_identifier, text_column};
use crate::Result;
use crate::error::AdminError;
use crate::models::{MaintenanceOp, MessageRow};
use crate::status::ServerHealth;
use sqlx::MySqlPool;
use sqlx::Row;
use sqlx::mysql::MySqlRow;
use std::collections::HashMap;

/// `CHECK/ANALYZE/OPTIMIZE TABLE` text for one table.
pub(crate) fn statement_sql(op: MaintenanceOp, database: &str, table: &str) -> String {
    format!(
        "{} {}.{}",
        op.statement(),
        quote_identifier(database),
        quote_identifier(table)
    )
}

/// Runs a statement that answers with `Table, Op, Msg_type, Msg_text` rows.
pub(crate) async fn run_statement(
    pool: &MySqlPool,
    op: MaintenanceOp,
    database: &str,
    table: &str,
) -> Result<Vec<MessageRow>> {
    let sql = statement_sql(op, database, table);
    tracing::trace!("{}", sql);

    let rows = sqlx::raw_sql(&sql)
        .fetch_all(pool)
        .await
        .map_err(|e| AdminError::operation_failed(format!("{}: {}", sql, e)))?;

    rows.iter()
        .map(|row| {
            let msg_type = text_column(row, "Msg_type");
            let msg_text = text_column(row, "Msg_text");
            match (msg_type, msg_text) {
                (Ok(msg_type), Ok(msg_text)) => Ok(MessageRow::new(msg_type, msg_text)),
                (Err(e), _) | (_, Err(e)) => Err(AdminError::operation_failed(format!(
                    "{}: unreadable result row: {}",
                    sql, e
                ))),
            }
        })
        .collect()
}

fn checksum_value(row: &MySqlRow) -> Option<String> {
    if let Ok(value) = row.try_get::<Option<u64>, _>("Checksum") {
        return value.map(|v| v.to_string());
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>("Checksum") {
        return value.map(|v| v.to_string());
    }
    text_column(row, "Checksum").ok()
}

/// `CHECKSUM TABLE`; a NULL checksum (missing table) yields no row.
pub(crate) async fn checksum(
    pool: &MySqlPool,
    database: &str,
    table: &str,
) -> Result<Vec<MessageRow>> {
    let sql = statement_sql(MaintenanceOp::Checksum, database, table);
    tracing::trace!("{}", sql);

    let rows = sqlx::raw_sql(&sql)
        .fetch_all(pool)
        .await
        .map_err(|e| AdminError::operation_failed(format!("{}: {}", sql, e)))?;

    Ok(rows
        .iter()
        .filter_map(checksum_value)
        .map(|value| MessageRow::new("checksum", value))
        .collect())
}

async fn name_value_pairs(pool: &MySqlPool, sql: &str) -> Result<HashMap<String, String>> {
    let rows = sqlx::raw_sql(sql)
        .fetch_all(pool)
        .await
        .map_err(|e| AdminError::status_failed(sql.to_string(), e))?;

    let mut values = HashMap::with_capacity(rows.len());
    for row in &rows {
        let name = text_column(row, 0_usize)
            .map_err(|e| AdminError::status_failed(sql.to_string(), e))?;
        // NULL values (e.g. unset plugin variables) are treated as absent.
        if let Ok(value) = text_column(row, 1_usize) {
            values.insert(name, value);
        }
    }
    Ok(values)
}

/// Reads global status and variables and derives [`ServerHealth`].
pub(crate) async fn health(pool: &MySqlPool) -> Result<ServerHealth> {
    let status = name_value_pairs(pool, "SHOW GLOBAL STATUS").await?;
    let variables = name_value_pairs(pool, "SHOW GLOBAL VARIABLES").await?;
    Ok(ServerHealth::from_server_variables(&status, &variables))
}
