//! Table maintenance operations and the executor seam.
//!
//! [`OperationRunner`] walks a [`ResolvedScope`] in order, runs one
//! maintenance statement per table through a [`SqlExecutor`], and folds the
//! returned message rows into a single [`ResultDocument`]. A failing table
//! is recorded in the document and never stops the walk.

use crate::Result;
use crate::models::{
    DatabaseOutcome, MaintenanceOp, MessageRow, OPTIMIZE_FALLBACK_NOTE, Payload, ResolvedScope,
    ResultDocument, TableOutcome,
};
use crate::status::ServerHealth;
use async_trait::async_trait;

/// Executes maintenance statements and health queries against one server.
///
/// # Object Safety
/// Used through `&dyn SqlExecutor`; the MySQL adapter and test fakes both
/// implement it.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Display name of the server, copied into every document.
    fn server_name(&self) -> &str;

    /// `CHECK TABLE` message rows.
    async fn check_table(&self, database: &str, table: &str) -> Result<Vec<MessageRow>>;

    /// `ANALYZE TABLE` message rows.
    async fn analyze_table(&self, database: &str, table: &str) -> Result<Vec<MessageRow>>;

    /// `OPTIMIZE TABLE` message rows, fallback note included.
    async fn optimize_table(&self, database: &str, table: &str) -> Result<Vec<MessageRow>>;

    /// Rows of type `checksum` carry the table checksum as text.
    async fn checksum_table(&self, database: &str, table: &str) -> Result<Vec<MessageRow>>;

    /// Reads a fresh health snapshot.
    async fn refresh_health(&self) -> Result<ServerHealth>;
}

/// Releases a server connection. Called once per invocation.
#[async_trait]
pub trait Disconnect: Send + Sync {
    /// Closes the connection. Infallible from the caller's side.
    async fn disconnect(&self);
}

/// Capitalizes the first character and lower-cases the rest
/// (`status` and `STATUS` both become `Status`).
pub fn normalize_msg_type(msg_type: &str) -> String {
    let mut chars = msg_type.trim().chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// True for the informational row InnoDB returns when OPTIMIZE falls back
/// to recreate + analyze.
pub fn is_optimize_fallback(row: &MessageRow) -> bool {
    row.msg_type.trim().eq_ignore_ascii_case("note") && row.msg_text.trim() == OPTIMIZE_FALLBACK_NOTE
}

/// Runs a maintenance operation over a resolved scope.
pub struct OperationRunner;

impl OperationRunner {
    /// Runs `op` against every table in `scope`, in scope order.
    ///
    /// Never fails: executor errors become `{TableName, Error}` entries.
    pub async fn run(
        op: MaintenanceOp,
        scope: &ResolvedScope,
        executor: &dyn SqlExecutor,
    ) -> ResultDocument {
        let mut results = Vec::with_capacity(scope.entries().len());

        for entry in scope.entries() {
            tracing::info!(
                "Running {} on {} table(s) in '{}'",
                op,
                entry.tables.len(),
                entry.database
            );
            let mut tables = Vec::with_capacity(entry.tables.len());
            for table in &entry.tables {
                tables.push(run_table(op, &entry.database, table, executor).await);
            }
            results.push(DatabaseOutcome {
                database: entry.database.clone(),
                tables,
            });
        }

        ResultDocument::new(
            executor.server_name(),
            op.keyword(),
            Payload::Tables { results },
        )
    }
}

async fn run_table(
    op: MaintenanceOp,
    database: &str,
    table: &str,
    executor: &dyn SqlExecutor,
) -> TableOutcome {
    let rows = match op {
        MaintenanceOp::Check => executor.check_table(database, table).await,
        MaintenanceOp::Analyze => executor.analyze_table(database, table).await,
        MaintenanceOp::Optimize => executor.optimize_table(database, table).await,
        MaintenanceOp::Checksum => executor.checksum_table(database, table).await,
    };

    let mut outcome = TableOutcome::new(table);
    match rows {
        Ok(rows) => accumulate(op, &mut outcome, rows),
        Err(e) => {
            tracing::warn!("{} failed for {}.{}: {}", op, database, table, e);
            outcome.push_field("Error", e.to_string());
        }
    }
    outcome
}

fn accumulate(op: MaintenanceOp, outcome: &mut TableOutcome, rows: Vec<MessageRow>) {
    for row in rows {
        match op {
            MaintenanceOp::Check | MaintenanceOp::Analyze => {
                outcome.push_field(normalize_msg_type(&row.msg_type), row.msg_text);
            }
            MaintenanceOp::Optimize => {
                if is_optimize_fallback(&row) {
                    tracing::trace!("Dropping optimize fallback note for {}", outcome.table_name());
                    continue;
                }
                outcome.push_field(normalize_msg_type(&row.msg_type), row.msg_text);
            }
            MaintenanceOp::Checksum => {
                if row.msg_type.trim().eq_ignore_ascii_case("checksum") {
                    outcome.push_field("Checksum", row.msg_text);
                }
            }
        }
    }
}
