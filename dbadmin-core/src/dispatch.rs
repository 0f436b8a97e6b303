//! Command dispatch and the per-invocation lifecycle.
//!
//! An [`AdminConfig`] is built once from the command line. The
//! [`Dispatcher`] runs each requested command against the connected server,
//! hands the resulting document to the [`ResultSink`], and keeps going when
//! a command fails. [`run_invocation`] wraps that in the connection
//! lifecycle: the server connection and the document store are released
//! after the last command on every path.

use crate::Result;
use crate::catalog::SchemaCatalog;
use crate::config::SinkConfig;
use crate::models::{
    Command, DeliveryOutcome, ExclusionSet, ObjectFilter, Payload, ResultDocument,
};
use crate::operations::{Disconnect, OperationRunner, SqlExecutor};
use crate::resolver::ObjectResolver;
use crate::sink::ResultSink;
use crate::status::StatusCollector;

/// One requested command with its database arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Command to run
    pub command: Command,
    /// Empty means every non-excluded database
    pub databases: Vec<String>,
}

impl Request {
    /// Creates a request.
    pub fn new(command: Command, databases: Vec<String>) -> Self {
        Self { command, databases }
    }
}

/// Everything one invocation needs, built once before any command runs.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Requested commands, in command-line order
    pub requests: Vec<Request>,
    /// Table filter shared by the maintenance commands
    pub tables: Vec<String>,
    /// Databases left out of "all databases"
    pub exclusions: ExclusionSet,
    /// list-databases also reports excluded databases
    pub include_system: bool,
    /// Delivery options shared by every command
    pub sink: SinkConfig,
}

impl AdminConfig {
    /// Creates a configuration with no requests and no table filter.
    pub fn new(exclusions: ExclusionSet, sink: SinkConfig) -> Self {
        Self {
            requests: Vec::new(),
            tables: Vec::new(),
            exclusions,
            include_system: false,
            sink,
        }
    }

    /// Adds a command with its database arguments.
    pub fn with_request(mut self, command: Command, databases: Vec<String>) -> Self {
        self.requests.push(Request::new(command, databases));
        self
    }

    /// Sets the table filter.
    pub fn with_tables(mut self, tables: Vec<String>) -> Self {
        self.tables = tables;
        self
    }

    /// Requests in execution order: check, analyze, optimize, checksum,
    /// status, list-databases. A command requested twice runs once, with
    /// its first set of arguments.
    pub fn ordered_requests(&self) -> Vec<&Request> {
        Command::ALL
            .iter()
            .filter_map(|command| self.requests.iter().find(|r| r.command == *command))
            .collect()
    }
}

/// Result of one dispatched command.
#[derive(Debug)]
pub struct DispatchReport {
    /// Command that ran
    pub command: Command,
    /// Delivery outcome, or the error that stopped the command
    pub outcome: Result<DeliveryOutcome>,
}

impl DispatchReport {
    /// True when the command ran and its delivery succeeded.
    pub fn succeeded(&self) -> bool {
        matches!(&self.outcome, Ok(outcome) if outcome.succeeded)
    }
}

/// Maps commands to their runners and funnels every document into the sink.
pub struct Dispatcher<'a> {
    catalog: &'a dyn SchemaCatalog,
    executor: &'a dyn SqlExecutor,
    sink: &'a ResultSink,
}

impl<'a> Dispatcher<'a> {
    /// Creates a dispatcher over one connection and sink.
    pub fn new(
        catalog: &'a dyn SchemaCatalog,
        executor: &'a dyn SqlExecutor,
        sink: &'a ResultSink,
    ) -> Self {
        Self {
            catalog,
            executor,
            sink,
        }
    }

    /// Produces the document for one request without delivering it.
    ///
    /// # Errors
    /// Catalog failures (maintenance, list-databases) and health refresh
    /// failures (status) are returned; per-table failures are embedded in
    /// the document instead.
    pub async fn build_document(
        &self,
        request: &Request,
        config: &AdminConfig,
    ) -> Result<ResultDocument> {
        match request.command.maintenance() {
            Some(op) => {
                let filter = ObjectFilter::new(request.databases.clone(), config.tables.clone());
                let scope = ObjectResolver::new(self.catalog, &config.exclusions)
                    .resolve(&filter)
                    .await?;
                Ok(OperationRunner::run(op, &scope, self.executor).await)
            }
            None => match request.command {
                Command::Status => StatusCollector::collect(self.executor).await,
                _ => self.list_databases(config).await,
            },
        }
    }

    async fn list_databases(&self, config: &AdminConfig) -> Result<ResultDocument> {
        let databases: Vec<String> = self
            .catalog
            .list_databases()
            .await?
            .into_iter()
            .filter(|db| config.include_system || !config.exclusions.contains(db))
            .collect();

        Ok(ResultDocument::new(
            self.executor.server_name(),
            Command::ListDatabases.keyword(),
            Payload::Databases { databases },
        ))
    }

    /// Runs one request and delivers its document.
    pub async fn dispatch(&self, request: &Request, config: &AdminConfig) -> Result<DeliveryOutcome> {
        tracing::info!(
            "Dispatching {} on {}",
            request.command,
            self.executor.server_name()
        );
        let document = self.build_document(request, config).await?;
        let value = document.to_value()?;
        let outcome = self.sink.deliver(&value, &config.sink).await;
        if let Some(message) = &outcome.message {
            tracing::warn!("{} delivery failed: {}", request.command, message);
        }
        Ok(outcome)
    }

    /// Runs every request in execution order. A failing command is logged
    /// and reported; the remaining commands still run.
    pub async fn dispatch_all(&self, config: &AdminConfig) -> Vec<DispatchReport> {
        let mut reports = Vec::with_capacity(config.requests.len());
        for request in config.ordered_requests() {
            let outcome = self.dispatch(request, config).await;
            if let Err(e) = &outcome {
                tracing::error!("{} failed: {}", request.command, e);
            }
            reports.push(DispatchReport {
                command: request.command,
                outcome,
            });
        }
        reports
    }
}

/// Runs every request against `connection`, then releases the connection
/// and the sink's document store.
pub async fn run_invocation<C>(
    connection: &C,
    sink: &mut ResultSink,
    config: &AdminConfig,
) -> Vec<DispatchReport>
where
    C: SchemaCatalog + SqlExecutor + Disconnect,
{
    let reports = Dispatcher::new(connection, connection, sink)
        .dispatch_all(config)
        .await;
    connection.disconnect().await;
    sink.close().await;
    reports
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::TableNameKey;
    use crate::config::StoreTarget;
    use crate::models::MessageRow;
    use crate::status::ServerHealth;
    use crate::test_support::{FakeCatalog, FakeExecutor, FakeServer, RecordingMailer, RecordingStore};

    fn catalog() -> FakeCatalog {
        FakeCatalog::new(TableNameKey::Upper)
            .with_database("mysql", &["user"])
            .with_database("db1", &["t1", "t2"])
    }

    fn target() -> StoreTarget {
        "sysmon:mysql_db_status".parse().unwrap()
    }

    fn sink_with(store: &RecordingStore) -> ResultSink {
        ResultSink::new(Box::new(RecordingMailer::default())).with_store(Box::new(store.clone()))
    }

    fn config() -> AdminConfig {
        AdminConfig::new(
            ExclusionSet::default(),
            SinkConfig::default().with_store_target(target()).suppressed(),
        )
    }

    #[test]
    fn test_ordered_requests() {
        let config = config()
            .with_request(Command::ListDatabases, vec![])
            .with_request(Command::Check, vec!["db1".to_string()])
            .with_request(Command::Status, vec![])
            .with_request(Command::Check, vec!["db2".to_string()]);

        let order: Vec<Command> = config.ordered_requests().iter().map(|r| r.command).collect();
        assert_eq!(order, vec![Command::Check, Command::Status, Command::ListDatabases]);
        assert_eq!(config.ordered_requests()[0].databases, vec!["db1"]);
    }

    #[tokio::test]
    async fn test_checksum_single_table_document() {
        let catalog = catalog();
        let executor = FakeExecutor::new("srv")
            .with_rows("t1", vec![MessageRow::new("checksum", "123")]);
        let store = RecordingStore::default();
        let sink = sink_with(&store);
        let config = config()
            .with_request(Command::Checksum, vec!["db1".to_string()])
            .with_tables(vec!["t1".to_string()]);

        let reports = Dispatcher::new(&catalog, &executor, &sink)
            .dispatch_all(&config)
            .await;

        assert_eq!(reports.len(), 1);
        assert!(reports[0].succeeded());
        let inserted = store.inserted();
        let document = &inserted[0].1;
        assert_eq!(document["Server"], "srv");
        assert_eq!(document["Type"], "checksum");
        assert_eq!(
            document["Results"],
            serde_json::json!([{"Database": "db1", "Tables": [{"TableName": "t1", "Checksum": "123"}]}])
        );
    }

    #[tokio::test]
    async fn test_failure_in_one_command_does_not_stop_others() {
        let catalog = catalog();
        let executor = FakeExecutor::new("srv").failing_health();
        let store = RecordingStore::default();
        let sink = sink_with(&store);
        let config = config()
            .with_request(Command::Status, vec![])
            .with_request(Command::ListDatabases, vec![]);

        let reports = Dispatcher::new(&catalog, &executor, &sink)
            .dispatch_all(&config)
            .await;

        assert_eq!(reports.len(), 2);
        assert!(reports[0].outcome.is_err());
        assert!(reports[1].succeeded());
        assert_eq!(store.inserted()[0].1["Databases"], serde_json::json!(["db1"]));
    }

    #[tokio::test]
    async fn test_list_databases_include_system() {
        let catalog = catalog();
        let executor = FakeExecutor::new("srv");
        let store = RecordingStore::default();
        let sink = sink_with(&store);
        let mut config = config().with_request(Command::ListDatabases, vec![]);
        config.include_system = true;

        Dispatcher::new(&catalog, &executor, &sink)
            .dispatch_all(&config)
            .await;

        assert_eq!(
            store.inserted()[0].1["Databases"],
            serde_json::json!(["mysql", "db1"])
        );
    }

    #[tokio::test]
    async fn test_status_dispatch() {
        let catalog = catalog();
        let executor = FakeExecutor::new("srv").with_health(ServerHealth {
            uptime_seconds: 86_400,
            connections_current: 1,
            connections_max: 4,
            ..ServerHealth::default()
        });
        let store = RecordingStore::default();
        let sink = sink_with(&store);
        let config = config().with_request(Command::Status, vec![]);

        let reports = Dispatcher::new(&catalog, &executor, &sink)
            .dispatch_all(&config)
            .await;

        assert!(reports[0].succeeded());
        let document = &store.inserted()[0].1;
        assert_eq!(document["Type"], "status");
        assert_eq!(document["Connections"]["Percent_Used"], 25.0);
    }

    #[tokio::test]
    async fn test_store_failure_is_reported() {
        let catalog = catalog();
        let executor = FakeExecutor::new("srv");
        let sink = ResultSink::new(Box::new(RecordingMailer::default()))
            .with_store(Box::new(RecordingStore::failing()));
        let config = config().with_request(Command::Check, vec![]);

        let reports = Dispatcher::new(&catalog, &executor, &sink)
            .dispatch_all(&config)
            .await;

        let outcome = reports[0].outcome.as_ref().unwrap();
        assert!(!outcome.succeeded);
        assert!(!reports[0].succeeded());
    }

    #[tokio::test]
    async fn test_catalog_failure_is_reported() {
        let catalog = catalog().failing_tables("db1");
        let executor = FakeExecutor::new("srv");
        let store = RecordingStore::default();
        let sink = sink_with(&store);
        let config = config().with_request(Command::Analyze, vec![]);

        let reports = Dispatcher::new(&catalog, &executor, &sink)
            .dispatch_all(&config)
            .await;

        assert!(reports[0].outcome.is_err());
        assert!(store.inserted().is_empty());
        assert!(executor.statements().is_empty());
    }

    #[tokio::test]
    async fn test_run_invocation_releases_everything() {
        let server = FakeServer::new(catalog(), FakeExecutor::new("srv").failing_health());
        let store = RecordingStore::default();
        let mut sink = sink_with(&store);
        let config = config()
            .with_request(Command::Status, vec![])
            .with_request(Command::Optimize, vec![]);

        let reports = run_invocation(&server, &mut sink, &config).await;

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].command, Command::Optimize);
        assert_eq!(server.executor.disconnects(), 1);
        assert_eq!(store.close_calls(), 1);
        assert!(!sink.has_store());
    }
}
