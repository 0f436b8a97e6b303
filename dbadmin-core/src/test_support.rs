//! In-memory collaborators for unit tests.

use crate::Result;
use crate::catalog::{SchemaCatalog, TableNameKey};
use crate::config::StoreTarget;
use crate::error::AdminError;
use crate::models::MessageRow;
use crate::operations::{Disconnect, SqlExecutor};
use crate::sink::{DocumentStore, MailMessage, MailTransport};
use crate::status::ServerHealth;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Catalog backed by a list of `(database, tables)` pairs.
#[derive(Default)]
pub struct FakeCatalog {
    key: Option<TableNameKey>,
    databases: Vec<(String, Vec<String>)>,
    failing_database: Option<String>,
    key_calls: AtomicUsize,
    list_tables_calls: AtomicUsize,
    keys_seen: Mutex<Vec<TableNameKey>>,
}

impl FakeCatalog {
    pub fn new(key: TableNameKey) -> Self {
        Self {
            key: Some(key),
            ..Self::default()
        }
    }

    pub fn with_database(mut self, name: &str, tables: &[&str]) -> Self {
        self.databases.push((
            name.to_string(),
            tables.iter().map(|t| t.to_string()).collect(),
        ));
        self
    }

    pub fn failing_tables(mut self, database: &str) -> Self {
        self.failing_database = Some(database.to_string());
        self
    }

    pub fn key_calls(&self) -> usize {
        self.key_calls.load(Ordering::SeqCst)
    }

    pub fn list_tables_calls(&self) -> usize {
        self.list_tables_calls.load(Ordering::SeqCst)
    }

    pub fn keys_seen(&self) -> Vec<TableNameKey> {
        self.keys_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl SchemaCatalog for FakeCatalog {
    async fn table_name_key(&self) -> Result<TableNameKey> {
        self.key_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.key.unwrap_or(TableNameKey::Upper))
    }

    async fn list_databases(&self) -> Result<Vec<String>> {
        Ok(self.databases.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn list_tables(&self, database: &str, key: TableNameKey) -> Result<Vec<String>> {
        self.list_tables_calls.fetch_add(1, Ordering::SeqCst);
        self.keys_seen.lock().unwrap().push(key);
        if self.failing_database.as_deref() == Some(database) {
            return Err(AdminError::catalog_failed(
                format!("Failed to list tables of {}", database),
                std::io::Error::other("connection reset"),
            ));
        }
        Ok(self
            .databases
            .iter()
            .find(|(name, _)| name == database)
            .map(|(_, tables)| tables.clone())
            .unwrap_or_default())
    }
}

/// Executor returning canned rows per table and recording every statement.
#[derive(Default)]
pub struct FakeExecutor {
    name: String,
    rows: HashMap<String, Vec<MessageRow>>,
    failing: HashSet<String>,
    health: Option<ServerHealth>,
    health_fails: bool,
    statements: Mutex<Vec<String>>,
    disconnects: AtomicUsize,
}

impl FakeExecutor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_rows(mut self, table: &str, rows: Vec<MessageRow>) -> Self {
        self.rows.insert(table.to_string(), rows);
        self
    }

    pub fn failing_table(mut self, table: &str) -> Self {
        self.failing.insert(table.to_string());
        self
    }

    pub fn with_health(mut self, health: ServerHealth) -> Self {
        self.health = Some(health);
        self
    }

    pub fn failing_health(mut self) -> Self {
        self.health_fails = true;
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    fn respond(&self, statement: &str, database: &str, table: &str) -> Result<Vec<MessageRow>> {
        self.statements
            .lock()
            .unwrap()
            .push(format!("{} {}.{}", statement, database, table));
        if self.failing.contains(table) {
            return Err(AdminError::operation_failed(format!(
                "{} {}.{}: Table '{}.{}' doesn't exist",
                statement, database, table, database, table
            )));
        }
        Ok(self.rows.get(table).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl SqlExecutor for FakeExecutor {
    fn server_name(&self) -> &str {
        &self.name
    }

    async fn check_table(&self, database: &str, table: &str) -> Result<Vec<MessageRow>> {
        self.respond("CHECK TABLE", database, table)
    }

    async fn analyze_table(&self, database: &str, table: &str) -> Result<Vec<MessageRow>> {
        self.respond("ANALYZE TABLE", database, table)
    }

    async fn optimize_table(&self, database: &str, table: &str) -> Result<Vec<MessageRow>> {
        self.respond("OPTIMIZE TABLE", database, table)
    }

    async fn checksum_table(&self, database: &str, table: &str) -> Result<Vec<MessageRow>> {
        self.respond("CHECKSUM TABLE", database, table)
    }

    async fn refresh_health(&self) -> Result<ServerHealth> {
        if self.health_fails {
            return Err(AdminError::status_failed(
                "SHOW GLOBAL STATUS",
                std::io::Error::other("server has gone away"),
            ));
        }
        Ok(self.health.unwrap_or_default())
    }
}

#[async_trait]
impl Disconnect for FakeExecutor {
    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

/// Mail transport that records `(message, use_mailx)` pairs.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<(MailMessage, bool)>>>,
    fails: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fails: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(MailMessage, bool)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, message: &MailMessage, use_mailx: bool) -> Result<()> {
        if self.fails {
            return Err(AdminError::mail_failed("sendmail exited with status 75"));
        }
        self.sent.lock().unwrap().push((message.clone(), use_mailx));
        Ok(())
    }
}

/// Document store that records inserts and close calls.
#[derive(Clone, Default)]
pub struct RecordingStore {
    inserted: Arc<Mutex<Vec<(StoreTarget, Value)>>>,
    closes: Arc<AtomicUsize>,
    fails: bool,
}

impl RecordingStore {
    pub fn failing() -> Self {
        Self {
            fails: true,
            ..Self::default()
        }
    }

    pub fn inserted(&self) -> Vec<(StoreTarget, Value)> {
        self.inserted.lock().unwrap().clone()
    }

    pub fn close_calls(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn insert(&self, target: &StoreTarget, document: &Value) -> Result<()> {
        if self.fails {
            return Err(AdminError::store_failed(
                format!("Insert into {} failed", target),
                std::io::Error::other("not primary"),
            ));
        }
        self.inserted
            .lock()
            .unwrap()
            .push((target.clone(), document.clone()));
        Ok(())
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Catalog and executor behind one connection, as the MySQL adapter is.
pub struct FakeServer {
    pub catalog: FakeCatalog,
    pub executor: FakeExecutor,
}

impl FakeServer {
    pub fn new(catalog: FakeCatalog, executor: FakeExecutor) -> Self {
        Self { catalog, executor }
    }
}

#[async_trait]
impl SchemaCatalog for FakeServer {
    async fn table_name_key(&self) -> Result<TableNameKey> {
        self.catalog.table_name_key().await
    }

    async fn list_databases(&self) -> Result<Vec<String>> {
        self.catalog.list_databases().await
    }

    async fn list_tables(&self, database: &str, key: TableNameKey) -> Result<Vec<String>> {
        self.catalog.list_tables(database, key).await
    }
}

#[async_trait]
impl SqlExecutor for FakeServer {
    fn server_name(&self) -> &str {
        self.executor.server_name()
    }

    async fn check_table(&self, database: &str, table: &str) -> Result<Vec<MessageRow>> {
        self.executor.check_table(database, table).await
    }

    async fn analyze_table(&self, database: &str, table: &str) -> Result<Vec<MessageRow>> {
        self.executor.analyze_table(database, table).await
    }

    async fn optimize_table(&self, database: &str, table: &str) -> Result<Vec<MessageRow>> {
        self.executor.optimize_table(database, table).await
    }

    async fn checksum_table(&self, database: &str, table: &str) -> Result<Vec<MessageRow>> {
        self.executor.checksum_table(database, table).await
    }

    async fn refresh_health(&self) -> Result<ServerHealth> {
        self.executor.refresh_health().await
    }
}

#[async_trait]
impl Disconnect for FakeServer {
    async fn disconnect(&self) {
        self.executor.disconnect().await;
    }
}
