//! Core data models for scope resolution and result documents.
//!
//! A [`ResultDocument`] is the single value handed to every sink. It always
//! serializes to one JSON object with `Server`, `AsOf` and `Type` keys plus a
//! payload whose shape depends on `Type`.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeSet;

/// System databases skipped when resolving "all databases".
pub const DEFAULT_SYSTEM_DATABASES: &[&str] =
    &["performance_schema", "information_schema", "mysql", "sys"];

/// Informational note emitted by storage engines (InnoDB) that rebuild a
/// table instead of optimizing it in place. Optimize results drop it.
pub const OPTIMIZE_FALLBACK_NOTE: &str =
    "Table does not support optimize, doing recreate + analyze instead";

/// Table-level maintenance statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaintenanceOp {
    /// `CHECK TABLE`: report corruption
    Check,
    /// `ANALYZE TABLE`: refresh key distribution statistics
    Analyze,
    /// `OPTIMIZE TABLE`: defragment or rebuild
    Optimize,
    /// `CHECKSUM TABLE`: live table checksum
    Checksum,
}

impl MaintenanceOp {
    /// Document `Type` value and CLI keyword.
    pub fn keyword(self) -> &'static str {
        match self {
            MaintenanceOp::Check => "check",
            MaintenanceOp::Analyze => "analyze",
            MaintenanceOp::Optimize => "optimize",
            MaintenanceOp::Checksum => "checksum",
        }
    }

    /// SQL statement prefix for this operation.
    pub fn statement(self) -> &'static str {
        match self {
            MaintenanceOp::Check => "CHECK TABLE",
            MaintenanceOp::Analyze => "ANALYZE TABLE",
            MaintenanceOp::Optimize => "OPTIMIZE TABLE",
            MaintenanceOp::Checksum => "CHECKSUM TABLE",
        }
    }
}

impl std::fmt::Display for MaintenanceOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Every command the dispatcher understands, in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Command {
    /// Run [`MaintenanceOp::Check`] over the resolved scope
    Check,
    /// Run [`MaintenanceOp::Analyze`] over the resolved scope
    Analyze,
    /// Run [`MaintenanceOp::Optimize`] over the resolved scope
    Optimize,
    /// Run [`MaintenanceOp::Checksum`] over the resolved scope
    Checksum,
    /// Server health snapshot
    Status,
    /// Database names on the server
    ListDatabases,
}

impl Command {
    /// All commands in the order they run when several are requested.
    pub const ALL: [Command; 6] = [
        Command::Check,
        Command::Analyze,
        Command::Optimize,
        Command::Checksum,
        Command::Status,
        Command::ListDatabases,
    ];

    /// Keyword used on the command line and as the document `Type`.
    pub fn keyword(self) -> &'static str {
        match self {
            Command::Check => "check",
            Command::Analyze => "analyze",
            Command::Optimize => "optimize",
            Command::Checksum => "checksum",
            Command::Status => "status",
            Command::ListDatabases => "list-databases",
        }
    }

    /// The table-level operation behind this command, if any.
    pub fn maintenance(self) -> Option<MaintenanceOp> {
        match self {
            Command::Check => Some(MaintenanceOp::Check),
            Command::Analyze => Some(MaintenanceOp::Analyze),
            Command::Optimize => Some(MaintenanceOp::Optimize),
            Command::Checksum => Some(MaintenanceOp::Checksum),
            Command::Status | Command::ListDatabases => None,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Databases that are never part of an "all databases" scope.
///
/// Built once per invocation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionSet {
    names: BTreeSet<String>,
}

impl Default for ExclusionSet {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_DATABASES.iter().copied())
    }
}

impl ExclusionSet {
    /// Creates an exclusion set from the given database names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// True when `database` must be left out of an "all databases" scope.
    pub fn contains(&self, database: &str) -> bool {
        self.names.contains(database)
    }
}

/// Requested databases and tables. Empty lists mean "all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectFilter {
    /// Requested databases, in request order
    pub databases: Vec<String>,
    /// Requested tables; honored only for a single database
    pub tables: Vec<String>,
}

impl ObjectFilter {
    /// Creates a filter from requested database and table names.
    pub fn new(databases: Vec<String>, tables: Vec<String>) -> Self {
        Self { databases, tables }
    }

    /// Filter selecting every table of every non-excluded database.
    pub fn all() -> Self {
        Self::default()
    }
}

/// Non-fatal findings raised while resolving a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ScopeNotice {
    /// Requested databases that do not exist on the server
    MissingDatabases(Vec<String>),
    /// Nothing left to process after filtering
    EmptyScope,
}

impl std::fmt::Display for ScopeNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScopeNotice::MissingDatabases(names) => {
                write!(f, "Database(s) that do not exist: {}", names.join(", "))
            }
            ScopeNotice::EmptyScope => write!(f, "No databases or tables to process"),
        }
    }
}

/// One database and the tables an operation will touch in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeEntry {
    /// Database name
    pub database: String,
    /// Tables in server order
    pub tables: Vec<String>,
}

/// Ordered database → tables mapping produced by the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedScope {
    entries: Vec<ScopeEntry>,
    notices: Vec<ScopeNotice>,
}

impl ResolvedScope {
    pub(crate) fn push(&mut self, database: String, tables: Vec<String>) {
        self.entries.push(ScopeEntry { database, tables });
    }

    pub(crate) fn notice(&mut self, notice: ScopeNotice) {
        self.notices.push(notice);
    }

    /// Builds a scope directly from `(database, tables)` pairs.
    pub fn from_entries<I, D, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (D, Vec<T>)>,
        D: Into<String>,
        T: Into<String>,
    {
        let mut scope = Self::default();
        for (database, tables) in entries {
            scope.push(database.into(), tables.into_iter().map(Into::into).collect());
        }
        scope
    }

    /// Entries in resolution order.
    pub fn entries(&self) -> &[ScopeEntry] {
        &self.entries
    }

    /// Warnings and notices raised while resolving.
    pub fn notices(&self) -> &[ScopeNotice] {
        &self.notices
    }

    /// Database names in resolution order.
    pub fn databases(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.database.as_str())
    }

    /// Tables resolved for `database`, if it is part of the scope.
    pub fn tables(&self, database: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|entry| entry.database == database)
            .map(|entry| entry.tables.as_slice())
    }

    /// Total number of tables across every database.
    pub fn table_count(&self) -> usize {
        self.entries.iter().map(|entry| entry.tables.len()).sum()
    }

    /// True when there is no table to run an operation against.
    pub fn is_empty(&self) -> bool {
        self.table_count() == 0
    }
}

/// One message row from a maintenance statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow {
    /// `Msg_type` column (`status`, `note`, `error`, ...)
    pub msg_type: String,
    /// `Msg_text` column
    pub msg_text: String,
}

impl MessageRow {
    /// Creates a row from its type and text.
    pub fn new(msg_type: impl Into<String>, msg_text: impl Into<String>) -> Self {
        Self {
            msg_type: msg_type.into(),
            msg_text: msg_text.into(),
        }
    }
}

/// Diagnostic fields collected for one table.
///
/// Serializes as a JSON object whose first key is `TableName`, followed by
/// the fields in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct TableOutcome {
    table_name: String,
    fields: Vec<(String, Value)>,
}

impl TableOutcome {
    /// Creates an outcome with no fields yet.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            fields: Vec::new(),
        }
    }

    /// Records `text` under `key`. A repeated key keeps every value by
    /// turning the field into an array.
    pub fn push_field(&mut self, key: impl Into<String>, text: impl Into<String>) {
        let key = key.into();
        let text = Value::String(text.into());
        match self.fields.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, Value::Array(values))) => values.push(text),
            Some((_, value)) => {
                let first = std::mem::take(value);
                *value = Value::Array(vec![first, text]);
            }
            None => self.fields.push((key, text)),
        }
    }

    /// Name of the table this outcome belongs to.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Value recorded under `key`, if any.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    /// All recorded fields in arrival order.
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }
}

impl Serialize for TableOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len().saturating_add(1)))?;
        map.serialize_entry("TableName", &self.table_name)?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Outcomes for every table of one database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseOutcome {
    /// Database name
    #[serde(rename = "Database")]
    pub database: String,
    /// One outcome per table, in scope order
    #[serde(rename = "Tables")]
    pub tables: Vec<TableOutcome>,
}

/// Memory section of a status document (megabytes).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryUsage {
    /// Estimate at the connection high-water mark
    #[serde(rename = "Current_Usage")]
    pub current_mb: u64,
    /// Estimate with every allowed connection open
    #[serde(rename = "Max_Usage")]
    pub max_mb: u64,
    /// `current_mb / max_mb`, two decimals
    #[serde(rename = "Percent_Used")]
    pub percent_used: f64,
}

/// Connection section of a status document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionUsage {
    /// `Threads_connected`
    #[serde(rename = "Current_Connected")]
    pub current: u64,
    /// `max_connections`
    #[serde(rename = "Max_Connections")]
    pub max: u64,
    /// `current / max`, two decimals
    #[serde(rename = "Percent_Used")]
    pub percent_used: f64,
}

/// Server health metrics carried by a status document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusMetrics {
    /// Whole days since server start
    #[serde(rename = "Uptime")]
    pub uptime_days: u64,
    /// Memory estimate
    #[serde(rename = "Memory")]
    pub memory: MemoryUsage,
    /// Connection usage
    #[serde(rename = "Connections")]
    pub connections: ConnectionUsage,
}

/// Payload variants; the document `Type` tells them apart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// Maintenance results, one entry per database
    Tables {
        /// Per-database outcomes
        #[serde(rename = "Results")]
        results: Vec<DatabaseOutcome>,
    },
    /// Health metrics
    Status(StatusMetrics),
    /// Database listing
    Databases {
        /// Database names in server order
        #[serde(rename = "Databases")]
        databases: Vec<String>,
    },
}

/// Structured result of one command, handed unchanged to every sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultDocument {
    /// Configured server name
    #[serde(rename = "Server")]
    pub server: String,
    /// Local time the document was built, `%Y-%m-%d %H:%M:%S`
    #[serde(rename = "AsOf")]
    pub as_of: String,
    /// Command keyword; discriminates the payload
    #[serde(rename = "Type")]
    pub kind: String,
    /// Command-specific fields
    #[serde(flatten)]
    pub payload: Payload,
}

impl ResultDocument {
    /// Creates a document stamped with the current local time.
    pub fn new(server: impl Into<String>, kind: impl Into<String>, payload: Payload) -> Self {
        Self {
            server: server.into(),
            as_of: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            kind: kind.into(),
            payload,
        }
    }

    /// Per-database results, if this is a table operation document.
    pub fn results(&self) -> Option<&[DatabaseOutcome]> {
        match &self.payload {
            Payload::Tables { results } => Some(results),
            _ => None,
        }
    }

    /// Converts the document into the JSON value consumed by sinks.
    pub fn to_value(&self) -> crate::Result<Value> {
        serde_json::to_value(self).map_err(|e| {
            crate::error::AdminError::serialization(
                format!("Failed to serialize {} document", self.kind),
                e,
            )
        })
    }
}

/// Combined result of delivering one document to its sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    /// False for a rejected document or a failed store insert
    pub succeeded: bool,
    /// Failure description
    pub message: Option<String>,
}

impl DeliveryOutcome {
    /// Successful delivery.
    pub fn ok() -> Self {
        Self {
            succeeded: true,
            message: None,
        }
    }

    /// Failed delivery with its reason.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
#[path = "models_tests.rs"]
mod tests;
