//! Core engine for dbadmin.
//!
//! Resolves which databases and tables a maintenance command touches, runs
//! `CHECK`/`ANALYZE`/`OPTIMIZE`/`CHECKSUM TABLE` or a health snapshot, and
//! delivers one structured result document to console, file, mail and a
//! document store.
//!
//! # Architecture
//! - [`catalog::SchemaCatalog`] and [`operations::SqlExecutor`] abstract the
//!   server; [`adapters`] implements them over sqlx
//! - [`resolver::ObjectResolver`] turns filters into a [`models::ResolvedScope`]
//! - [`operations::OperationRunner`] and [`status::StatusCollector`] build
//!   [`models::ResultDocument`]s
//! - [`sink::ResultSink`] fans a document out to every destination
//! - [`dispatch::Dispatcher`] ties a command to its runner and the sink
//!
//! # Security
//! - Passwords live in zeroizing containers and never reach logs
//! - Connection URLs are redacted in every error message

pub mod adapters;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod models;
pub mod operations;
pub mod resolver;
pub mod security;
pub mod sink;
pub mod status;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use catalog::{SchemaCatalog, ServerVersion, TableNameKey};
pub use config::{ServerConfig, SinkConfig, StoreConfig, StoreTarget, WriteMode};
pub use dispatch::{AdminConfig, DispatchReport, Dispatcher, Request, run_invocation};
pub use error::{AdminError, Result};
pub use models::{
    Command, DeliveryOutcome, ExclusionSet, MaintenanceOp, MessageRow, ObjectFilter, Payload,
    ResolvedScope, ResultDocument, ScopeNotice, TableOutcome,
};
pub use operations::{Disconnect, OperationRunner, SqlExecutor};
pub use resolver::ObjectResolver;
pub use sink::{DocumentStore, MailTransport, ResultSink};
pub use status::{ServerHealth, StatusCollector};
