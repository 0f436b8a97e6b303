//! Delivery options for the result funnel.

use crate::error::AdminError;
use std::path::PathBuf;

/// How a file destination is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the file on every write
    #[default]
    Truncate,
    /// Add to the end of the file
    Append,
}

/// File destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTarget {
    /// Output path
    pub path: PathBuf,
    /// Truncate or append
    pub mode: WriteMode,
}

/// Email destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSettings {
    /// Addresses, passed to the mailer as given
    pub recipients: Vec<String>,
    /// Falls back to `"<Server>: <Type>"` when unset
    pub subject: Option<String>,
    /// Use `mailx` instead of `sendmail -t`
    pub use_mailx: bool,
}

/// Document store destination in `database:collection` form.
///
/// # Example
/// ```rust
/// use dbadmin_core::config::StoreTarget;
///
/// let target: StoreTarget = "sysmon:mysql_db_status".parse().unwrap();
/// assert_eq!(target.database, "sysmon");
/// assert_eq!(target.collection, "mysql_db_status");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreTarget {
    /// Database name
    pub database: String,
    /// Collection name
    pub collection: String,
}

impl std::str::FromStr for StoreTarget {
    type Err = AdminError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((database, collection))
                if !database.trim().is_empty()
                    && !collection.trim().is_empty()
                    && !collection.contains(':') =>
            {
                Ok(Self {
                    database: database.trim().to_string(),
                    collection: collection.trim().to_string(),
                })
            }
            _ => Err(AdminError::configuration(format!(
                "Store target must be database:collection, got '{}'",
                s
            ))),
        }
    }
}

impl std::fmt::Display for StoreTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.database, self.collection)
    }
}

/// Per-invocation delivery options, built once and shared by every command.
///
/// Every destination is independent: a field left unset simply skips that
/// destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    /// Write each document to a file
    pub file: Option<FileTarget>,
    /// Mail each document
    pub mail: Option<MailSettings>,
    /// Insert each document into this collection
    pub store_target: Option<StoreTarget>,
    /// Pretty-print instead of compact JSON
    pub expand: bool,
    /// Spaces per level; only used with `expand`
    pub indent: usize,
    /// Skip console output
    pub suppress: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            file: None,
            mail: None,
            store_target: None,
            expand: false,
            indent: 4,
            suppress: false,
        }
    }
}

impl SinkConfig {
    /// Adds a file destination.
    pub fn with_file(mut self, path: impl Into<PathBuf>, mode: WriteMode) -> Self {
        self.file = Some(FileTarget {
            path: path.into(),
            mode,
        });
        self
    }

    /// Adds an email destination.
    pub fn with_mail(mut self, mail: MailSettings) -> Self {
        self.mail = Some(mail);
        self
    }

    /// Sets the document store destination.
    pub fn with_store_target(mut self, target: StoreTarget) -> Self {
        self.store_target = Some(target);
        self
    }

    /// Pretty-prints with `indent` spaces per level.
    pub fn expanded(mut self, indent: usize) -> Self {
        self.expand = true;
        self.indent = indent;
        self
    }

    /// Turns console output off.
    pub fn suppressed(mut self) -> Self {
        self.suppress = true;
        self
    }
}
