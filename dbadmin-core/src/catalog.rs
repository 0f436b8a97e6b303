//! Schema catalog abstraction and the version-dependent metadata key.
//!
//! `information_schema` reports its column names in lower case before MySQL
//! 8.0 and in upper case from 8.0 on, so the key used to read table names
//! out of a result row depends on the server version. The choice is a
//! two-way [`TableNameKey`] resolved once per connection. MariaDB keeps the
//! lower-case name in every release.

use crate::Result;
use async_trait::async_trait;

/// Parsed `SELECT VERSION()` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServerVersion {
    /// Major release
    pub major: u32,
    /// Minor release
    pub minor: u32,
    /// Patch level
    pub patch: u32,
    /// Reported with a `MariaDB` suffix
    pub mariadb: bool,
}

impl ServerVersion {
    /// A MySQL version.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            mariadb: false,
        }
    }

    /// A MariaDB version.
    pub const fn mariadb(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            mariadb: true,
        }
    }

    /// Parses strings such as `8.0.36`, `5.7.44-log`, `8.4.0-commercial` or
    /// `10.11.6-MariaDB-1:10.11.6+maria~ubu2204`.
    ///
    /// Missing minor/patch components default to zero.
    pub fn parse(version: &str) -> Result<Self> {
        let numeric = version
            .trim()
            .split(|c: char| c == '-' || c == '+' || c.is_whitespace())
            .next()
            .unwrap_or_default();

        let mut parts = numeric.split('.');
        let mut component = |name: &str, required: bool| -> Result<u32> {
            match parts.next() {
                Some(part) => part.parse::<u32>().map_err(|_| {
                    crate::error::AdminError::configuration(format!(
                        "Invalid {} version component in '{}'",
                        name, version
                    ))
                }),
                None if required => Err(crate::error::AdminError::configuration(format!(
                    "Server version '{}' has no {} component",
                    version, name
                ))),
                None => Ok(0),
            }
        };

        Ok(Self {
            major: component("major", true)?,
            minor: component("minor", false)?,
            patch: component("patch", false)?,
            mariadb: version.to_ascii_lowercase().contains("mariadb"),
        })
    }
}

impl std::fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.mariadb {
            f.write_str("-MariaDB")?;
        }
        Ok(())
    }
}

/// Column name under which `information_schema.tables` reports table names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableNameKey {
    /// `table_name` (servers before 8.0)
    Lower,
    /// `TABLE_NAME` (MySQL 8.0 and later)
    Upper,
}

impl TableNameKey {
    /// Selects the key for a server version.
    pub fn for_version(version: ServerVersion) -> Self {
        if !version.mariadb && version.major >= 8 {
            TableNameKey::Upper
        } else {
            TableNameKey::Lower
        }
    }

    /// Column name as the server labels it.
    pub fn column(self) -> &'static str {
        match self {
            TableNameKey::Lower => "table_name",
            TableNameKey::Upper => "TABLE_NAME",
        }
    }
}

/// Source of database and table names for scope resolution.
///
/// # Object Safety
/// Used through `&dyn SchemaCatalog` so tests can swap in an in-memory
/// catalog.
#[async_trait]
pub trait SchemaCatalog: Send + Sync {
    /// Metadata key for this connection's server version.
    async fn table_name_key(&self) -> Result<TableNameKey>;

    /// Every database on the server, in server order.
    async fn list_databases(&self) -> Result<Vec<String>>;

    /// Base tables of `database`, read with `key`.
    async fn list_tables(&self, database: &str, key: TableNameKey) -> Result<Vec<String>>;
}
