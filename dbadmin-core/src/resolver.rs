//! Resolution of database/table filters into an operation scope.
//!
//! Intersection, not validation, decides the scope: requested names that do
//! not exist are dropped (databases with a warning, tables silently) and
//! processing continues with whatever remains.

use crate::Result;
use crate::catalog::{SchemaCatalog, TableNameKey};
use crate::models::{ExclusionSet, ObjectFilter, ResolvedScope, ScopeNotice};

/// Turns an [`ObjectFilter`] into a [`ResolvedScope`] against live metadata.
///
/// Nothing is cached: every call re-reads the catalog because the schema may
/// change between invocations.
pub struct ObjectResolver<'a> {
    catalog: &'a dyn SchemaCatalog,
    exclusions: &'a ExclusionSet,
}

impl<'a> ObjectResolver<'a> {
    /// Creates a resolver over `catalog` honoring `exclusions`.
    pub fn new(catalog: &'a dyn SchemaCatalog, exclusions: &'a ExclusionSet) -> Self {
        Self {
            catalog,
            exclusions,
        }
    }

    /// Resolves `filter` into the databases and tables to operate on.
    ///
    /// # Errors
    /// Returns an error if the catalog cannot list databases or tables.
    /// Missing names and empty results are reported as notices instead.
    pub async fn resolve(&self, filter: &ObjectFilter) -> Result<ResolvedScope> {
        // One key for every fetch of this call.
        let key = self.catalog.table_name_key().await?;
        let existing = self.catalog.list_databases().await?;
        let mut scope = ResolvedScope::default();

        if filter.databases.is_empty() {
            let all: Vec<String> = dedup(existing.iter().map(String::as_str))
                .into_iter()
                .filter(|db| !self.exclusions.contains(db))
                .collect();

            if all.is_empty() {
                return Ok(empty_scope(scope));
            }

            if !filter.tables.is_empty() {
                tracing::debug!(
                    "Table filter ignored: it only applies when exactly one database is requested"
                );
            }
            self.add_full_databases(&mut scope, &all, key).await?;
            return Ok(finish(scope));
        }

        let requested: Vec<String> = dedup(filter.databases.iter().map(String::as_str))
            .into_iter()
            .filter(|db| {
                let excluded = self.exclusions.contains(db);
                if excluded {
                    tracing::debug!("Skipping excluded database '{}'", db);
                }
                !excluded
            })
            .collect();

        if requested.is_empty() {
            return Ok(empty_scope(scope));
        }

        let missing: Vec<String> = requested
            .iter()
            .filter(|db| !existing.contains(db))
            .cloned()
            .collect();
        if !missing.is_empty() {
            let notice = ScopeNotice::MissingDatabases(missing);
            tracing::warn!("{}", notice);
            scope.notice(notice);
        }

        let surviving: Vec<String> = requested
            .into_iter()
            .filter(|db| existing.contains(db))
            .collect();

        match surviving.as_slice() {
            [] => return Ok(empty_scope(scope)),
            [database] if !filter.tables.is_empty() => {
                let tables: Vec<String> = self
                    .catalog
                    .list_tables(database, key)
                    .await?
                    .into_iter()
                    .filter(|table| filter.tables.contains(table))
                    .collect();
                tracing::debug!(
                    "Database '{}': {} of {} requested tables exist",
                    database,
                    tables.len(),
                    filter.tables.len()
                );
                scope.push(database.clone(), tables);
            }
            databases => {
                if !filter.tables.is_empty() {
                    tracing::debug!(
                        "Table filter ignored for {} databases; processing all tables",
                        databases.len()
                    );
                }
                self.add_full_databases(&mut scope, databases, key).await?;
            }
        }

        Ok(finish(scope))
    }

    async fn add_full_databases(
        &self,
        scope: &mut ResolvedScope,
        databases: &[String],
        key: TableNameKey,
    ) -> Result<()> {
        for database in databases {
            let tables = self.catalog.list_tables(database, key).await?;
            tracing::debug!("Database '{}': {} tables", database, tables.len());
            scope.push(database.clone(), tables);
        }
        Ok(())
    }
}

fn dedup<'s>(names: impl Iterator<Item = &'s str>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for name in names {
        if !unique.iter().any(|seen| seen == name) {
            unique.push(name.to_string());
        }
    }
    unique
}

fn empty_scope(mut scope: ResolvedScope) -> ResolvedScope {
    tracing::info!("{}", ScopeNotice::EmptyScope);
    scope.notice(ScopeNotice::EmptyScope);
    scope
}

fn finish(scope: ResolvedScope) -> ResolvedScope {
    if scope.is_empty() {
        return empty_scope(scope);
    }
    scope
}
