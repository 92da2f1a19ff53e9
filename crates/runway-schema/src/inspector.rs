//! Cached column nullability.
//!
//! The synchronizer asks one question of the schema: may this foreign key
//! column hold NULL? The answer decides between detaching an orphaned row
//! and deleting it, so a column the catalog does not know about answers
//! [`Nullability::Unknown`] rather than guessing either way.

use crate::introspect::{ColumnInfo, Introspector};
use runway_core::{Connection, Error};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Read-only port over the database's schema catalog.
pub trait SchemaCatalog {
    /// List the columns of `table`. A missing table yields an empty list.
    fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, Error>;
}

impl<T: SchemaCatalog + ?Sized> SchemaCatalog for &T {
    fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, Error> {
        (**self).list_columns(table)
    }
}

/// Catalog backed by a live connection.
pub struct ConnectionCatalog<'c, C: Connection> {
    conn: &'c C,
    introspector: Introspector,
}

impl<'c, C: Connection> ConnectionCatalog<'c, C> {
    pub fn new(conn: &'c C, introspector: Introspector) -> Self {
        Self { conn, introspector }
    }
}

impl<C: Connection> SchemaCatalog for ConnectionCatalog<'_, C> {
    fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, Error> {
        self.introspector.columns(self.conn, table)
    }
}

/// Whether a column accepts NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nullability {
    Nullable,
    NotNull,
    /// The catalog has no such column (or no such table).
    Unknown,
}

impl From<bool> for Nullability {
    fn from(nullable: bool) -> Self {
        if nullable {
            Nullability::Nullable
        } else {
            Nullability::NotNull
        }
    }
}

/// Nullability answers for one database, keyed by (table, column).
///
/// Schema does not change while the process runs, so entries never expire.
/// Share one cache between inspectors of the same database with `Arc`;
/// never between databases.
#[derive(Debug, Default)]
pub struct NullabilityCache {
    entries: RwLock<HashMap<(String, String), Nullability>>,
}

impl NullabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, table: &str, column: &str) -> Option<Nullability> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(table.to_string(), column.to_string()))
            .copied()
    }

    /// Record every column of `table` from one catalog listing.
    fn fill(&self, table: &str, columns: &[ColumnInfo]) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for column in columns {
            entries.insert(
                (table.to_string(), column.name.clone()),
                Nullability::from(column.nullable),
            );
        }
    }

    fn insert(&self, table: &str, column: &str, nullability: Nullability) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((table.to_string(), column.to_string()), nullability);
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Answers nullability questions from a catalog, through a shared cache.
pub struct SchemaInspector<K> {
    catalog: K,
    cache: Arc<NullabilityCache>,
}

impl<K: SchemaCatalog> SchemaInspector<K> {
    /// Inspector with a cache of its own.
    pub fn new(catalog: K) -> Self {
        Self::with_cache(catalog, Arc::new(NullabilityCache::new()))
    }

    /// Inspector sharing an existing cache.
    pub fn with_cache(catalog: K, cache: Arc<NullabilityCache>) -> Self {
        Self { catalog, cache }
    }

    pub fn cache(&self) -> &Arc<NullabilityCache> {
        &self.cache
    }

    /// Nullability of `table.column`.
    ///
    /// A cache miss lists the whole table once and caches every column, plus
    /// `Unknown` for the requested column if the table lacks it. Catalog
    /// errors are returned and not cached.
    pub fn nullability(&self, table: &str, column: &str) -> Result<Nullability, Error> {
        if let Some(hit) = self.cache.get(table, column) {
            return Ok(hit);
        }

        let columns = self.catalog.list_columns(table)?;
        self.cache.fill(table, &columns);

        let answer = columns
            .iter()
            .find(|c| c.name == column)
            .map_or(Nullability::Unknown, |c| Nullability::from(c.nullable));
        if answer == Nullability::Unknown {
            self.cache.insert(table, column, Nullability::Unknown);
        }

        tracing::debug!(table, column, nullability = ?answer, "inspected column nullability");
        Ok(answer)
    }

    /// `true` only when the catalog says the column accepts NULL.
    pub fn is_nullable(&self, table: &str, column: &str) -> Result<bool, Error> {
        Ok(self.nullability(table, column)? == Nullability::Nullable)
    }
}
