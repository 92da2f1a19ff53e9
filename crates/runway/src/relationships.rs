//! Save entry point.
//!
//! ```ignore
//! Relationships::for_record(&runway, &RecordRef::new("author", 1))
//!     .with(FieldValues::from_json_str(r#"{"posts": [3, 1, 2]}"#)?)
//!     .save(&conn)?;
//! ```

use crate::descriptor::DescriptorResolver;
use crate::resource::Runway;
use crate::store::SqlRelationStore;
use crate::sync::{FieldValues, Synchronizer};
use runway_core::{ConfigError, Connection, Error, IsolationLevel, OwningRecord, Result};
use runway_schema::{ConnectionCatalog, Dialect, Introspector, NullabilityCache, SchemaInspector};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// Nullability answers for one named database, shared by every save in the
/// process that targets it.
///
/// Schemas differ between databases, so answers are never shared across
/// names or dialects.
pub fn shared_nullability_cache(dialect: Dialect, database: &str) -> Arc<NullabilityCache> {
    static CACHES: OnceLock<Mutex<HashMap<(Dialect, String), Arc<NullabilityCache>>>> =
        OnceLock::new();
    let mut caches = CACHES
        .get_or_init(Mutex::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    Arc::clone(
        caches
            .entry((dialect, database.to_string()))
            .or_insert_with(|| Arc::new(NullabilityCache::new())),
    )
}

/// The cache a save uses when none was given: shared per database when the
/// connection names one, private to the save otherwise.
fn default_nullability_cache<C: Connection>(conn: &C, dialect: Dialect) -> Arc<NullabilityCache> {
    match conn.database_name() {
        Some(name) => shared_nullability_cache(dialect, &name),
        None => {
            tracing::debug!("unnamed database; nullability cached for this save only");
            Arc::new(NullabilityCache::new())
        }
    }
}

/// Builder for one relationship save.
pub struct Relationships<'a, O: OwningRecord + ?Sized> {
    runway: &'a Runway,
    owner: &'a O,
    values: FieldValues,
    isolation: IsolationLevel,
    dialect: Dialect,
    cache: Option<Arc<NullabilityCache>>,
}

impl<'a, O: OwningRecord + ?Sized> Relationships<'a, O> {
    pub fn for_record(runway: &'a Runway, owner: &'a O) -> Self {
        Self {
            runway,
            owner,
            values: FieldValues::new(),
            isolation: IsolationLevel::default(),
            dialect: Dialect::default(),
            cache: None,
        }
    }

    pub fn with(mut self, values: FieldValues) -> Self {
        self.values = values;
        self
    }

    pub fn isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    /// Dialect used to render statements and read column nullability.
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Use `cache` instead of the connection's shared nullability cache.
    pub fn nullability_cache(mut self, cache: Arc<NullabilityCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Synchronize every relationship field of the owner's blueprint that
    /// has a value, in one transaction on `conn`.
    pub fn save<C: Connection>(self, conn: &C) -> Result<()> {
        let resource = self.runway.resource(self.owner.resource_handle())?;
        if resource.read_only() {
            return Err(Error::Config(ConfigError::new(format!(
                "resource '{}' is read-only; relationships cannot be saved",
                resource.handle()
            ))));
        }

        let descriptors = DescriptorResolver::new(resource).resolve_blueprint();
        let store = SqlRelationStore::new(conn)
            .with_isolation(self.isolation)
            .with_dialect(self.dialect);
        let cache = match self.cache {
            Some(cache) => cache,
            None => default_nullability_cache(conn, self.dialect),
        };
        let inspector = SchemaInspector::with_cache(
            ConnectionCatalog::new(conn, Introspector::new(self.dialect)),
            cache,
        );

        Synchronizer::new(&store, &inspector).synchronize(self.owner, &self.values, &descriptors)
    }
}
