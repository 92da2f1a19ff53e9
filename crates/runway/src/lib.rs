//! Runway - blueprint-driven relationship synchronization.
//!
//! Resources declare their tables, blueprints and relationship accessors in
//! a JSON configuration. When an editor saves a record, the submitted ids for
//! each `has_many` field are reconciled against the database in one
//! transaction:
//!
//! - foreign-key relationships link, detach or delete target rows depending
//!   on whether the foreign key is nullable
//! - pivot relationships attach and detach pivot rows
//! - reorderable fields store each target's position in an order column
//!
//! # Quick Start
//!
//! ```ignore
//! use runway::prelude::*;
//! use runway_sqlite::SqliteConnection;
//!
//! let runway = Runway::from_json_str(r#"{
//!     "resources": {
//!         "author": {
//!             "relationships": { "posts": { "kind": "has_many", "resource": "post" } },
//!             "blueprint": { "tabs": { "main": { "fields": [
//!                 { "handle": "posts",
//!                   "field": { "type": "has_many", "resource": "post",
//!                              "reorderable": true, "order_column": "sort_order" } }
//!             ] } } }
//!         },
//!         "post": {}
//!     }
//! }"#)?;
//!
//! let conn = SqliteConnection::open_file("blog.db")?;
//! Relationships::for_record(&runway, &RecordRef::new("author", 1))
//!     .with(FieldValues::new().set("posts", [3i64, 1, 2]))
//!     .save(&conn)?;
//! ```

pub mod blueprint;
pub mod config;
pub mod descriptor;
pub mod relationships;
pub mod resource;
pub mod store;
pub mod sync;

pub use blueprint::{
    Blueprint, BlueprintField, FieldConfig, FieldEntry, FieldsetImport, Section, Tab,
};
pub use config::{RelationshipConfig, ResourceConfig, RunwayConfig};
pub use descriptor::{DescriptorResolver, RelationKind, RelationshipFieldDescriptor};
pub use relationships::{Relationships, shared_nullability_cache};
pub use resource::{Resource, ResourceRelationship, Runway};
pub use store::{RelationOp, RelationStore, SqlRelationStore};
pub use sync::{FieldValues, Reconciliation, Synchronizer, dedupe};

pub use runway_core::{
    Connection, Error, IsolationLevel, OwningRecord, RecordId, RecordRef, Result, SyncError,
    SyncErrorKind, Value,
};
pub use runway_schema::{Dialect, Nullability, NullabilityCache, SchemaCatalog, SchemaInspector};

/// Everything needed to configure resources and save relationships.
pub mod prelude {
    pub use crate::{
        Error, FieldValues, OwningRecord, RecordId, RecordRef, Relationships, Result, Runway,
    };
}
