//! Schema introspection for Runway.
//!
//! - [`Introspector`] lists a table's columns per SQL dialect
//! - [`Dialect`] also quotes identifiers and numbers bind parameters
//! - [`SchemaCatalog`] is the read-only port the synchronizer depends on
//! - [`SchemaInspector`] answers per-column nullability through a
//!   [`NullabilityCache`] that may outlive a single save

pub mod inspector;
pub mod introspect;

pub use inspector::{
    ConnectionCatalog, Nullability, NullabilityCache, SchemaCatalog, SchemaInspector,
};
pub use introspect::{ColumnInfo, Dialect, Introspector};
