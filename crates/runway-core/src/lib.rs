//! Core types and traits for Runway.
//!
//! - `Value` and `Row` for parameter binding and result fetching
//! - `RecordId` and `OwningRecord` for the records relationships hang off
//! - `Connection` trait for synchronous database connections
//! - Relationship metadata resolved from resource configuration
//! - The workspace `Error` type

pub mod connection;
pub mod error;
pub mod identifiers;
pub mod record;
pub mod relationship;
pub mod row;
pub mod value;

pub use connection::{Connection, IsolationLevel, TransactionOps};
pub use error::{
    ConfigError, ConnectionError, ConnectionErrorKind, Error, QueryError, QueryErrorKind, Result,
    SchemaError, SchemaErrorKind, SyncError, SyncErrorKind, TransactionError,
    TransactionErrorKind, TypeError,
};
pub use identifiers::{quote_ident, quote_ident_mysql};
pub use record::{OwningRecord, RecordId, RecordRef};
pub use relationship::{BelongsToManyInfo, HasManyInfo, LinkTableInfo, RelationshipInfo};
pub use row::{ColumnInfo, FromValue, Row};
pub use value::Value;
