//! Record identifiers and owning records.

use crate::error::{Error, TypeError};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary key of a persisted record.
///
/// Keys arrive from forms as integers or strings and from the database as
/// whatever storage class the column uses. Submitted strings are normalized
/// on the way in, so a form value of `"12"` becomes `Int(12)` and binds as
/// a BIGINT. Keys read back from a column keep that column's storage class:
/// a TEXT key `"12"` stays `Text("12")` and binds as text. Compare a
/// submitted id with a stored one through [`RecordId::normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl RecordId {
    /// Canonical form: a string holding a canonical integer becomes `Int`.
    ///
    /// `"12"` normalizes to `Int(12)`; `"012"`, `"+12"` and `"12.0"` stay text.
    #[must_use]
    pub fn normalize(self) -> Self {
        match self {
            RecordId::Text(s) => match s.parse::<i64>() {
                Ok(n) if n.to_string() == s => RecordId::Int(n),
                _ => RecordId::Text(s),
            },
            id @ RecordId::Int(_) => id,
        }
    }

    /// Read a key out of a result column, keeping its storage class.
    #[allow(clippy::result_large_err)]
    pub fn from_value(value: &Value) -> crate::Result<Self> {
        match value {
            Value::Int(v) => Ok(RecordId::Int(i64::from(*v))),
            Value::BigInt(v) => Ok(RecordId::Int(*v)),
            Value::Text(s) => Ok(RecordId::Text(s.clone())),
            other => Err(Error::Type(TypeError {
                expected: "record key",
                actual: other.type_name().to_string(),
                column: None,
            })),
        }
    }

    /// The value bound when this key is written or compared in SQL: `Int`
    /// as BIGINT, `Text` as text.
    pub fn to_value(&self) -> Value {
        match self {
            RecordId::Int(v) => Value::BigInt(*v),
            RecordId::Text(s) => Value::Text(s.clone()),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(v) => write!(f, "{}", v),
            RecordId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(v: i64) -> Self {
        RecordId::Int(v)
    }
}

impl From<i32> for RecordId {
    fn from(v: i32) -> Self {
        RecordId::Int(i64::from(v))
    }
}

impl From<&str> for RecordId {
    fn from(v: &str) -> Self {
        RecordId::Text(v.to_string()).normalize()
    }
}

impl From<String> for RecordId {
    fn from(v: String) -> Self {
        RecordId::Text(v).normalize()
    }
}

impl From<RecordId> for Value {
    fn from(id: RecordId) -> Self {
        match id {
            RecordId::Int(v) => Value::BigInt(v),
            RecordId::Text(s) => Value::Text(s),
        }
    }
}

impl From<&RecordId> for Value {
    fn from(id: &RecordId) -> Self {
        id.to_value()
    }
}

/// A persisted entity that can own relationships.
pub trait OwningRecord {
    /// Handle of the resource this record belongs to.
    fn resource_handle(&self) -> &str;

    /// The record's primary key.
    fn key(&self) -> RecordId;
}

/// Plain reference to an owning record: resource handle plus key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRef {
    pub resource: String,
    pub key: RecordId,
}

impl RecordRef {
    pub fn new(resource: impl Into<String>, key: impl Into<RecordId>) -> Self {
        Self {
            resource: resource.into(),
            key: key.into(),
        }
    }
}

impl OwningRecord for RecordRef {
    fn resource_handle(&self) -> &str {
        &self.resource
    }

    fn key(&self) -> RecordId {
        self.key.clone()
    }
}
