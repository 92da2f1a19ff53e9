//! Resource configuration.
//!
//! A JSON document declaring resources, their tables, blueprints and
//! relationships:
//!
//! ```json
//! {
//!   "resources": {
//!     "author": {
//!       "relationships": {
//!         "posts": { "kind": "has_many", "resource": "post" },
//!         "pivottedPosts": { "kind": "belongs_to_many", "resource": "post", "pivot_table": "post_author" }
//!       },
//!       "blueprint": { "tabs": { "main": { "fields": [
//!         { "handle": "posts", "field": { "type": "has_many", "resource": "post" } }
//!       ] } } }
//!     },
//!     "post": {}
//!   }
//! }
//! ```
//!
//! Anything left out follows naming conventions; see [`crate::resource`].

use crate::blueprint::Blueprint;
use regex::Regex;
use runway_core::{ConfigError, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunwayConfig {
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceConfig>,
}

/// One resource, keyed by its handle in [`RunwayConfig::resources`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Table name. Defaults to the plural of the handle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    #[serde(default = "default_primary_key")]
    pub primary_key: String,

    /// Display name. Defaults to the plural display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub singular: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plural: Option<String>,

    #[serde(default)]
    pub read_only: bool,

    /// Relationship accessors, keyed by accessor name.
    #[serde(default)]
    pub relationships: BTreeMap<String, RelationshipConfig>,

    #[serde(default)]
    pub blueprint: Blueprint,

    /// Explicit list of relationship accessors to eager-load. Replaces the
    /// list derived from the blueprint when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_handles: Option<Vec<String>>,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            table: None,
            primary_key: default_primary_key(),
            name: None,
            singular: None,
            plural: None,
            read_only: false,
            relationships: BTreeMap::new(),
            blueprint: Blueprint::default(),
            relationship_handles: None,
        }
    }
}

fn default_primary_key() -> String {
    "id".to_string()
}

/// A declared relationship accessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationshipConfig {
    /// The target table holds a foreign key to this resource.
    HasMany {
        resource: String,
        /// Defaults to `<owner singular>_id`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        foreign_key: Option<String>,
    },
    /// Many-to-many through a pivot table.
    BelongsToMany {
        resource: String,
        /// Defaults to both singular names, sorted, joined with `_`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pivot_table: Option<String>,
        /// Pivot column pointing at the owner. Defaults to `<owner singular>_id`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        foreign_pivot_key: Option<String>,
        /// Pivot column pointing at the target. Defaults to `<target singular>_id`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        related_pivot_key: Option<String>,
    },
}

impl RelationshipConfig {
    /// Handle of the target resource.
    pub fn resource(&self) -> &str {
        match self {
            RelationshipConfig::HasMany { resource, .. }
            | RelationshipConfig::BelongsToMany { resource, .. } => resource,
        }
    }

    fn configured_identifiers(&self) -> Vec<&str> {
        match self {
            RelationshipConfig::HasMany { foreign_key, .. } => {
                foreign_key.iter().map(String::as_str).collect()
            }
            RelationshipConfig::BelongsToMany {
                pivot_table,
                foreign_pivot_key,
                related_pivot_key,
                ..
            } => [pivot_table, foreign_pivot_key, related_pivot_key]
                .into_iter()
                .flatten()
                .map(String::as_str)
                .collect(),
        }
    }
}

impl RunwayConfig {
    /// Parse a configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a configuration document from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Read and parse a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Check names and references before anything is resolved.
    ///
    /// Every configured table and column must be a plain SQL identifier and
    /// every relationship must target a declared resource.
    pub fn validate(&self) -> Result<()> {
        let ident = identifier_pattern()?;
        let check = |what: &str, owner: &str, value: &str| -> Result<()> {
            if ident.is_match(value) {
                Ok(())
            } else {
                Err(config_error(format!(
                    "resource '{}': {} '{}' is not a valid identifier",
                    owner, what, value
                )))
            }
        };

        for (handle, resource) in &self.resources {
            check("handle", handle, handle)?;
            if let Some(table) = &resource.table {
                check("table", handle, table)?;
            }
            check("primary key", handle, &resource.primary_key)?;

            for (name, relationship) in &resource.relationships {
                check("relationship", handle, name)?;
                for column in relationship.configured_identifiers() {
                    check("relationship column", handle, column)?;
                }
                if !self.resources.contains_key(relationship.resource()) {
                    return Err(config_error(format!(
                        "resource '{}': relationship '{}' targets unknown resource '{}'",
                        handle,
                        name,
                        relationship.resource()
                    )));
                }
            }

            for field in resource.blueprint.fields() {
                if let Some(column) = &field.field.order_column {
                    check("order column", handle, column)?;
                }
            }
        }

        tracing::debug!(resources = self.resources.len(), "configuration validated");
        Ok(())
    }
}

fn identifier_pattern() -> Result<&'static Regex> {
    static IDENT: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    IDENT
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$"))
        .as_ref()
        .map_err(|e| {
            Error::Config(ConfigError {
                message: format!("identifier pattern failed to compile: {}", e),
                source: Some(Box::new(e.clone())),
            })
        })
}

fn config_error(message: String) -> Error {
    Error::Config(ConfigError::new(message))
}
