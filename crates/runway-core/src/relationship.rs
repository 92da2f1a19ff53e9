//! Relationship metadata.
//!
//! Relationships are declared in resource configuration and resolved once,
//! when the configuration is loaded, into one of the tagged variants below.
//! Nothing at synchronization time probes a live record to discover the
//! shape of a relationship.

/// Foreign-key side of a one-to-many relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HasManyInfo {
    /// Target table (e.g., `"posts"`).
    pub related_table: String,

    /// Primary key column of the target table.
    pub related_key: String,

    /// Column on the target table referencing the owner (e.g., `"author_id"`).
    pub foreign_key: String,
}

/// A pivot table joining two resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTableInfo {
    /// The pivot table name (e.g., `"post_author"`).
    pub table_name: String,

    /// Column pointing to the owning record (e.g., `"author_id"`).
    pub local_column: String,

    /// Column pointing to the target record (e.g., `"post_id"`).
    pub remote_column: String,
}

impl LinkTableInfo {
    pub fn new(
        table_name: impl Into<String>,
        local_column: impl Into<String>,
        remote_column: impl Into<String>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            local_column: local_column.into(),
            remote_column: remote_column.into(),
        }
    }
}

/// Many-to-many side of a relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BelongsToManyInfo {
    /// Target table.
    pub related_table: String,

    /// Primary key column of the target table.
    pub related_key: String,

    pub link_table: LinkTableInfo,
}

/// A resolved relationship declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationshipInfo {
    HasMany(HasManyInfo),
    BelongsToMany(BelongsToManyInfo),
}
