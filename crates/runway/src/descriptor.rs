//! Classifying blueprint fields into relationship descriptors.
//!
//! A `has_many` field is backed either by a foreign key on the target table
//! or by a pivot table; the field itself does not say which. The owning
//! resource's declared accessor with the same name does, so resolution is a
//! pure lookup against configuration that was resolved at load time.

use crate::blueprint::BlueprintField;
use crate::resource::Resource;
use runway_core::{BelongsToManyInfo, HasManyInfo, RelationshipInfo};

/// Field type handled by the synchronizer.
pub const HAS_MANY_FIELD: &str = "has_many";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationKind {
    HasMany(HasManyInfo),
    BelongsToMany(BelongsToManyInfo),
    /// Anything the synchronizer must leave alone.
    NotARelationship,
}

/// What the synchronizer needs to know about one blueprint field.
///
/// Derived fresh for every save and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipFieldDescriptor {
    pub handle: String,
    pub kind: RelationKind,
    pub target_resource: Option<String>,
    /// Column receiving each target's position. Set only for reorderable
    /// fields: on the target table for has-many, on the pivot table for
    /// belongs-to-many.
    pub order_column: Option<String>,
    /// Computed or `save: false`; never written.
    pub computed_or_unsaved: bool,
}

impl RelationshipFieldDescriptor {
    pub fn not_a_relationship(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            kind: RelationKind::NotARelationship,
            target_resource: None,
            order_column: None,
            computed_or_unsaved: false,
        }
    }

    pub fn is_reorderable(&self) -> bool {
        self.order_column.is_some()
    }

    pub fn is_relationship(&self) -> bool {
        !matches!(self.kind, RelationKind::NotARelationship)
    }

    /// Will the synchronizer act on this field?
    pub fn participates(&self) -> bool {
        self.is_relationship() && !self.computed_or_unsaved
    }
}

/// Resolves fields against one owning resource.
pub struct DescriptorResolver<'r> {
    owner: &'r Resource,
}

impl<'r> DescriptorResolver<'r> {
    pub fn new(owner: &'r Resource) -> Self {
        Self { owner }
    }

    /// Classify one field. Unclassifiable fields resolve to
    /// `NotARelationship`; this never fails.
    pub fn resolve(&self, field: &BlueprintField) -> RelationshipFieldDescriptor {
        let config = &field.field;
        if config.field_type != HAS_MANY_FIELD {
            return RelationshipFieldDescriptor::not_a_relationship(&field.handle);
        }

        let Some(relationship) = self.owner.relationship(&field.handle) else {
            tracing::debug!(
                resource = self.owner.handle(),
                field = %field.handle,
                "has_many field has no matching relationship accessor"
            );
            return RelationshipFieldDescriptor::not_a_relationship(&field.handle);
        };

        if let Some(resource) = &config.resource {
            if *resource != relationship.target_resource {
                tracing::warn!(
                    resource = self.owner.handle(),
                    field = %field.handle,
                    field_target = %resource,
                    accessor_target = %relationship.target_resource,
                    "field and relationship accessor target different resources"
                );
                return RelationshipFieldDescriptor::not_a_relationship(&field.handle);
            }
        }

        let order_column = match (&config.order_column, config.reorderable) {
            (Some(column), true) => Some(column.clone()),
            (None, true) => {
                tracing::warn!(
                    resource = self.owner.handle(),
                    field = %field.handle,
                    "reorderable field has no order_column; positions will not be written"
                );
                None
            }
            (_, false) => None,
        };

        let kind = match &relationship.info {
            RelationshipInfo::HasMany(info) => RelationKind::HasMany(info.clone()),
            RelationshipInfo::BelongsToMany(info) => RelationKind::BelongsToMany(info.clone()),
        };

        RelationshipFieldDescriptor {
            handle: field.handle.clone(),
            kind,
            target_resource: Some(relationship.target_resource.clone()),
            order_column,
            computed_or_unsaved: config.is_computed_or_unsaved(),
        }
    }

    /// Descriptors for every inline field of the owner's blueprint.
    pub fn resolve_blueprint(&self) -> Vec<RelationshipFieldDescriptor> {
        self.owner
            .blueprint()
            .fields()
            .map(|field| self.resolve(field))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::FieldConfig;
    use crate::resource::Runway;
    use runway_core::LinkTableInfo;

    fn runway() -> Runway {
        Runway::from_json_str(
            r#"{"resources": {
                "author": {"relationships": {
                    "posts": {"kind": "has_many", "resource": "post"},
                    "pivottedPosts": {"kind": "belongs_to_many", "resource": "post", "pivot_table": "post_author"}
                }},
                "post": {}
            }}"#,
        )
        .unwrap()
    }

    fn resolve(field: BlueprintField) -> RelationshipFieldDescriptor {
        let runway = runway();
        DescriptorResolver::new(runway.find_resource("author").unwrap()).resolve(&field)
    }

    #[test]
    fn test_has_many_accessor() {
        let descriptor = resolve(BlueprintField::new(
            "posts",
            FieldConfig::new("has_many").resource("post"),
        ));
        assert_eq!(
            descriptor.kind,
            RelationKind::HasMany(HasManyInfo {
                related_table: "posts".into(),
                related_key: "id".into(),
                foreign_key: "author_id".into(),
            })
        );
        assert_eq!(descriptor.target_resource.as_deref(), Some("post"));
        assert!(!descriptor.is_reorderable());
        assert!(descriptor.participates());
    }

    #[test]
    fn test_pivot_accessor_with_same_field_type() {
        let descriptor = resolve(BlueprintField::new(
            "pivottedPosts",
            FieldConfig::new("has_many")
                .resource("post")
                .ordered_by("pivot_sort_order"),
        ));
        match &descriptor.kind {
            RelationKind::BelongsToMany(info) => {
                assert_eq!(info.link_table, LinkTableInfo::new("post_author", "author_id", "post_id"));
            }
            other => panic!("expected belongs_to_many, got {other:?}"),
        }
        assert_eq!(descriptor.order_column.as_deref(), Some("pivot_sort_order"));
        assert!(descriptor.is_reorderable());
    }

    #[test]
    fn test_other_field_types_are_not_relationships() {
        for field_type in ["text", "belongs_to", "entries", "markdown"] {
            let descriptor = resolve(BlueprintField::new("posts", FieldConfig::new(field_type)));
            assert_eq!(descriptor.kind, RelationKind::NotARelationship);
            assert!(!descriptor.participates());
        }
    }

    #[test]
    fn test_unknown_accessor_is_not_a_relationship() {
        let descriptor = resolve(BlueprintField::new(
            "comments",
            FieldConfig::new("has_many").resource("post"),
        ));
        assert_eq!(descriptor.kind, RelationKind::NotARelationship);
    }

    #[test]
    fn test_mismatched_target_is_not_a_relationship() {
        let descriptor = resolve(BlueprintField::new(
            "posts",
            FieldConfig::new("has_many").resource("author"),
        ));
        assert_eq!(descriptor.kind, RelationKind::NotARelationship);
    }

    #[test]
    fn test_order_column_requires_reorderable() {
        let without_flag = resolve(BlueprintField::new(
            "posts",
            FieldConfig {
                order_column: Some("sort_order".into()),
                ..FieldConfig::new("has_many")
            },
        ));
        assert!(!without_flag.is_reorderable());

        let without_column = resolve(BlueprintField::new(
            "posts",
            FieldConfig {
                reorderable: true,
                ..FieldConfig::new("has_many")
            },
        ));
        assert!(!without_column.is_reorderable());
        assert!(without_column.order_column.is_none());
    }

    #[test]
    fn test_computed_and_unsaved_flagged() {
        let computed = resolve(BlueprintField::new(
            "posts",
            FieldConfig {
                visibility: Some("computed".into()),
                ..FieldConfig::new("has_many")
            },
        ));
        assert!(computed.is_relationship());
        assert!(computed.computed_or_unsaved);
        assert!(!computed.participates());

        let unsaved = resolve(BlueprintField::new(
            "pivottedPosts",
            FieldConfig {
                save: Some(false),
                ..FieldConfig::new("has_many")
            },
        ));
        assert!(!unsaved.participates());
    }

    #[test]
    fn test_resolve_blueprint() {
        let runway = Runway::from_json_str(
            r#"{"resources": {
                "author": {
                    "relationships": {"posts": {"kind": "has_many", "resource": "post"}},
                    "blueprint": {"tabs": {"main": {"fields": [
                        {"handle": "name", "field": {"type": "text"}},
                        {"handle": "posts", "field": {"type": "has_many", "resource": "post"}}
                    ]}}}
                },
                "post": {}
            }}"#,
        )
        .unwrap();
        let descriptors =
            DescriptorResolver::new(runway.find_resource("author").unwrap()).resolve_blueprint();
        assert_eq!(descriptors.len(), 2);
        assert!(!descriptors[0].is_relationship());
        assert!(descriptors[1].participates());
    }
}
