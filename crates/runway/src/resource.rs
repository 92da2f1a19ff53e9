//! Resource registry.
//!
//! A [`Resource`] is a configured resource with every convention applied:
//! table and display names are filled in from the handle and each
//! relationship accessor is resolved into [`RelationshipInfo`] once, at
//! load time.
//!
//! Conventions for a handle such as `blog_post`:
//!
//! | Setting | Default |
//! |---------|---------|
//! | table | `blog_posts` |
//! | singular | `Blog Post` |
//! | plural / name | `Blog Posts` |
//! | has-many foreign key | `blog_post_id` |
//! | pivot table with `tag` | `blog_post_tag` |

use crate::blueprint::Blueprint;
use crate::config::{RelationshipConfig, ResourceConfig, RunwayConfig};
use heck::{ToSnakeCase, ToTitleCase};
use runway_core::{
    BelongsToManyInfo, ConfigError, Error, HasManyInfo, LinkTableInfo, RelationshipInfo, Result,
};
use std::collections::BTreeMap;

/// Field types whose handle names a relationship accessor on the record.
const RELATIONSHIP_FIELD_TYPES: [&str; 2] = ["has_many", "belongs_to"];

/// A relationship accessor declared on a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRelationship {
    pub name: String,
    /// Handle of the target resource.
    pub target_resource: String,
    pub info: RelationshipInfo,
}

#[derive(Debug, Clone)]
pub struct Resource {
    handle: String,
    table: String,
    primary_key: String,
    name: String,
    singular: String,
    plural: String,
    read_only: bool,
    blueprint: Blueprint,
    relationships: BTreeMap<String, ResourceRelationship>,
    configured_handles: Option<Vec<String>>,
}

impl Resource {
    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Singular display name, generated from the handle unless configured.
    pub fn singular(&self) -> &str {
        &self.singular
    }

    /// Plural display name, generated from the handle unless configured.
    pub fn plural(&self) -> &str {
        &self.plural
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    /// Look up a declared relationship accessor by name.
    pub fn relationship(&self, name: &str) -> Option<&ResourceRelationship> {
        self.relationships.get(name)
    }

    pub fn relationships(&self) -> impl Iterator<Item = &ResourceRelationship> {
        self.relationships.values()
    }

    /// Relationship accessors to eager-load with this resource.
    ///
    /// The configured list when there is one; otherwise the handle of every
    /// `has_many` and `belongs_to` field in the blueprint.
    pub fn relationship_handles(&self) -> Vec<String> {
        if let Some(handles) = &self.configured_handles {
            return handles.clone();
        }

        let mut handles: Vec<String> = Vec::new();
        for field in self.blueprint.fields() {
            if RELATIONSHIP_FIELD_TYPES.contains(&field.field.field_type.as_str())
                && !handles.contains(&field.handle)
            {
                handles.push(field.handle.clone());
            }
        }
        handles
    }

    /// snake_case singular of the handle, used for key column names.
    fn singular_key(handle: &str) -> String {
        pluralizer::pluralize(&handle.to_snake_case(), 1, false)
    }

    fn plural_key(handle: &str) -> String {
        pluralizer::pluralize(&handle.to_snake_case(), 2, false)
    }

    fn from_config(handle: &str, config: &ResourceConfig) -> Self {
        let singular = config
            .singular
            .clone()
            .unwrap_or_else(|| Self::singular_key(handle).to_title_case());
        let plural = config
            .plural
            .clone()
            .unwrap_or_else(|| Self::plural_key(handle).to_title_case());

        Self {
            handle: handle.to_string(),
            table: config
                .table
                .clone()
                .unwrap_or_else(|| Self::plural_key(handle)),
            primary_key: config.primary_key.clone(),
            name: config.name.clone().unwrap_or_else(|| plural.clone()),
            singular,
            plural,
            read_only: config.read_only,
            blueprint: config.blueprint.clone(),
            relationships: BTreeMap::new(),
            configured_handles: config.relationship_handles.clone(),
        }
    }
}

/// All configured resources.
#[derive(Debug, Clone, Default)]
pub struct Runway {
    resources: BTreeMap<String, Resource>,
}

impl Runway {
    /// Validate a configuration and resolve every resource in it.
    pub fn from_config(config: &RunwayConfig) -> Result<Self> {
        config.validate()?;

        let mut resources: BTreeMap<String, Resource> = config
            .resources
            .iter()
            .map(|(handle, cfg)| (handle.clone(), Resource::from_config(handle, cfg)))
            .collect();

        for (handle, cfg) in &config.resources {
            let mut resolved = BTreeMap::new();
            for (name, relationship) in &cfg.relationships {
                let target = resources.get(relationship.resource()).ok_or_else(|| {
                    Error::Config(ConfigError::new(format!(
                        "resource '{}': relationship '{}' targets unknown resource '{}'",
                        handle,
                        name,
                        relationship.resource()
                    )))
                })?;
                let info = resolve_relationship(handle, relationship, target);
                resolved.insert(
                    name.clone(),
                    ResourceRelationship {
                        name: name.clone(),
                        target_resource: target.handle.clone(),
                        info,
                    },
                );
            }
            if let Some(resource) = resources.get_mut(handle) {
                resource.relationships = resolved;
            }
        }

        tracing::info!(resources = resources.len(), "resources registered");
        Ok(Self { resources })
    }

    /// Parse, validate and resolve a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_config(&RunwayConfig::from_json_str(json)?)
    }

    pub fn find_resource(&self, handle: &str) -> Option<&Resource> {
        self.resources.get(handle)
    }

    /// Like [`find_resource`](Self::find_resource), failing with a
    /// configuration error for an unknown handle.
    pub fn resource(&self, handle: &str) -> Result<&Resource> {
        self.find_resource(handle).ok_or_else(|| {
            Error::Config(ConfigError::new(format!(
                "resource '{}' is not registered",
                handle
            )))
        })
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }
}

fn resolve_relationship(
    owner_handle: &str,
    relationship: &RelationshipConfig,
    target: &Resource,
) -> RelationshipInfo {
    let owner_key = format!("{}_id", Resource::singular_key(owner_handle));

    match relationship {
        RelationshipConfig::HasMany { foreign_key, .. } => RelationshipInfo::HasMany(HasManyInfo {
            related_table: target.table.clone(),
            related_key: target.primary_key.clone(),
            foreign_key: foreign_key.clone().unwrap_or(owner_key),
        }),
        RelationshipConfig::BelongsToMany {
            pivot_table,
            foreign_pivot_key,
            related_pivot_key,
            ..
        } => {
            let target_singular = Resource::singular_key(&target.handle);
            let table = pivot_table.clone().unwrap_or_else(|| {
                let mut names = [Resource::singular_key(owner_handle), target_singular.clone()];
                names.sort();
                names.join("_")
            });
            RelationshipInfo::BelongsToMany(BelongsToManyInfo {
                related_table: target.table.clone(),
                related_key: target.primary_key.clone(),
                link_table: LinkTableInfo::new(
                    table,
                    foreign_pivot_key.clone().unwrap_or(owner_key),
                    related_pivot_key
                        .clone()
                        .unwrap_or_else(|| format!("{}_id", target_singular)),
                ),
            })
        }
    }
}
