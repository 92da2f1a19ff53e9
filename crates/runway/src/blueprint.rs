//! Blueprints: the field definitions behind a resource's edit form.
//!
//! ```json
//! { "tabs": { "main": {
//!     "fields": [ { "handle": "posts", "field": { "type": "has_many", "resource": "post" } } ],
//!     "sections": [ { "display": "SEO", "fields": [ { "import": "seo" } ] } ]
//! } } }
//! ```
//!
//! Tabs keep their document order. Fieldset imports are carried through
//! but never resolved here; the relationship layer only looks at inline
//! fields.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Field visibility value that marks a field as computed.
pub const VISIBILITY_COMPUTED: &str = "computed";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Blueprint {
    tabs: Vec<(String, Tab)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldEntry>,
}

/// One entry in a `fields` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldEntry {
    Field(BlueprintField),
    Import(FieldsetImport),
}

/// `{"import": "seo", "prefix": "seo_"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldsetImport {
    pub import: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintField {
    pub handle: String,
    pub field: FieldConfig,
}

/// A field's configuration. Options the relationship layer does not read
/// are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(rename = "type")]
    pub field_type: String,

    /// Target resource handle for relationship fieldtypes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,

    #[serde(default)]
    pub reorderable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_column: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,

    /// `false` keeps the field out of every save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save: Option<bool>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl FieldConfig {
    pub fn new(field_type: impl Into<String>) -> Self {
        Self {
            field_type: field_type.into(),
            ..Self::default()
        }
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn ordered_by(mut self, column: impl Into<String>) -> Self {
        self.reorderable = true;
        self.order_column = Some(column.into());
        self
    }

    pub fn is_computed(&self) -> bool {
        self.visibility.as_deref() == Some(VISIBILITY_COMPUTED)
    }

    pub fn is_computed_or_unsaved(&self) -> bool {
        self.is_computed() || self.save == Some(false)
    }
}

impl BlueprintField {
    pub fn new(handle: impl Into<String>, field: FieldConfig) -> Self {
        Self {
            handle: handle.into(),
            field,
        }
    }
}

impl Blueprint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a blueprint document.
    pub fn from_json_str(json: &str) -> runway_core::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Append a field to the named tab, creating the tab if needed.
    pub fn with_field(mut self, tab: &str, field: BlueprintField) -> Self {
        let entry = FieldEntry::Field(field);
        match self.tabs.iter_mut().find(|(name, _)| name == tab) {
            Some((_, existing)) => existing.fields.push(entry),
            None => self.tabs.push((
                tab.to_string(),
                Tab {
                    fields: vec![entry],
                    ..Tab::default()
                },
            )),
        }
        self
    }

    pub fn tabs(&self) -> impl Iterator<Item = (&str, &Tab)> {
        self.tabs.iter().map(|(name, tab)| (name.as_str(), tab))
    }

    pub fn is_empty(&self) -> bool {
        self.fields().next().is_none()
    }

    /// Inline fields in document order: each tab's own fields, then its
    /// sections' fields. Imports are skipped.
    pub fn fields(&self) -> impl Iterator<Item = &BlueprintField> {
        self.tabs.iter().flat_map(|(_, tab)| {
            tab.fields
                .iter()
                .chain(tab.sections.iter().flat_map(|section| section.fields.iter()))
                .filter_map(|entry| match entry {
                    FieldEntry::Field(field) => Some(field),
                    FieldEntry::Import(_) => None,
                })
        })
    }

    pub fn field(&self, handle: &str) -> Option<&BlueprintField> {
        self.fields().find(|f| f.handle == handle)
    }
}

#[derive(Deserialize)]
struct RawBlueprint {
    #[serde(default, deserialize_with = "ordered_tabs")]
    tabs: Vec<(String, Tab)>,
}

impl<'de> Deserialize<'de> for Blueprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawBlueprint::deserialize(deserializer)?;
        Ok(Self { tabs: raw.tabs })
    }
}

impl Serialize for Blueprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Tabs<'a>(&'a [(String, Tab)]);

        impl Serialize for Tabs<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (name, tab) in self.0 {
                    map.serialize_entry(name, tab)?;
                }
                map.end()
            }
        }

        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("tabs", &Tabs(&self.tabs))?;
        map.end()
    }
}

/// Deserialize a JSON object into entries in document order.
fn ordered_tabs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<(String, Tab)>, D::Error> {
    struct OrderedTabs;

    impl<'de> Visitor<'de> for OrderedTabs {
        type Value = Vec<(String, Tab)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of tab handles to tabs")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut tabs = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((name, tab)) = access.next_entry::<String, Tab>()? {
                tabs.push((name, tab));
            }
            Ok(tabs)
        }
    }

    deserializer.deserialize_map(OrderedTabs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTHOR: &str = r#"{
        "tabs": {
            "main": {
                "fields": [
                    { "handle": "name", "field": { "type": "text", "validate": "required" } },
                    { "handle": "posts", "field": { "type": "has_many", "resource": "post",
                                                    "reorderable": true, "order_column": "sort_order" } }
                ],
                "sections": [
                    { "display": "Meta", "fields": [ { "import": "seo", "prefix": "seo_" } ] }
                ]
            },
            "sidebar": {
                "sections": [
                    { "fields": [
                        { "handle": "pivottedPosts", "field": { "type": "has_many", "resource": "post",
                                                                "visibility": "computed", "save": false } }
                    ] }
                ]
            }
        }
    }"#;

    #[test]
    fn test_fields_in_document_order() {
        let blueprint = Blueprint::from_json_str(AUTHOR).unwrap();
        let handles: Vec<&str> = blueprint.fields().map(|f| f.handle.as_str()).collect();
        assert_eq!(handles, vec!["name", "posts", "pivottedPosts"]);

        let tabs: Vec<&str> = blueprint.tabs().map(|(name, _)| name).collect();
        assert_eq!(tabs, vec!["main", "sidebar"]);
    }

    #[test]
    fn test_tab_order_is_not_alphabetical() {
        let blueprint = Blueprint::from_json_str(
            r#"{"tabs": {"zeta": {"fields": [{"handle": "a", "field": {"type": "text"}}]},
                         "alpha": {"fields": [{"handle": "b", "field": {"type": "text"}}]}}}"#,
        )
        .unwrap();
        let handles: Vec<&str> = blueprint.fields().map(|f| f.handle.as_str()).collect();
        assert_eq!(handles, vec!["a", "b"]);
    }

    #[test]
    fn test_imports_skipped_but_kept() {
        let blueprint = Blueprint::from_json_str(AUTHOR).unwrap();
        assert!(blueprint.field("seo").is_none());
        let imports: Vec<&str> = blueprint
            .tabs()
            .flat_map(|(_, tab)| {
                tab.fields
                    .iter()
                    .chain(tab.sections.iter().flat_map(|section| section.fields.iter()))
            })
            .filter_map(|entry| match entry {
                FieldEntry::Import(import) => Some(import.import.as_str()),
                FieldEntry::Field(_) => None,
            })
            .collect();
        assert_eq!(imports, vec!["seo"]);
    }

    #[test]
    fn test_field_options() {
        let blueprint = Blueprint::from_json_str(AUTHOR).unwrap();

        let posts = &blueprint.field("posts").unwrap().field;
        assert_eq!(posts.field_type, "has_many");
        assert_eq!(posts.resource.as_deref(), Some("post"));
        assert!(posts.reorderable);
        assert_eq!(posts.order_column.as_deref(), Some("sort_order"));
        assert!(!posts.is_computed_or_unsaved());

        let pivotted = &blueprint.field("pivottedPosts").unwrap().field;
        assert!(pivotted.is_computed());
        assert!(pivotted.is_computed_or_unsaved());

        let name = &blueprint.field("name").unwrap().field;
        assert_eq!(name.extra.get("validate"), Some(&serde_json::json!("required")));
    }

    #[test]
    fn test_save_false_alone_excludes_field() {
        let field = FieldConfig {
            save: Some(false),
            ..FieldConfig::new("has_many")
        };
        assert!(!field.is_computed());
        assert!(field.is_computed_or_unsaved());
    }

    #[test]
    fn test_empty_blueprint() {
        let blueprint = Blueprint::from_json_str("{}").unwrap();
        assert!(blueprint.is_empty());
        assert!(Blueprint::new().is_empty());
    }

    #[test]
    fn test_builder_and_serialize() {
        let blueprint = Blueprint::new()
            .with_field(
                "main",
                BlueprintField::new("posts", FieldConfig::new("has_many").resource("post")),
            )
            .with_field(
                "main",
                BlueprintField::new(
                    "pivottedPosts",
                    FieldConfig::new("has_many")
                        .resource("post")
                        .ordered_by("pivot_sort_order"),
                ),
            );
        assert_eq!(blueprint.tabs().count(), 1);

        let json = serde_json::to_string(&blueprint).unwrap();
        let parsed = Blueprint::from_json_str(&json).unwrap();
        assert_eq!(parsed, blueprint);
    }
}
