use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tiling direction of a collection.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Items fill rows top-to-bottom (row-major).
    #[default]
    Vertical,
    /// Items fill columns left-to-right (column-major).
    Horizontal,
}

/// Maps one scalar record field to a cell reference relative to the entity
/// region (or anchored, `Ref#dx,dy`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldTemplate {
    pub name: String,
    pub range: String,
}

/// Template for one record: its footprint, scalar fields and nested
/// collections.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityTemplate {
    /// Footprint of the first item, relative to the collection region.
    pub range: String,
    /// When true, a fully-blank entity is returned as an all-default record
    /// instead of terminating iteration.
    #[serde(default)]
    pub allow_null: bool,
    #[serde(default)]
    pub fields: Vec<FieldTemplate>,
    #[serde(default)]
    pub collections: Vec<CollectionTemplate>,
}

impl EntityTemplate {
    /// Find a nested collection template by name.
    pub fn collection(&self, name: &str) -> Result<&CollectionTemplate, ConfigError> {
        self.collections
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| ConfigError::CollectionNotFound(name.to_string()))
    }
}

/// Template for a tiled collection of records.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionTemplate {
    #[serde(default)]
    pub name: String,
    /// The collection region: sheet-qualified or a defined name at top
    /// level, relative to the parent entity when nested. May be open-ended.
    pub range: String,
    #[serde(default)]
    pub orientation: Orientation,
    /// Optional boundary marker: iteration ends before the row (vertical)
    /// or column (horizontal) this reference resolves to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_before: Option<String>,
    pub item_template: EntityTemplate,
}

/// Parser registration entry: a configured name bound to a registered
/// source kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParserConfig {
    pub name: String,
    pub kind: String,
}

/// A named template bound to a parser.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub name: String,
    pub parser: String,
    #[serde(default)]
    pub collections: Vec<CollectionTemplate>,
}

impl TemplateConfig {
    /// The first collection, the one driven by single-collection loads.
    pub fn primary_collection(&self) -> Result<&CollectionTemplate, ConfigError> {
        self.collections
            .first()
            .ok_or_else(|| ConfigError::NoCollections(self.name.clone()))
    }
}

/// Root configuration shape.
///
/// Loading this from a file is the embedding application's concern; the
/// engine only consumes the deserialized value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformerConfig {
    #[serde(default)]
    pub parsers: Vec<ParserConfig>,
    #[serde(default)]
    pub templates: Vec<TemplateConfig>,
}

impl TransformerConfig {
    pub fn template(&self, name: &str) -> Result<&TemplateConfig, ConfigError> {
        self.templates
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| ConfigError::TemplateNotFound(name.to_string()))
    }

    pub fn parser(&self, name: &str) -> Result<&ParserConfig, ConfigError> {
        self.parsers
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ConfigError::ParserNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_the_documented_shape() {
        let json = r#"{
            "parsers": [{"name": "excel", "kind": "memory"}],
            "templates": [{
                "name": "Orders",
                "parser": "excel",
                "collections": [{
                    "name": "Lines",
                    "range": "Sheet1!A2:D10",
                    "orientation": "vertical",
                    "endBefore": "TotalRow",
                    "itemTemplate": {
                        "range": "A1:D1",
                        "allowNull": false,
                        "fields": [
                            {"name": "Code", "range": "A1"},
                            {"name": "Qty", "range": "B1"}
                        ]
                    }
                }]
            }]
        }"#;
        let config: TransformerConfig = serde_json::from_str(json).unwrap();
        let template = config.template("Orders").unwrap();
        let collection = template.primary_collection().unwrap();
        assert_eq!(collection.orientation, Orientation::Vertical);
        assert_eq!(collection.end_before.as_deref(), Some("TotalRow"));
        assert_eq!(collection.item_template.fields.len(), 2);
        assert!(!collection.item_template.allow_null);
    }

    #[test]
    fn lookups_report_configuration_errors() {
        let config = TransformerConfig::default();
        assert_eq!(
            config.template("missing").unwrap_err(),
            ConfigError::TemplateNotFound("missing".to_string())
        );
        assert_eq!(
            config.parser("missing").unwrap_err(),
            ConfigError::ParserNotFound("missing".to_string())
        );
    }
}
