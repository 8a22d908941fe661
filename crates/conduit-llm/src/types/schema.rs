use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Type tag of a schema node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    /// No type given, or a type this crate does not know
    #[default]
    #[serde(other)]
    Unspecified,
}

/// Vendor-neutral schema tree describing tool parameters or structured output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type", default)]
    pub schema_type: SchemaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
}

impl Schema {
    /// Schema node of the given type
    pub fn of(schema_type: SchemaType) -> Self {
        Self {
            schema_type,
            ..Self::default()
        }
    }

    /// Object schema with the given properties
    pub fn object(properties: impl IntoIterator<Item = (String, Self)>) -> Self {
        Self {
            schema_type: SchemaType::Object,
            properties: properties.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Array schema with the given item schema
    pub fn array(items: Self) -> Self {
        Self {
            schema_type: SchemaType::Array,
            items: Some(Box::new(items)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_required(mut self, required: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.required = required.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_enum(mut self, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }
}
