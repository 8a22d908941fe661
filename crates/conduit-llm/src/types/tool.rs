use serde::{Deserialize, Serialize};

use super::schema::Schema;

/// Declaration of a tool the model can call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    /// Tool name
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Parameter schema; absent for parameterless tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ToolParameters>,
}

impl ToolDeclaration {
    /// Declare a parameterless tool
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: None,
        }
    }

    /// Attach a canonical schema
    #[must_use]
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.parameters = Some(ToolParameters::Schema(schema));
        self
    }

    /// Attach a pre-rendered JSON schema value
    #[must_use]
    pub fn with_json_schema(mut self, schema: serde_json::Value) -> Self {
        self.parameters = Some(ToolParameters::JsonSchema(schema));
        self
    }
}

/// Parameter schema in one of the representations callers hand us
///
/// Tool sources either build a canonical [`Schema`] or pass along an
/// already rendered JSON schema (for example one produced by a schema
/// derive in another framework). Both are accepted transparently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolParameters {
    /// Canonical schema tree
    Schema(Schema),
    /// Generic JSON schema value
    JsonSchema(serde_json::Value),
}
