//! Conversion of canonical schemas into the JSON schema dialect both vendors accept
//!
//! Conversion never fails: malformed input degrades to the closest valid
//! schema rather than an error, so a bad tool declaration cannot block a
//! whole request.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::{Schema, SchemaType, ToolParameters};

/// JSON schema type name for a canonical type tag
///
/// Unspecified types render as `"string"`.
pub const fn schema_type_name(schema_type: SchemaType) -> &'static str {
    match schema_type {
        SchemaType::Number => "number",
        SchemaType::Integer => "integer",
        SchemaType::Boolean => "boolean",
        SchemaType::Array => "array",
        SchemaType::Object => "object",
        SchemaType::String | SchemaType::Unspecified => "string",
    }
}

/// Schema used when a tool declares no parameters
pub fn empty_object_schema() -> Map<String, Value> {
    let mut schema = Map::new();
    schema.insert("type".to_owned(), Value::String("object".to_owned()));
    schema.insert("properties".to_owned(), Value::Object(Map::new()));
    schema
}

/// Render a canonical schema as a JSON schema object
pub fn to_json_schema(schema: Option<&Schema>) -> Map<String, Value> {
    schema.map_or_else(empty_object_schema, render)
}

fn render(schema: &Schema) -> Map<String, Value> {
    let mut out = Map::new();

    out.insert(
        "type".to_owned(),
        Value::String(schema_type_name(schema.schema_type).to_owned()),
    );

    if let Some(description) = schema.description.as_deref().filter(|d| !d.is_empty()) {
        out.insert("description".to_owned(), Value::String(description.to_owned()));
    }

    if !schema.required.is_empty() {
        out.insert(
            "required".to_owned(),
            Value::Array(schema.required.iter().cloned().map(Value::String).collect()),
        );
    }

    if !schema.enum_values.is_empty() {
        out.insert(
            "enum".to_owned(),
            Value::Array(schema.enum_values.iter().cloned().map(Value::String).collect()),
        );
    }

    if !schema.properties.is_empty() {
        let properties = schema
            .properties
            .iter()
            .map(|(name, property)| (name.clone(), Value::Object(render(property))))
            .collect();
        out.insert("properties".to_owned(), Value::Object(properties));
    }

    if let Some(items) = &schema.items {
        out.insert("items".to_owned(), Value::Object(render(items)));
    }

    out
}

/// Resolve tool parameters into a JSON schema object
///
/// A generic JSON object is used as-is. A JSON string holding a rendered
/// schema is decoded. Anything else falls back to the empty object schema.
pub fn function_parameters(parameters: Option<&ToolParameters>) -> Map<String, Value> {
    match parameters {
        None => empty_object_schema(),
        Some(ToolParameters::Schema(schema)) => render(schema),
        Some(ToolParameters::JsonSchema(Value::Object(map))) => map.clone(),
        Some(ToolParameters::JsonSchema(Value::String(raw))) => serde_json::from_str(raw).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "tool schema string is not a JSON object, using empty schema");
            empty_object_schema()
        }),
        Some(ToolParameters::JsonSchema(other)) => {
            tracing::debug!(kind = value_kind(other), "tool schema is not an object, using empty schema");
            empty_object_schema()
        }
    }
}

/// Capture a framework-native schema object by round-tripping it through JSON
pub fn native_parameters<T: Serialize + ?Sized>(native: &T) -> ToolParameters {
    match serde_json::to_value(native) {
        Ok(value) => ToolParameters::JsonSchema(value),
        Err(e) => {
            tracing::debug!(error = %e, "tool schema could not be serialized, using empty schema");
            ToolParameters::JsonSchema(Value::Object(empty_object_schema()))
        }
    }
}

pub(crate) const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
