use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Image MIME types accepted by both wire protocols
const SUPPORTED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/gif", "image/webp"];

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End user (also carries tool results)
    User,
    /// The assistant
    Model,
    /// System instruction appearing inside the history
    System,
}

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Author of the turn
    pub role: Role,
    /// Ordered parts; order is significant for some vendors
    pub parts: Vec<Part>,
}

impl Content {
    /// Create a turn from parts
    pub const fn new(role: Role, parts: Vec<Part>) -> Self {
        Self { role, parts }
    }

    /// Create a user turn holding a single text part
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Part::Text(text.into())])
    }

    /// Create a model turn holding a single text part
    pub fn model_text(text: impl Into<String>) -> Self {
        Self::new(Role::Model, vec![Part::Text(text.into())])
    }

    /// Non-empty text parts in order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(Part::as_text).filter(|text| !text.is_empty())
    }

    /// All text parts joined with newlines
    pub fn text(&self) -> String {
        self.texts().collect::<Vec<_>>().join("\n")
    }

    /// Function calls in order
    pub fn function_calls(&self) -> impl Iterator<Item = &FunctionCall> {
        self.parts.iter().filter_map(|part| match part {
            Part::FunctionCall(call) => Some(call),
            _ => None,
        })
    }
}

/// A single piece of a conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    /// Plain text
    Text(String),
    /// Inline image bytes
    Image(InlineImage),
    /// Tool invocation requested by the model
    FunctionCall(FunctionCall),
    /// Outcome of a tool invocation, supplied by the caller
    FunctionResponse(FunctionResponse),
}

impl Part {
    /// Text of this part, if it is a text part
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Inline image data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineImage {
    /// MIME type, e.g. `image/png`
    pub mime_type: String,
    /// Raw image bytes (base64 when serialized)
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl InlineImage {
    /// Create an image part payload
    pub fn new(mime_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Whether both wire protocols accept this MIME type
    pub fn is_supported(&self) -> bool {
        SUPPORTED_IMAGE_TYPES.contains(&self.mime_type.as_str())
    }

    /// Base64-encoded image bytes
    pub fn base64_data(&self) -> String {
        STANDARD.encode(&self.data)
    }

    /// `data:` URI carrying the image
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64_data())
    }
}

/// Tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Call identifier, matched by the answering [`FunctionResponse`]
    pub id: String,
    /// Tool name
    pub name: String,
    /// Decoded arguments
    #[serde(default)]
    pub args: serde_json::Map<String, serde_json::Value>,
}

/// Outcome of a tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    /// Identifier of the [`FunctionCall`] this answers
    pub id: String,
    /// Tool name
    #[serde(default)]
    pub name: String,
    /// Tool output
    #[serde(default)]
    pub response: serde_json::Map<String, serde_json::Value>,
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
