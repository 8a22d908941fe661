use serde::{Deserialize, Serialize};

use super::content::Content;
use super::schema::Schema;
use super::tool::ToolDeclaration;

/// MIME type that switches a vendor into JSON output mode
pub const JSON_MIME_TYPE: &str = "application/json";

/// Reasoning depth hint; each vendor interprets it differently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThinkingLevel {
    /// Minimal reasoning
    Low,
    /// Balanced reasoning
    Medium,
    /// Maximum reasoning
    High,
}

/// Parameters controlling generation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    /// Stop sequences, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
    /// System instruction sent ahead of the history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    /// Output MIME type; only `application/json` is recognized
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    /// Schema the output must follow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Schema>,
    /// Reasoning depth hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_level: Option<ThinkingLevel>,
    /// Tools the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDeclaration>,
}

impl GenerationOptions {
    /// Whether JSON output mode was requested
    pub fn wants_json(&self) -> bool {
        self.response_mime_type.as_deref() == Some(JSON_MIME_TYPE)
    }
}

/// Canonical request handed to an adapter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmRequest {
    /// Conversation history, oldest first
    pub contents: Vec<Content>,
    /// Generation options
    #[serde(default)]
    pub config: GenerationOptions,
}

impl LlmRequest {
    /// Create a request from history and options
    pub const fn new(contents: Vec<Content>, config: GenerationOptions) -> Self {
        Self { contents, config }
    }
}
