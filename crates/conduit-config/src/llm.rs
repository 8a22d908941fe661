use indexmap::IndexMap;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Top-level LLM configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// LLM provider configurations keyed by name, in file order
    #[serde(default)]
    pub providers: IndexMap<String, LlmProviderConfig>,
}

/// Configuration for a single LLM provider
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmProviderConfig {
    /// Wire protocol spoken by the provider
    #[serde(rename = "type")]
    pub provider_type: LlmProviderType,
    /// Model identifier sent with every request
    pub model: String,
    /// API key; falls back to the protocol's conventional environment variable
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Base URL override for compatible servers
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Output token limit used when a request sets none
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// Supported LLM wire protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProviderType {
    /// `OpenAI` Chat Completions (and compatible servers)
    Openai,
    /// Anthropic Messages API
    Anthropic,
}

impl LlmProviderType {
    /// Environment variable consulted when no API key is configured
    pub const fn api_key_env(self) -> &'static str {
        match self {
            Self::Openai => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}
