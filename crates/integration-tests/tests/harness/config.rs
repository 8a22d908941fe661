//! Programmatic configuration builder for integration tests

use conduit_config::{Config, LlmConfig, LlmProviderConfig, LlmProviderType};
use secrecy::SecretString;

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a builder with no providers
    pub fn new() -> Self {
        Self {
            config: Config {
                logging: None,
                llm: LlmConfig::default(),
            },
        }
    }

    /// Add a Chat Completions provider pointed at a mock backend
    pub fn with_openai_provider(self, name: &str, base_url: &str) -> Self {
        self.with_provider(name, LlmProviderType::Openai, "mock-gpt", base_url, None)
    }

    /// Add a Messages provider pointed at a mock backend
    pub fn with_anthropic_provider(self, name: &str, base_url: &str) -> Self {
        self.with_provider(name, LlmProviderType::Anthropic, "mock-claude", base_url, None)
    }

    /// Add a Messages provider with a configured output token limit
    pub fn with_anthropic_provider_limited(self, name: &str, base_url: &str, max_tokens: u32) -> Self {
        self.with_provider(name, LlmProviderType::Anthropic, "mock-claude", base_url, Some(max_tokens))
    }

    fn with_provider(
        mut self,
        name: &str,
        provider_type: LlmProviderType,
        model: &str,
        base_url: &str,
        max_tokens: Option<u32>,
    ) -> Self {
        self.config.llm.providers.insert(
            name.to_owned(),
            LlmProviderConfig {
                provider_type,
                model: model.to_owned(),
                api_key: Some(SecretString::from("test-key")),
                base_url: Some(base_url.parse().expect("valid URL")),
                max_tokens,
            },
        );
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config.validate().expect("valid test config");
        self.config
    }
}
