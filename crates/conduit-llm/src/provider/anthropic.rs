//! Anthropic Messages transport

use async_trait::async_trait;
use conduit_config::LlmProviderConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::LanguageModel;
use crate::convert::anthropic::{AnthropicStreamAccumulator, build_request, convert_response};
use crate::error::LlmError;
use crate::protocol::anthropic::{AnthropicRequest, AnthropicResponse};
use crate::stream::{ResponseStream, aggregate, sse_data};
use crate::types::{LlmRequest, LlmResponse};

/// Default Anthropic API base URL
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Model served over the Anthropic Messages protocol
pub struct AnthropicModel {
    provider: String,
    model: String,
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
    max_tokens: Option<u32>,
}

impl AnthropicModel {
    /// Create from provider configuration
    pub fn new(provider: &str, config: &LlmProviderConfig) -> Result<Self, LlmError> {
        Ok(Self {
            provider: provider.to_owned(),
            model: config.model.clone(),
            client: Client::new(),
            base_url: super::resolve_base_url(config, DEFAULT_BASE_URL)?,
            api_key: super::resolve_api_key(config),
            max_tokens: config.max_tokens,
        })
    }

    fn messages_url(&self) -> String {
        super::endpoint(&self.base_url, "messages")
    }

    fn wire_request(&self, request: &LlmRequest) -> Result<AnthropicRequest, LlmError> {
        let mut wire = build_request(&self.model, request)?;

        let request_sets_limit = request.config.max_output_tokens.is_some_and(|tokens| tokens > 0);
        if !request_sets_limit && let Some(max_tokens) = self.max_tokens {
            wire.max_tokens = max_tokens;
        }

        Ok(wire)
    }

    async fn send(&self, wire: &AnthropicRequest) -> Result<reqwest::Response, LlmError> {
        let mut builder = self
            .client
            .post(self.messages_url())
            .header("anthropic-version", ANTHROPIC_VERSION);

        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key.expose_secret());
        }

        super::post_json(&self.provider, builder, wire).await
    }
}

#[async_trait]
impl LanguageModel for AnthropicModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let wire = self.wire_request(request)?;

        let response = self.send(&wire).await?;
        let body: AnthropicResponse = super::decode_json(response).await?;

        convert_response(body)
    }

    async fn generate_stream(&self, request: &LlmRequest) -> Result<ResponseStream, LlmError> {
        let mut wire = self.wire_request(request)?;
        wire.stream = Some(true);

        let response = self.send(&wire).await?;

        Ok(aggregate(sse_data(response), AnthropicStreamAccumulator::new()))
    }
}
