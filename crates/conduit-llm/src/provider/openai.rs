//! Chat Completions transport

use std::sync::Arc;

use async_trait::async_trait;
use conduit_config::LlmProviderConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::LanguageModel;
use crate::convert::openai::{OpenAiStreamAccumulator, build_request, convert_response};
use crate::error::LlmError;
use crate::protocol::openai::{OpenAiRequest, OpenAiResponse, OpenAiStreamOptions};
use crate::stream::{ResponseStream, aggregate, sse_data};
use crate::tool_id::ToolCallIdMap;
use crate::types::{LlmRequest, LlmResponse};

/// Default `OpenAI` API base URL
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Whether the base URL is the canonical `OpenAI` API rather than a compatible server
fn is_canonical_openai(base_url: &Url) -> bool {
    base_url.host_str().is_some_and(|h| h == "api.openai.com")
}

/// Model served over the Chat Completions protocol
///
/// Also covers compatible servers (Ollama, vLLM) through a base URL override.
/// Over-long tool-call IDs are shortened per instance, so one instance should
/// serve a whole conversation.
pub struct OpenAiModel {
    provider: String,
    model: String,
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
    max_tokens: Option<u32>,
    tool_ids: Arc<ToolCallIdMap>,
}

impl OpenAiModel {
    /// Create from provider configuration
    pub fn new(provider: &str, config: &LlmProviderConfig) -> Result<Self, LlmError> {
        Ok(Self {
            provider: provider.to_owned(),
            model: config.model.clone(),
            client: Client::new(),
            base_url: super::resolve_base_url(config, DEFAULT_BASE_URL)?,
            api_key: super::resolve_api_key(config),
            max_tokens: config.max_tokens,
            tool_ids: Arc::new(ToolCallIdMap::new()),
        })
    }

    fn completions_url(&self) -> String {
        super::endpoint(&self.base_url, "chat/completions")
    }

    fn wire_request(&self, request: &LlmRequest) -> Result<OpenAiRequest, LlmError> {
        let mut wire = build_request(&self.model, request, &self.tool_ids)?;
        wire.max_tokens = wire.max_tokens.or(self.max_tokens);
        Ok(wire)
    }

    async fn send(&self, wire: &OpenAiRequest) -> Result<reqwest::Response, LlmError> {
        let mut builder = self.client.post(self.completions_url());

        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        super::post_json(&self.provider, builder, wire).await
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let wire = self.wire_request(request)?;

        let response = self.send(&wire).await?;
        let body: OpenAiResponse = super::decode_json(response).await?;

        convert_response(body, &self.tool_ids)
    }

    async fn generate_stream(&self, request: &LlmRequest) -> Result<ResponseStream, LlmError> {
        let mut wire = self.wire_request(request)?;
        wire.stream = Some(true);

        // Compatible servers reject the unknown parameter
        wire.stream_options = is_canonical_openai(&self.base_url).then_some(OpenAiStreamOptions { include_usage: true });

        let response = self.send(&wire).await?;

        Ok(aggregate(
            sse_data(response),
            OpenAiStreamAccumulator::new(Arc::clone(&self.tool_ids)),
        ))
    }
}
