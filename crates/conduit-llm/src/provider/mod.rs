//! Language-model boundary and HTTP transports for each wire protocol

pub mod anthropic;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use conduit_config::{LlmProviderConfig, LlmProviderType};
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use reqwest::RequestBuilder;
use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

pub use self::anthropic::AnthropicModel;
pub use self::openai::OpenAiModel;
use crate::error::LlmError;
use crate::stream::ResponseStream;
use crate::types::{LlmRequest, LlmResponse};

/// A model reachable over one of the supported wire protocols
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Configured model identifier
    fn name(&self) -> &str;

    /// Send a request and wait for the complete answer
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Send a streaming request
    ///
    /// The returned stream yields text partials followed by one aggregated
    /// final response. Dropping it closes the connection.
    async fn generate_stream(&self, request: &LlmRequest) -> Result<ResponseStream, LlmError>;

    /// Single entry point for callers that decide streaming at runtime
    ///
    /// Without streaming the sequence holds exactly one response. Errors
    /// raised before the first byte arrives are yielded as the only item.
    fn generate_content<'a>(
        &'a self,
        request: &'a LlmRequest,
        streaming: bool,
    ) -> BoxStream<'a, Result<LlmResponse, LlmError>> {
        if !streaming {
            return stream::once(self.generate(request)).boxed();
        }

        stream::once(self.generate_stream(request))
            .flat_map(|result| match result {
                Ok(responses) => responses,
                Err(e) => stream::iter([Err(e)]).boxed(),
            })
            .boxed()
    }
}

/// Build a model from its configuration entry
///
/// `provider` is the entry's key and is only used to label log lines.
pub fn build_model(provider: &str, config: &LlmProviderConfig) -> Result<Arc<dyn LanguageModel>, LlmError> {
    let model: Arc<dyn LanguageModel> = match config.provider_type {
        LlmProviderType::Openai => Arc::new(OpenAiModel::new(provider, config)?),
        LlmProviderType::Anthropic => Arc::new(AnthropicModel::new(provider, config)?),
    };

    tracing::debug!(provider, model = model.name(), "language model ready");

    Ok(model)
}

/// Configured API key, else the protocol's conventional environment variable
fn resolve_api_key(config: &LlmProviderConfig) -> Option<SecretString> {
    config.api_key.clone().or_else(|| {
        std::env::var(config.provider_type.api_key_env())
            .ok()
            .filter(|key| !key.is_empty())
            .map(SecretString::from)
    })
}

fn resolve_base_url(config: &LlmProviderConfig, default: &str) -> Result<Url, LlmError> {
    match &config.base_url {
        Some(url) => Ok(url.clone()),
        None => Url::parse(default).map_err(|e| LlmError::Internal(anyhow::anyhow!("invalid default base URL: {e}"))),
    }
}

/// Join an endpoint path onto a base URL that may carry a trailing slash
fn endpoint(base_url: &Url, path: &str) -> String {
    let base = base_url.as_str().trim_end_matches('/');
    format!("{base}/{path}")
}

/// POST a JSON body, mapping transport failures and non-2xx statuses
async fn post_json<T>(provider: &str, builder: RequestBuilder, body: &T) -> Result<reqwest::Response, LlmError>
where
    T: Serialize + Sync,
{
    let response = builder.json(body).send().await.map_err(|e| {
        tracing::error!(provider, error = %e, "upstream request failed");
        LlmError::Upstream(e.to_string())
    })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(provider, status = %status, "upstream returned error");
        return Err(LlmError::Upstream(format!("provider returned {status}: {body}")));
    }

    Ok(response)
}

async fn decode_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, LlmError> {
    response
        .json()
        .await
        .map_err(|e| LlmError::InvalidResponse(format!("failed to parse response: {e}")))
}
