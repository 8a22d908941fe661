use thiserror::Error;

/// Errors that can occur while adapting a request or response
#[derive(Debug, Error)]
pub enum LlmError {
    /// The canonical request could not be turned into a wire request
    #[error("failed to build request: {0}")]
    RequestConstruction(String),

    /// Upstream provider could not be reached or returned an error status
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Error while consuming a streamed response
    #[error("streaming error: {0}")]
    Streaming(String),

    /// Upstream body could not be decoded into the vendor response shape
    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),

    /// Chat Completions response carried an empty `choices` list
    #[error("no choices in OpenAI response")]
    NoChoicesInResponse,

    /// Messages response carried an empty `content` list
    #[error("no content in Anthropic response")]
    NoContentInResponse,

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl LlmError {
    /// Whether the caller may reasonably retry the same request
    ///
    /// The adapter itself never retries; this only classifies transport
    /// failures for whoever owns the retry policy.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream(_) | Self::Streaming(_))
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        Self::RequestConstruction(err.to_string())
    }
}
