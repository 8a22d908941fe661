use serde::{Deserialize, Serialize};

use super::content::{Content, Part, Role};

/// Reason the model stopped generating
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Reason not reported or not recognized
    #[default]
    Unspecified,
    /// Natural stop, stop sequence, or tool call
    Stop,
    /// Output token limit reached
    MaxTokens,
    /// Output withheld by a content filter
    Safety,
}

impl FinishReason {
    /// Map a vendor stop/finish reason onto the canonical enum
    ///
    /// Covers both the Chat Completions `finish_reason` and the Messages
    /// `stop_reason` vocabularies.
    pub fn from_vendor(reason: &str) -> Self {
        match reason {
            "stop" | "end_turn" | "stop_sequence" | "tool_calls" | "tool_use" | "function_call" => Self::Stop,
            "length" | "max_tokens" => Self::MaxTokens,
            "content_filter" => Self::Safety,
            _ => Self::Unspecified,
        }
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt
    pub prompt_tokens: u32,
    /// Tokens generated in the completion
    pub completion_tokens: u32,
    /// Prompt plus completion
    pub total_tokens: u32,
}

/// Canonical response produced by an adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Generated turn, always authored by the model
    pub content: Content,
    /// Usage, absent when the vendor reported none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: FinishReason,
    /// Incremental piece of a streamed answer
    #[serde(default)]
    pub partial: bool,
    /// Final, fully aggregated response for the request
    #[serde(default)]
    pub turn_complete: bool,
}

impl LlmResponse {
    /// Partial response carrying a single text delta
    pub fn partial_text(delta: impl Into<String>) -> Self {
        Self {
            content: Content::new(Role::Model, vec![Part::Text(delta.into())]),
            usage: None,
            finish_reason: FinishReason::Unspecified,
            partial: true,
            turn_complete: false,
        }
    }

    /// Final, turn-complete response
    pub const fn complete(content: Content, usage: Option<Usage>, finish_reason: FinishReason) -> Self {
        Self {
            content,
            usage,
            finish_reason,
            partial: false,
            turn_complete: true,
        }
    }
}
