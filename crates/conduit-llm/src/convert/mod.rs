//! Conversion between canonical types and the vendor wire formats
//!
//! Each submodule builds a vendor request from an [`LlmRequest`](crate::LlmRequest),
//! converts a complete vendor response, and accumulates a streamed one.

pub mod anthropic;
pub mod openai;

use serde_json::{Map, Value};

use crate::types::Usage;

/// Decode tool-call arguments, degrading to an empty map
///
/// Empty input, malformed JSON and non-object JSON all yield `{}`.
pub fn parse_args(raw: &str) -> Map<String, Value> {
    if raw.trim().is_empty() {
        return Map::new();
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(args)) => args,
        Ok(other) => {
            tracing::debug!(kind = crate::schema::value_kind(&other), "tool arguments are not a JSON object, using empty map");
            Map::new()
        }
        Err(e) => {
            tracing::debug!(error = %e, "tool arguments are not valid JSON, using empty map");
            Map::new()
        }
    }
}

/// Canonical usage, absent when the vendor reported nothing
pub const fn usage(prompt_tokens: u32, completion_tokens: u32, total_tokens: u32) -> Option<Usage> {
    if total_tokens == 0 {
        return None;
    }
    Some(Usage {
        prompt_tokens,
        completion_tokens,
        total_tokens,
    })
}
