//! Tool-pairing repair for Messages API histories
//!
//! The Messages API rejects an assistant message with `tool_use` blocks
//! unless the next message is a user message carrying a `tool_result` for
//! each of them. Canonical histories can break that rule (a result that was
//! never recorded, or trimmed away), so unanswered `tool_use` blocks are
//! dropped before the request goes out. The repair may lose calls but never
//! fails.

use std::collections::HashSet;

use crate::protocol::anthropic::{AnthropicContentBlock, AnthropicMessage};

/// Drop every `tool_use` block not answered by the immediately following
/// user message
///
/// Single forward pass. An assistant message left without content is
/// removed entirely; all other messages pass through unchanged.
pub fn repair_message_history(messages: Vec<AnthropicMessage>) -> Vec<AnthropicMessage> {
    let mut repaired = Vec::with_capacity(messages.len());
    let mut messages = messages.into_iter().peekable();

    while let Some(mut message) = messages.next() {
        if !message.is_assistant() || message.tool_use_ids().next().is_none() {
            repaired.push(message);
            continue;
        }

        let answered: HashSet<&str> = match messages.peek() {
            Some(next) if next.is_user() => next.tool_result_ids().collect(),
            _ => HashSet::new(),
        };

        let before = message.content.len();
        message.content.retain(|block| match block {
            AnthropicContentBlock::ToolUse { id, .. } => answered.contains(id.as_str()),
            _ => true,
        });

        let dropped = before - message.content.len();
        if dropped > 0 {
            tracing::debug!(dropped, "dropped tool_use blocks without a following tool_result");
        }

        if !message.content.is_empty() {
            repaired.push(message);
        }
    }

    repaired
}
