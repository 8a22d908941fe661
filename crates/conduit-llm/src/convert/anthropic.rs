//! Conversion between canonical types and Anthropic wire format

use std::collections::BTreeMap;

use serde_json::Value;

use super::{parse_args, usage};
use crate::error::LlmError;
use crate::protocol::anthropic::{
    AnthropicContentBlock, AnthropicImageSource, AnthropicInputSchema, AnthropicMessage, AnthropicRequest,
    AnthropicResponse, AnthropicResponseBlock, AnthropicStreamContentBlock, AnthropicStreamDelta, AnthropicStreamEvent,
    AnthropicTool, AnthropicUsage,
};
use crate::repair::repair_message_history;
use crate::schema::function_parameters;
use crate::stream::{Step, StreamAccumulator};
use crate::tool_id::sanitize_tool_id;
use crate::types::{Content, FinishReason, FunctionCall, LlmRequest, LlmResponse, Part, Role, ToolDeclaration};

/// Default max tokens when not specified (Anthropic requires this field)
const DEFAULT_MAX_TOKENS: u32 = 4096;

// -- Outbound: canonical request -> Anthropic wire request --

/// Build a messages API request
///
/// Tool IDs are sanitized to the Messages charset and the history is
/// repaired so every remaining `tool_use` is answered.
pub fn build_request(model: &str, request: &LlmRequest) -> Result<AnthropicRequest, LlmError> {
    let config = &request.config;

    let system = config
        .system_instruction
        .as_ref()
        .map(Content::text)
        .filter(|text| !text.is_empty());

    let mut messages = Vec::new();
    for content in &request.contents {
        append_messages(&mut messages, content)?;
    }

    Ok(AnthropicRequest {
        model: model.to_owned(),
        max_tokens: config
            .max_output_tokens
            .filter(|&tokens| tokens > 0)
            .unwrap_or(DEFAULT_MAX_TOKENS),
        system,
        messages: repair_message_history(messages),
        temperature: config.temperature,
        top_p: config.top_p,
        stop_sequences: (!config.stop_sequences.is_empty()).then(|| config.stop_sequences.clone()),
        stream: None,
        tools: tools(&config.tools),
    })
}

/// Append the wire message(s) for one canonical turn
///
/// `tool_result` blocks lead the message, the other blocks follow in part
/// order. Results inside a model turn cannot share an assistant message, so
/// they go out as a separate user message ahead of it.
fn append_messages(messages: &mut Vec<AnthropicMessage>, content: &Content) -> Result<(), LlmError> {
    let mut results = Vec::new();
    let mut blocks = Vec::new();

    for part in &content.parts {
        match part {
            Part::FunctionResponse(response) => results.push(AnthropicContentBlock::ToolResult {
                tool_use_id: sanitize_tool_id(&response.id),
                content: Some(serde_json::to_string(&response.response)?),
                is_error: None,
            }),
            Part::FunctionCall(call) => blocks.push(AnthropicContentBlock::ToolUse {
                id: sanitize_tool_id(&call.id),
                name: call.name.clone(),
                input: Value::Object(call.args.clone()),
            }),
            Part::Text(text) if !text.is_empty() => blocks.push(AnthropicContentBlock::Text { text: text.clone() }),
            Part::Text(_) => {}
            Part::Image(image) if image.is_supported() => blocks.push(AnthropicContentBlock::Image {
                source: AnthropicImageSource {
                    source_type: "base64".to_owned(),
                    media_type: image.mime_type.clone(),
                    data: image.base64_data(),
                },
            }),
            Part::Image(image) => {
                tracing::debug!(mime_type = %image.mime_type, "dropping image with unsupported type");
            }
        }
    }

    let role = match content.role {
        Role::Model => "assistant",
        Role::User | Role::System => "user",
    };

    if role == "assistant" && !results.is_empty() {
        messages.push(AnthropicMessage {
            role: "user".to_owned(),
            content: std::mem::take(&mut results),
        });
    }

    results.append(&mut blocks);
    if !results.is_empty() {
        messages.push(AnthropicMessage {
            role: role.to_owned(),
            content: results,
        });
    }

    Ok(())
}

fn tools(declarations: &[ToolDeclaration]) -> Option<Vec<AnthropicTool>> {
    if declarations.is_empty() {
        return None;
    }

    Some(
        declarations
            .iter()
            .map(|declaration| {
                let mut schema = function_parameters(declaration.parameters.as_ref());
                AnthropicTool {
                    name: declaration.name.clone(),
                    description: (!declaration.description.is_empty()).then(|| declaration.description.clone()),
                    input_schema: AnthropicInputSchema {
                        schema_type: "object".to_owned(),
                        properties: schema.remove("properties"),
                        required: schema.remove("required"),
                    },
                }
            })
            .collect(),
    )
}

// -- Inbound: Anthropic wire response -> canonical response --

/// Convert a complete messages API response
///
/// An empty content list is an error.
pub fn convert_response(response: AnthropicResponse) -> Result<LlmResponse, LlmError> {
    if response.content.is_empty() {
        return Err(LlmError::NoContentInResponse);
    }

    let mut parts = Vec::with_capacity(response.content.len());
    for block in response.content {
        match block {
            AnthropicResponseBlock::Text { text } => {
                if !text.is_empty() {
                    parts.push(Part::Text(text));
                }
            }
            AnthropicResponseBlock::ToolUse { id, name, input } => {
                parts.push(Part::FunctionCall(FunctionCall {
                    id,
                    name,
                    args: tool_input(input),
                }));
            }
            AnthropicResponseBlock::Unsupported => {}
        }
    }

    Ok(LlmResponse::complete(
        Content::new(Role::Model, parts),
        convert_usage(response.usage),
        stop_reason(response.stop_reason.as_deref()),
    ))
}

fn tool_input(input: Value) -> serde_json::Map<String, Value> {
    match input {
        Value::Object(args) => args,
        Value::String(raw) => parse_args(&raw),
        _ => serde_json::Map::new(),
    }
}

fn convert_usage(wire: AnthropicUsage) -> Option<crate::types::Usage> {
    usage(
        wire.input_tokens,
        wire.output_tokens,
        wire.input_tokens.saturating_add(wire.output_tokens),
    )
}

fn stop_reason(reason: Option<&str>) -> FinishReason {
    reason.map_or(FinishReason::Unspecified, FinishReason::from_vendor)
}

// -- Stream accumulation --

#[derive(Debug)]
enum PendingBlock {
    Text(String),
    ToolUse { id: String, name: String, input: String },
    Unsupported,
}

/// Aggregate state of a streamed messages API response
///
/// Content blocks are keyed by their stream index; text deltas are also
/// surfaced as partial responses.
#[derive(Debug, Default)]
pub struct AnthropicStreamAccumulator {
    blocks: BTreeMap<u32, PendingBlock>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

impl AnthropicStreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply(&mut self, event: AnthropicStreamEvent) -> Result<Step, LlmError> {
        match event {
            AnthropicStreamEvent::MessageStart { message } => {
                if let Some(usage) = message.usage {
                    self.usage = usage;
                }
            }

            AnthropicStreamEvent::ContentBlockStart { index, content_block } => {
                let block = match content_block {
                    AnthropicStreamContentBlock::Text { text } => PendingBlock::Text(text),
                    AnthropicStreamContentBlock::ToolUse { id, name } => PendingBlock::ToolUse {
                        id,
                        name,
                        input: String::new(),
                    },
                    AnthropicStreamContentBlock::Unsupported => PendingBlock::Unsupported,
                };
                self.blocks.insert(index, block);
            }

            AnthropicStreamEvent::ContentBlockDelta { index, delta } => match (self.blocks.get_mut(&index), delta) {
                (Some(PendingBlock::Text(text)), AnthropicStreamDelta::TextDelta { text: delta }) => {
                    if !delta.is_empty() {
                        text.push_str(&delta);
                        return Ok(Step::Partial(LlmResponse::partial_text(delta)));
                    }
                }
                (Some(PendingBlock::ToolUse { input, .. }), AnthropicStreamDelta::InputJsonDelta { partial_json }) => {
                    input.push_str(&partial_json);
                }
                (_, delta) => {
                    tracing::debug!(index, ?delta, "ignoring delta for unknown or mismatched block");
                }
            },

            AnthropicStreamEvent::MessageDelta { delta, usage } => {
                if let Some(reason) = delta.stop_reason {
                    self.stop_reason = Some(reason);
                }
                if let Some(usage) = usage {
                    if usage.input_tokens > 0 {
                        self.usage.input_tokens = usage.input_tokens;
                    }
                    self.usage.output_tokens = usage.output_tokens;
                }
            }

            AnthropicStreamEvent::MessageStop => return Ok(Step::Done),

            AnthropicStreamEvent::Error { error } => {
                return Err(LlmError::Streaming(format!("{}: {}", error.error_type, error.message)));
            }

            AnthropicStreamEvent::ContentBlockStop { .. } | AnthropicStreamEvent::Ping => {}

            AnthropicStreamEvent::Unknown => {
                tracing::debug!("skipping unknown Anthropic stream event");
            }
        }

        Ok(Step::Continue)
    }
}

impl StreamAccumulator for AnthropicStreamAccumulator {
    fn ingest(&mut self, data: &str) -> Result<Step, LlmError> {
        match serde_json::from_str::<AnthropicStreamEvent>(data) {
            Ok(event) => self.apply(event),
            Err(e) => {
                tracing::debug!(error = %e, "skipping unparseable Anthropic stream event");
                Ok(Step::Continue)
            }
        }
    }

    fn finish(self) -> Result<LlmResponse, LlmError> {
        let content = self
            .blocks
            .into_values()
            .filter_map(|block| match block {
                PendingBlock::Text(text) => Some(AnthropicResponseBlock::Text { text }),
                PendingBlock::ToolUse { id, name, input } => Some(AnthropicResponseBlock::ToolUse {
                    id,
                    name,
                    input: Value::Object(parse_args(&input)),
                }),
                PendingBlock::Unsupported => None,
            })
            .collect();

        convert_response(AnthropicResponse {
            id: String::new(),
            response_type: "message".to_owned(),
            role: "assistant".to_owned(),
            content,
            model: String::new(),
            stop_reason: self.stop_reason,
            stop_sequence: None,
            usage: self.usage,
        })
    }
}
