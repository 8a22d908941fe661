//! Conversion between canonical types and `OpenAI` wire format

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use super::{parse_args, usage};
use crate::error::LlmError;
use crate::protocol::openai::{
    OpenAiContent, OpenAiContentPart, OpenAiFunction, OpenAiFunctionCall, OpenAiImageUrl, OpenAiJsonSchema,
    OpenAiMessage, OpenAiRequest, OpenAiResponse, OpenAiResponseFormat, OpenAiStop, OpenAiStreamChunk,
    OpenAiStreamPayload, OpenAiTool, OpenAiToolCall, OpenAiUsage,
};
use crate::schema::{function_parameters, to_json_schema};
use crate::stream::{Step, StreamAccumulator};
use crate::tool_id::ToolCallIdMap;
use crate::types::{
    Content, FinishReason, FunctionCall, GenerationOptions, InlineImage, LlmRequest, LlmResponse, Part, Role,
    ThinkingLevel, ToolDeclaration,
};

/// Name attached to structured-output schemas
const RESPONSE_SCHEMA_NAME: &str = "response";

/// Detail level requested for inline images
const IMAGE_DETAIL: &str = "auto";

// -- Outbound: canonical request -> OpenAI wire request --

/// Build a chat completion request
///
/// Tool-call IDs are shortened through `ids` where they exceed the length
/// limit; the same table later restores them in responses.
pub fn build_request(model: &str, request: &LlmRequest, ids: &ToolCallIdMap) -> Result<OpenAiRequest, LlmError> {
    let config = &request.config;
    let mut messages = Vec::new();

    if let Some(system) = &config.system_instruction {
        let text = system.text();
        if !text.is_empty() {
            messages.push(OpenAiMessage::text("system", text));
        }
    }

    for content in &request.contents {
        append_messages(&mut messages, content, ids)?;
    }

    Ok(OpenAiRequest {
        model: model.to_owned(),
        messages,
        temperature: config.temperature,
        top_p: config.top_p,
        max_tokens: config.max_output_tokens.filter(|&tokens| tokens > 0),
        stop: stop_sequences(&config.stop_sequences),
        reasoning_effort: config.thinking_level.map(|level| reasoning_effort(level).to_owned()),
        response_format: response_format(config),
        stream: None,
        stream_options: None,
        tools: tools(&config.tools),
    })
}

/// Append the wire messages for one canonical turn
///
/// Function responses become `tool` messages first; the remaining parts are
/// grouped into a single message for the turn's role.
fn append_messages(messages: &mut Vec<OpenAiMessage>, content: &Content, ids: &ToolCallIdMap) -> Result<(), LlmError> {
    let mut texts = Vec::new();
    let mut images = Vec::new();
    let mut tool_calls = Vec::new();

    for part in &content.parts {
        match part {
            Part::FunctionResponse(response) => {
                let body = serde_json::to_string(&response.response)?;
                messages.push(OpenAiMessage::tool_result(ids.normalize(&response.id), body));
            }
            Part::FunctionCall(call) => {
                tool_calls.push(OpenAiToolCall {
                    id: ids.normalize(&call.id),
                    tool_type: "function".to_owned(),
                    function: OpenAiFunctionCall {
                        name: call.name.clone(),
                        arguments: serde_json::to_string(&call.args)?,
                    },
                });
            }
            Part::Text(text) if !text.is_empty() => texts.push(text.as_str()),
            Part::Text(_) => {}
            Part::Image(image) if image.is_supported() => images.push(image_part(image)),
            Part::Image(image) => {
                tracing::debug!(mime_type = %image.mime_type, "dropping image with unsupported type");
            }
        }
    }

    if texts.is_empty() && images.is_empty() && tool_calls.is_empty() {
        return Ok(());
    }

    let message = match content.role {
        Role::User if images.is_empty() => OpenAiMessage::text("user", texts.join("\n")),
        Role::User => {
            let mut parts: Vec<OpenAiContentPart> = texts
                .into_iter()
                .map(|text| OpenAiContentPart::Text { text: text.to_owned() })
                .collect();
            parts.extend(images);
            OpenAiMessage {
                role: "user".to_owned(),
                content: Some(OpenAiContent::Parts(parts)),
                tool_calls: None,
                tool_call_id: None,
            }
        }
        Role::Model => OpenAiMessage {
            role: "assistant".to_owned(),
            content: (!texts.is_empty()).then(|| OpenAiContent::Text(texts.join("\n"))),
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            tool_call_id: None,
        },
        Role::System => OpenAiMessage::text("system", texts.join("\n")),
    };

    messages.push(message);
    Ok(())
}

fn image_part(image: &InlineImage) -> OpenAiContentPart {
    OpenAiContentPart::ImageUrl {
        image_url: OpenAiImageUrl {
            url: image.data_uri(),
            detail: Some(IMAGE_DETAIL.to_owned()),
        },
    }
}

/// One sequence goes out as a bare string, several as an array
fn stop_sequences(stops: &[String]) -> Option<OpenAiStop> {
    match stops {
        [] => None,
        [single] => Some(OpenAiStop::Single(single.clone())),
        many => Some(OpenAiStop::Multiple(many.to_vec())),
    }
}

const fn reasoning_effort(level: ThinkingLevel) -> &'static str {
    match level {
        ThinkingLevel::Low => "low",
        ThinkingLevel::Medium => "medium",
        ThinkingLevel::High => "high",
    }
}

/// A response schema takes precedence over plain JSON mode
fn response_format(config: &GenerationOptions) -> Option<OpenAiResponseFormat> {
    if let Some(schema) = &config.response_schema {
        return Some(OpenAiResponseFormat::JsonSchema {
            json_schema: OpenAiJsonSchema {
                name: RESPONSE_SCHEMA_NAME.to_owned(),
                description: schema.description.clone().filter(|d| !d.is_empty()),
                schema: Value::Object(to_json_schema(Some(schema))),
                strict: Some(true),
            },
        });
    }

    config.wants_json().then_some(OpenAiResponseFormat::JsonObject)
}

fn tools(declarations: &[ToolDeclaration]) -> Option<Vec<OpenAiTool>> {
    if declarations.is_empty() {
        return None;
    }

    Some(
        declarations
            .iter()
            .map(|declaration| OpenAiTool {
                tool_type: "function".to_owned(),
                function: OpenAiFunction {
                    name: declaration.name.clone(),
                    description: (!declaration.description.is_empty()).then(|| declaration.description.clone()),
                    parameters: Some(Value::Object(function_parameters(declaration.parameters.as_ref()))),
                },
            })
            .collect(),
    )
}

// -- Inbound: OpenAI wire response -> canonical response --

/// Convert a complete chat completion response
///
/// Only the first choice is used. An empty choice list is an error.
pub fn convert_response(response: OpenAiResponse, ids: &ToolCallIdMap) -> Result<LlmResponse, LlmError> {
    let usage = response.usage.and_then(convert_usage);
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(LlmError::NoChoicesInResponse)?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| (call.id, call.function.name, call.function.arguments));

    let content = model_content(choice.message.content.unwrap_or_default(), tool_calls, ids);
    let finish_reason = choice
        .finish_reason
        .as_deref()
        .map_or(FinishReason::Unspecified, FinishReason::from_vendor);

    Ok(LlmResponse::complete(content, usage, finish_reason))
}

fn convert_usage(wire: OpenAiUsage) -> Option<crate::types::Usage> {
    usage(wire.prompt_tokens, wire.completion_tokens, wire.total_tokens)
}

/// Model turn from message text and `(id, name, arguments)` tool calls
fn model_content(
    text: String,
    tool_calls: impl IntoIterator<Item = (String, String, String)>,
    ids: &ToolCallIdMap,
) -> Content {
    let mut parts = Vec::new();

    if !text.is_empty() {
        parts.push(Part::Text(text));
    }

    for (id, name, arguments) in tool_calls {
        parts.push(Part::FunctionCall(FunctionCall {
            id: ids.denormalize(&id),
            name,
            args: parse_args(&arguments),
        }));
    }

    Content::new(Role::Model, parts)
}

// -- Stream accumulation --

#[derive(Debug, Default)]
struct PendingToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Aggregate state of a streamed chat completion
///
/// Tracks the first choice only, matching [`convert_response`].
#[derive(Debug)]
pub struct OpenAiStreamAccumulator {
    ids: Arc<ToolCallIdMap>,
    saw_choice: bool,
    text: String,
    tool_calls: BTreeMap<u32, PendingToolCall>,
    finish_reason: Option<String>,
    usage: Option<OpenAiUsage>,
}

impl OpenAiStreamAccumulator {
    pub fn new(ids: Arc<ToolCallIdMap>) -> Self {
        Self {
            ids,
            saw_choice: false,
            text: String::new(),
            tool_calls: BTreeMap::new(),
            finish_reason: None,
            usage: None,
        }
    }

    fn add_chunk(&mut self, chunk: OpenAiStreamChunk) -> Option<String> {
        if let Some(usage) = chunk.usage {
            self.usage = Some(usage);
        }

        let mut delta_text = None;

        for choice in chunk.choices.into_iter().filter(|choice| choice.index == 0) {
            self.saw_choice = true;

            if let Some(reason) = choice.finish_reason {
                self.finish_reason = Some(reason);
            }

            if let Some(text) = choice.delta.content.filter(|text| !text.is_empty()) {
                self.text.push_str(&text);
                delta_text = Some(text);
            }

            for call in choice.delta.tool_calls.unwrap_or_default() {
                let pending = self.tool_calls.entry(call.index).or_default();
                if let Some(id) = call.id.filter(|id| !id.is_empty()) {
                    pending.id = id;
                }
                if let Some(function) = call.function {
                    if let Some(name) = function.name.filter(|name| !name.is_empty()) {
                        pending.name = name;
                    }
                    if let Some(arguments) = function.arguments {
                        pending.arguments.push_str(&arguments);
                    }
                }
            }
        }

        delta_text
    }
}

impl StreamAccumulator for OpenAiStreamAccumulator {
    fn ingest(&mut self, data: &str) -> Result<Step, LlmError> {
        let chunk = match serde_json::from_str::<OpenAiStreamPayload>(data) {
            Ok(OpenAiStreamPayload::Chunk(chunk)) => chunk,
            Ok(OpenAiStreamPayload::Error(body)) => return Err(LlmError::Streaming(body.error.message)),
            Err(e) => {
                tracing::debug!(error = %e, "skipping unparseable OpenAI stream chunk");
                return Ok(Step::Continue);
            }
        };

        Ok(self
            .add_chunk(chunk)
            .map_or(Step::Continue, |delta| Step::Partial(LlmResponse::partial_text(delta))))
    }

    fn finish(self) -> Result<LlmResponse, LlmError> {
        if !self.saw_choice {
            return Err(LlmError::NoChoicesInResponse);
        }

        let tool_calls = self
            .tool_calls
            .into_values()
            .map(|call| (call.id, call.name, call.arguments));
        let content = model_content(self.text, tool_calls, &self.ids);
        let finish_reason = self
            .finish_reason
            .as_deref()
            .map_or(FinishReason::Unspecified, FinishReason::from_vendor);

        Ok(LlmResponse::complete(
            content,
            self.usage.and_then(convert_usage),
            finish_reason,
        ))
    }
}
