//! Wire-protocol adapters for LLM chat APIs
//!
//! Maps a single canonical conversation representation onto the `OpenAI`
//! Chat Completions protocol and the Anthropic Messages protocol, and maps
//! each vendor's single and streamed responses back into canonical form.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod convert;
pub mod error;
pub mod protocol;
pub mod provider;
pub mod repair;
pub mod schema;
pub mod stream;
pub mod tool_id;
pub mod types;

pub use error::LlmError;
pub use provider::{LanguageModel, build_model};
pub use stream::ResponseStream;
pub use types::{
    Content, FinishReason, FunctionCall, FunctionResponse, GenerationOptions, InlineImage, LlmRequest, LlmResponse,
    Part, Role, Schema, SchemaType, ThinkingLevel, ToolDeclaration, ToolParameters, Usage,
};
