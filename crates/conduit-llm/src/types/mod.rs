//! Canonical conversation types
//!
//! These types are vendor-neutral and form the contract between the agent
//! runtime and every wire adapter. Requests are built from them and every
//! vendor response is converted back into them.

pub mod content;
pub mod request;
pub mod response;
pub mod schema;
pub mod tool;

pub use content::{Content, FunctionCall, FunctionResponse, InlineImage, Part, Role};
pub use request::{GenerationOptions, LlmRequest, ThinkingLevel};
pub use response::{FinishReason, LlmResponse, Usage};
pub use schema::{Schema, SchemaType};
pub use tool::{ToolDeclaration, ToolParameters};
