#![allow(clippy::must_use_candidate)]

mod env;
pub mod llm;
mod loader;
pub mod logging;

use serde::Deserialize;

pub use llm::*;
pub use logging::*;

/// Top-level conduit configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Log output configuration
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
    /// LLM provider configuration
    #[serde(default)]
    pub llm: LlmConfig,
}
