#![allow(dead_code)]

pub mod config;
pub mod mock_llm;

use std::sync::Arc;

use conduit_config::Config;
use conduit_llm::{LanguageModel, build_model};

/// Build the named provider from a test config
pub fn model(config: &Config, name: &str) -> Arc<dyn LanguageModel> {
    let provider = config
        .llm
        .providers
        .get(name)
        .unwrap_or_else(|| panic!("provider '{name}' not configured"));
    build_model(name, provider).unwrap()
}
