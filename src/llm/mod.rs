//! LLM integration.
//!
//! One backend: any server speaking the OpenAI chat-completions protocol.
//! The plan generator only sees the `LlmProvider` trait.

pub mod openai;
pub mod provider;

pub use openai::OpenAiProvider;
pub use provider::*;

use std::sync::Arc;

use crate::config::LlmConfig;

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Arc<dyn LlmProvider> {
    tracing::info!("Using OpenAI-compatible backend (model: {})", config.model);
    Arc::new(OpenAiProvider::new(
        config.api_key.clone(),
        config.model.clone(),
        config.base_url.clone(),
    ))
}
