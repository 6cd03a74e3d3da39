//! LLM integration.
//!
//! `LlmProvider` is the seam: the agent only sees chat messages, tool
//! definitions and tool calls. `OpenAiProvider` talks to the Responses API,
//! which also hosts the web search tool.

pub mod costs;
pub mod openai;
pub mod provider;
pub mod reasoning;

pub use openai::OpenAiProvider;
pub use provider::*;
pub use reasoning::{Reasoning, ReasoningContext, RespondOutput, RespondResult, TokenUsage};

use std::sync::Arc;

use crate::config::AgentConfig;

/// Create the LLM provider from configuration.
pub fn create_provider(config: &AgentConfig) -> Arc<dyn LlmProvider> {
    tracing::info!("Using OpenAI (model: {})", config.model);
    Arc::new(OpenAiProvider::new(
        config.base_url.clone(),
        config.api_key.clone(),
        config.model.clone(),
    ))
}
