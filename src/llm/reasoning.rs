//! Reasoning layer: wraps an LLM provider with tool calling support.

use std::sync::Arc;

use crate::error::LlmError;
use rust_decimal::Decimal;

use crate::llm::{
    ChatMessage, FinishReason, HostedTool, LlmProvider, ToolCall, ToolCompletionRequest,
    ToolDefinition,
};

/// Context for a reasoning operation.
#[derive(Debug, Clone, Default)]
pub struct ReasoningContext {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
}

impl ReasoningContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }
}

/// Token usage from one or more LLM calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
    }

    /// Price of this usage at the given (input, output) per-token rates.
    pub fn cost(&self, rates: (Decimal, Decimal)) -> Decimal {
        rates.0 * Decimal::from(self.input_tokens) + rates.1 * Decimal::from(self.output_tokens)
    }
}

/// Result of a reasoning call: either text or tool calls.
#[derive(Debug, Clone)]
pub enum RespondResult {
    /// The model responded with text.
    Text(String),
    /// The model wants to call tools.
    ToolCalls {
        tool_calls: Vec<ToolCall>,
        /// Optional text content alongside tool calls.
        content: Option<String>,
    },
}

/// Output from a respond_with_tools call.
#[derive(Debug, Clone)]
pub struct RespondOutput {
    pub result: RespondResult,
    pub usage: TokenUsage,
    pub finish_reason: FinishReason,
}

/// Reasoning layer that wraps an LLM provider.
pub struct Reasoning {
    llm: Arc<dyn LlmProvider>,
    system_prompt: Option<String>,
    hosted_tools: Vec<HostedTool>,
}

impl Reasoning {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            system_prompt: None,
            hosted_tools: Vec::new(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: String) -> Self {
        self.system_prompt = Some(prompt);
        self
    }

    pub fn with_hosted_tools(mut self, hosted: Vec<HostedTool>) -> Self {
        self.hosted_tools = hosted;
        self
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    pub fn cost_per_token(&self) -> (Decimal, Decimal) {
        self.llm.cost_per_token()
    }

    /// Call the LLM with tool definitions, returning either text or tool calls.
    pub async fn respond_with_tools(
        &self,
        context: &ReasoningContext,
    ) -> Result<RespondOutput, LlmError> {
        let mut messages = Vec::with_capacity(context.messages.len() + 1);
        if let Some(ref prompt) = self.system_prompt {
            messages.push(ChatMessage::system(prompt));
        }
        messages.extend(context.messages.iter().cloned());

        let request = ToolCompletionRequest::new(messages, context.tools.clone())
            .with_hosted_tools(self.hosted_tools.clone());
        let response = self.llm.complete_with_tools(request).await?;

        let usage = TokenUsage {
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
        };

        let finish_reason = response.finish_reason;

        if response.tool_calls.is_empty() {
            Ok(RespondOutput {
                result: RespondResult::Text(response.content.unwrap_or_default()),
                usage,
                finish_reason,
            })
        } else {
            Ok(RespondOutput {
                result: RespondResult::ToolCalls {
                    tool_calls: response.tool_calls,
                    content: response.content,
                },
                usage,
                finish_reason,
            })
        }
    }
}
