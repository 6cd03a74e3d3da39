//! Tool-calling agent loop: LLM → tools → LLM until a text answer.

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::{AgentOutput, ConversationTurn, ReasoningAgent};
use crate::error::AgentError;
use crate::llm::{ChatMessage, FinishReason, Reasoning, ReasoningContext, RespondResult, TokenUsage};
use crate::tools::ToolRegistry;

/// Agent backed by an LLM and a tool registry.
pub struct ToolAgent {
    name: String,
    reasoning: Reasoning,
    tools: Arc<ToolRegistry>,
    max_turns: usize,
}

impl ToolAgent {
    pub fn new(
        name: impl Into<String>,
        reasoning: Reasoning,
        tools: Arc<ToolRegistry>,
        max_turns: usize,
    ) -> Self {
        Self {
            name: name.into(),
            reasoning,
            tools,
            max_turns: max_turns.max(1),
        }
    }

    /// Run one tool call; failures become tool output so the model can recover.
    async fn execute_tool(&self, name: &str, arguments: &serde_json::Value) -> String {
        let Some(tool) = self.tools.get(name).await else {
            tracing::warn!(agent = %self.name, tool = name, "Model called unknown tool");
            return format!("Error: tool '{name}' does not exist");
        };

        match tool.execute(arguments.clone()).await {
            Ok(output) => {
                tracing::debug!(
                    tool = name,
                    elapsed_ms = output.duration.as_millis() as u64,
                    "Tool finished"
                );
                output.content
            }
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "Tool failed");
                format!("Error: {e}")
            }
        }
    }
}

#[async_trait]
impl ReasoningAgent for ToolAgent {
    async fn run(&self, conversation: &[ConversationTurn]) -> Result<AgentOutput, AgentError> {
        let mut context = ReasoningContext::new()
            .with_messages(conversation.iter().map(ChatMessage::from).collect())
            .with_tools(self.tools.tool_definitions().await);
        let mut usage = TokenUsage::default();
        let mut tool_calls_made = 0;

        for turn in 1..=self.max_turns {
            let output = self.reasoning.respond_with_tools(&context).await?;
            usage.add(output.usage);

            match output.result {
                RespondResult::Text(text) => {
                    let cost = usage.cost(self.reasoning.cost_per_token());
                    if output.finish_reason == FinishReason::Length {
                        tracing::warn!(
                            agent = %self.name,
                            turns = turn,
                            tokens = usage.total(),
                            cost_usd = %cost.round_dp(6),
                            "Agent reply hit the output token limit"
                        );
                        return Err(AgentError::Truncated);
                    }
                    tracing::info!(
                        agent = %self.name,
                        model = self.reasoning.model_name(),
                        turns = turn,
                        tool_calls = tool_calls_made,
                        tokens = usage.total(),
                        cost_usd = %cost.round_dp(6),
                        "Agent produced final answer"
                    );
                    return Ok(AgentOutput {
                        final_output: text,
                        usage,
                        tool_calls: tool_calls_made,
                    });
                }
                RespondResult::ToolCalls {
                    tool_calls,
                    content,
                } => {
                    tracing::debug!(
                        agent = %self.name,
                        turn,
                        count = tool_calls.len(),
                        "Model requested tools"
                    );
                    context
                        .messages
                        .push(ChatMessage::assistant_with_tool_calls(content, tool_calls.clone()));

                    for call in tool_calls {
                        let result = self.execute_tool(&call.name, &call.arguments).await;
                        context
                            .messages
                            .push(ChatMessage::tool_result(call.id, result));
                        tool_calls_made += 1;
                    }
                }
            }
        }

        Err(AgentError::MaxTurns {
            turns: self.max_turns,
        })
    }
}
