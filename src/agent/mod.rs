//! Reasoning Agent: one conversation in, one final answer out.

pub mod runner;

pub use runner::ToolAgent;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;
use crate::llm::{ChatMessage, TokenUsage};

/// Author of a conversation turn, from the agent's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// Written by someone outside the inbox.
    User,
    /// Written by the inbox itself.
    Assistant,
}

/// One role-tagged entry of the history handed to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

impl From<&ConversationTurn> for ChatMessage {
    fn from(turn: &ConversationTurn) -> Self {
        match turn.role {
            TurnRole::User => ChatMessage::user(turn.content.clone()),
            TurnRole::Assistant => ChatMessage::assistant(turn.content.clone()),
        }
    }
}

/// Final result of an agent run.
#[derive(Debug, Clone)]
pub struct AgentOutput {
    pub final_output: String,
    pub usage: TokenUsage,
    /// Number of tool calls executed on the way.
    pub tool_calls: usize,
}

/// An opaque language-model agent with a tool set bound at construction.
///
/// Implementations may call tools any number of times; callers only see the
/// final answer.
#[async_trait]
pub trait ReasoningAgent: Send + Sync {
    async fn run(&self, conversation: &[ConversationTurn]) -> Result<AgentOutput, AgentError>;
}
