//! Error types for the inbox agent.

use std::time::Duration;

/// Top-level error type for the agent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mailbox error: {0}")]
    Mailbox(#[from] MailboxError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Processing error: {0}")]
    Processing(#[from] ProcessingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Mailbox Service errors.
#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    #[error("Mailbox request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Mailbox API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Thread {thread_id} not found")]
    ThreadNotFound { thread_id: String },

    #[error("Unexpected mailbox response: {0}")]
    InvalidResponse(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reasoning Agent errors.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Agent gave no final answer after {turns} turns")]
    MaxTurns { turns: usize },

    #[error("Agent returned an empty reply")]
    EmptyOutput,

    #[error("Agent reply was cut off at the output token limit")]
    Truncated,
}

/// Failures of a single Thread Processor invocation.
///
/// None of these escape the processor boundary: the webhook always answers
/// 200 and the batch scanner only counts them.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Trigger carries no thread id")]
    MissingThreadContext,

    #[error("Failed to fetch thread {thread_id}: {source}")]
    ThreadFetch {
        thread_id: String,
        #[source]
        source: MailboxError,
    },

    #[error("Thread {thread_id} has no externally authored message")]
    NoUserMessage { thread_id: String },

    #[error("Agent failed for thread {thread_id}: {source}")]
    AgentInvocation {
        thread_id: String,
        #[source]
        source: AgentError,
    },

    #[error("Failed to deliver reply to {message_id} in thread {thread_id}: {source}")]
    Delivery {
        thread_id: String,
        message_id: String,
        #[source]
        source: MailboxError,
    },

    #[error("Message {message_id} in thread {thread_id} was already answered")]
    Duplicate {
        thread_id: String,
        message_id: String,
    },
}

impl ProcessingError {
    /// Outcomes that are logged and skipped rather than counted as failures.
    pub fn is_noop(&self) -> bool {
        matches!(
            self,
            Self::MissingThreadContext | Self::NoUserMessage { .. } | Self::Duplicate { .. }
        )
    }

    /// Short tag for structured logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MissingThreadContext => "missing_thread_context",
            Self::ThreadFetch { .. } => "thread_fetch",
            Self::NoUserMessage { .. } => "no_user_message",
            Self::AgentInvocation { .. } => "agent_invocation",
            Self::Delivery { .. } => "delivery",
            Self::Duplicate { .. } => "duplicate",
        }
    }
}

/// Result type alias for the agent.
pub type Result<T> = std::result::Result<T, Error>;
