//! The `Tool` trait and its result/error types.

use std::time::Duration;

use async_trait::async_trait;

/// Errors raised while executing a tool.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// Output of a tool run, fed back to the model as text.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub content: String,
    pub duration: Duration,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>, duration: Duration) -> Self {
        Self {
            content: content.into(),
            duration,
        }
    }

    pub fn success(value: serde_json::Value, duration: Duration) -> Self {
        Self::text(value.to_string(), duration)
    }
}

/// A capability the Reasoning Agent may invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the parameters object.
    fn parameters_schema(&self) -> serde_json::Value;

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError>;
}

/// Fetch a required, non-empty string parameter.
pub fn require_str<'a>(params: &'a serde_json::Value, key: &str) -> Result<&'a str, ToolError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::InvalidParameters(format!("missing required parameter '{key}'")))
}
