//! OpenAI Responses API provider.
//!
//! Web search runs as a hosted tool inside the API; function tools come back
//! as calls for the agent loop to execute.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::LlmError;
use crate::llm::costs;
use crate::llm::provider::{
    ChatMessage, FinishReason, HostedTool, LlmProvider, Role, ToolCall, ToolCompletionRequest,
    ToolCompletionResponse,
};

const PROVIDER: &str = "openai";

/// Placeholder for turns with no body; the API rejects empty input text.
const EMPTY_CONTENT: &str = "(empty message)";

/// LLM provider backed by `POST {base_url}/responses`.
pub struct OpenAiProvider {
    http: Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl OpenAiProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        }
    }

    fn build_body(&self, request: &ToolCompletionRequest) -> Value {
        let instructions = request
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let input: Vec<Value> = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .flat_map(input_items)
            .collect();

        let mut tools: Vec<Value> = request
            .tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                })
            })
            .collect();
        for hosted in &request.hosted_tools {
            match hosted {
                HostedTool::WebSearch => tools.push(json!({ "type": "web_search_preview" })),
            }
        }

        let mut body = json!({
            "model": self.model,
            "input": input,
        });
        if !instructions.is_empty() {
            body["instructions"] = json!(instructions);
        }
        if !tools.is_empty() {
            body["tools"] = json!(tools);
        }
        body
    }
}

/// Map one transcript message to Responses API input items.
fn input_items(message: &ChatMessage) -> Vec<Value> {
    let text = if message.content.trim().is_empty() {
        EMPTY_CONTENT
    } else {
        message.content.as_str()
    };

    match message.role {
        Role::System => Vec::new(),
        Role::User => vec![json!({ "role": "user", "content": text })],
        Role::Assistant if message.tool_calls.is_empty() => {
            vec![json!({ "role": "assistant", "content": text })]
        }
        Role::Assistant => {
            let mut items = Vec::with_capacity(message.tool_calls.len() + 1);
            if !message.content.trim().is_empty() {
                items.push(json!({ "role": "assistant", "content": message.content }));
            }
            items.extend(message.tool_calls.iter().map(|call| {
                json!({
                    "type": "function_call",
                    "call_id": call.id,
                    "name": call.name,
                    "arguments": call.arguments.to_string(),
                })
            }));
            items
        }
        Role::Tool => vec![json!({
            "type": "function_call_output",
            "call_id": message.tool_call_id.as_deref().unwrap_or_default(),
            "output": message.content,
        })],
    }
}

#[derive(Debug, Deserialize)]
struct ResponsesReply {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputItem {
    Message {
        #[serde(default)]
        content: Vec<ContentPart>,
    },
    FunctionCall {
        call_id: String,
        name: String,
        #[serde(default)]
        arguments: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    OutputText {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

fn parse_reply(reply: ResponsesReply) -> ToolCompletionResponse {
    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for item in reply.output {
        match item {
            OutputItem::Message { content } => {
                for part in content {
                    if let ContentPart::OutputText { text: t } = part {
                        text.push_str(&t);
                    }
                }
            }
            OutputItem::FunctionCall {
                call_id,
                name,
                arguments,
            } => {
                let arguments = if arguments.trim().is_empty() {
                    json!({})
                } else {
                    serde_json::from_str(&arguments).unwrap_or(Value::String(arguments))
                };
                tool_calls.push(ToolCall {
                    id: call_id,
                    name,
                    arguments,
                });
            }
            OutputItem::Other => {}
        }
    }

    let finish_reason = if !tool_calls.is_empty() {
        FinishReason::ToolUse
    } else {
        match reply.status.as_deref() {
            Some("completed") | None => FinishReason::Stop,
            Some("incomplete") => FinishReason::Length,
            Some(_) => FinishReason::Unknown,
        }
    };
    let usage = reply.usage.unwrap_or_default();

    ToolCompletionResponse {
        content: (!text.is_empty()).then_some(text),
        tool_calls,
        input_tokens: usage.input_tokens,
        output_tokens: usage.output_tokens,
        finish_reason,
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn cost_per_token(&self) -> (Decimal, Decimal) {
        costs::model_cost(&self.model)
    }

    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse, LlmError> {
        let body = self.build_body(&request);

        let response = self
            .http
            .post(format!("{}/responses", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(LlmError::AuthFailed {
                provider: PROVIDER.to_string(),
            });
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(LlmError::RateLimited {
                provider: PROVIDER.to_string(),
                retry_after,
            });
        }

        let text = response.text().await.map_err(|e| LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: e.to_string(),
        })?;
        if !status.is_success() {
            return Err(LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("HTTP {}: {}", status.as_u16(), text),
            });
        }

        let reply: ResponsesReply =
            serde_json::from_str(&text).map_err(|e| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;
        Ok(parse_reply(reply))
    }
}
