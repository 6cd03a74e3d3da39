//! Read-only mailbox tools for the Reasoning Agent.
//!
//! The agent may re-read the thread it is answering, browse the inbox, and
//! open attachments. It gets no send tool: the Thread Processor is the only
//! component that delivers mail.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::json;

use crate::mailbox::MailboxService;
use crate::tools::registry::ToolRegistry;
use crate::tools::tool::{Tool, ToolError, ToolOutput, require_str};

/// Per-message body cap in `get_thread` output.
const MAX_BODY_CHARS: usize = 8_000;

/// Cap on attachment text returned to the model.
const MAX_ATTACHMENT_CHARS: usize = 20_000;

/// Cap on threads returned by `list_threads`.
const MAX_LISTED_THREADS: usize = 50;

/// Register every mailbox tool for one inbox.
pub fn register_mailbox_tools(
    registry: &ToolRegistry,
    mailbox: Arc<dyn MailboxService>,
    inbox_id: &str,
) {
    registry.register_sync(Arc::new(GetThreadTool::new(Arc::clone(&mailbox), inbox_id)));
    registry.register_sync(Arc::new(ListThreadsTool::new(Arc::clone(&mailbox), inbox_id)));
    registry.register_sync(Arc::new(GetAttachmentTool::new(mailbox, inbox_id)));
}

fn clip(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}\n[truncated]", &s[..idx]),
        None => s.to_string(),
    }
}

fn failed(e: impl std::fmt::Display) -> ToolError {
    ToolError::ExecutionFailed(e.to_string())
}

// ── get_thread ──────────────────────────────────────────────────────

pub struct GetThreadTool {
    mailbox: Arc<dyn MailboxService>,
    inbox_id: String,
}

impl GetThreadTool {
    pub fn new(mailbox: Arc<dyn MailboxService>, inbox_id: &str) -> Self {
        Self {
            mailbox,
            inbox_id: inbox_id.to_string(),
        }
    }
}

#[async_trait]
impl Tool for GetThreadTool {
    fn name(&self) -> &str {
        "get_thread"
    }

    fn description(&self) -> &str {
        "Fetch every message of an email thread in this inbox, oldest first. \
         Use the exact THREAD_ID given in the prompt."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "thread_id": { "type": "string", "description": "Thread to fetch" }
            },
            "required": ["thread_id"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let thread_id = require_str(&params, "thread_id")?;
        let thread = self
            .mailbox
            .get_thread(&self.inbox_id, thread_id)
            .await
            .map_err(failed)?;

        let messages: Vec<_> = thread
            .messages
            .iter()
            .map(|m| {
                let body = m.text.as_deref().or(m.html.as_deref()).unwrap_or_default();
                json!({
                    "message_id": m.message_id,
                    "from": m.from_address,
                    "timestamp": m.timestamp,
                    "body": clip(body, MAX_BODY_CHARS),
                    "attachments": m.attachments,
                })
            })
            .collect();

        Ok(ToolOutput::success(
            json!({
                "thread_id": thread.thread_id,
                "subject": thread.subject,
                "labels": thread.labels,
                "messages": messages,
            }),
            start.elapsed(),
        ))
    }
}

// ── list_threads ────────────────────────────────────────────────────

pub struct ListThreadsTool {
    mailbox: Arc<dyn MailboxService>,
    inbox_id: String,
}

impl ListThreadsTool {
    pub fn new(mailbox: Arc<dyn MailboxService>, inbox_id: &str) -> Self {
        Self {
            mailbox,
            inbox_id: inbox_id.to_string(),
        }
    }
}

#[async_trait]
impl Tool for ListThreadsTool {
    fn name(&self) -> &str {
        "list_threads"
    }

    fn description(&self) -> &str {
        "List threads in this inbox with their subjects and labels, optionally \
         filtered by label."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "labels": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Only threads carrying all of these labels"
                }
            }
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let labels: Vec<String> = params
            .get("labels")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let threads = self
            .mailbox
            .list_threads(&self.inbox_id, &labels)
            .await
            .map_err(failed)?;
        let total = threads.len();
        let shown: Vec<_> = threads.into_iter().take(MAX_LISTED_THREADS).collect();

        Ok(ToolOutput::success(
            json!({ "total": total, "threads": shown }),
            start.elapsed(),
        ))
    }
}

// ── get_attachment ──────────────────────────────────────────────────

pub struct GetAttachmentTool {
    mailbox: Arc<dyn MailboxService>,
    inbox_id: String,
}

impl GetAttachmentTool {
    pub fn new(mailbox: Arc<dyn MailboxService>, inbox_id: &str) -> Self {
        Self {
            mailbox,
            inbox_id: inbox_id.to_string(),
        }
    }
}

#[async_trait]
impl Tool for GetAttachmentTool {
    fn name(&self) -> &str {
        "get_attachment"
    }

    fn description(&self) -> &str {
        "Download an attachment of a message and return its text content. Use the \
         exact MESSAGE_ID from the prompt and the attachment ID from the listing."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "message_id": { "type": "string" },
                "attachment_id": { "type": "string" }
            },
            "required": ["message_id", "attachment_id"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let message_id = require_str(&params, "message_id")?;
        let attachment_id = require_str(&params, "attachment_id")?;

        let attachment = self
            .mailbox
            .get_attachment(&self.inbox_id, message_id, attachment_id)
            .await
            .map_err(failed)?;

        let output = match attachment.as_text() {
            Some(text) => json!({
                "attachment_id": attachment_id,
                "content_type": attachment.content_type,
                "size": attachment.bytes.len(),
                "text": clip(text, MAX_ATTACHMENT_CHARS),
            }),
            None => json!({
                "attachment_id": attachment_id,
                "content_type": attachment.content_type,
                "size": attachment.bytes.len(),
                "text": null,
                "note": "binary content; no text extracted",
            }),
        };
        Ok(ToolOutput::success(output, start.elapsed()))
    }
}
