//! Shared types for the reply pipeline.

use serde::{Deserialize, Serialize};

pub use crate::agent::{ConversationTurn, TurnRole};
use crate::mailbox::types::string_or_first;
pub use crate::mailbox::{AttachmentInfo, ThreadSummary};
use crate::pipeline::guardrail::GuardrailState;

// ── Triggers ────────────────────────────────────────────────────────

/// Body of a webhook delivery.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub message: Option<InboundEvent>,
}

/// A newly received message, as carried inline by a webhook event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default, deserialize_with = "string_or_first")]
    pub from: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentInfo>,
}

/// What asked the processor to act.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// Webhook path: the event names the message to answer.
    Event(InboundEvent),
    /// Batch path: only the thread is known; answer its latest external message.
    Poll(ThreadSummary),
}

impl Trigger {
    pub fn thread_id(&self) -> Option<&str> {
        let id = match self {
            Self::Event(event) => event.thread_id.as_deref(),
            Self::Poll(summary) => Some(summary.thread_id.as_str()),
        };
        id.map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn source(&self) -> &'static str {
        match self {
            Self::Event(_) => "webhook",
            Self::Poll(_) => "batch",
        }
    }
}

// ── Thread projection ───────────────────────────────────────────────

/// A thread message after sender classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadMessage {
    pub message_id: String,
    pub sender_address: Option<String>,
    /// Text body, else HTML body, else empty.
    pub body: String,
    /// Sent from outside the inbox's domain.
    pub is_external: bool,
}

impl ThreadMessage {
    pub fn to_turn(&self) -> ConversationTurn {
        if self.is_external {
            ConversationTurn::user(self.body.clone())
        } else {
            ConversationTurn::assistant(self.body.clone())
        }
    }
}

// ── Output ──────────────────────────────────────────────────────────

/// The reply handed to the Mailbox Service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyResult {
    pub thread_id: String,
    /// Message the reply answers.
    pub message_id: String,
    pub rendered_html: String,
}

/// Successful outcome of one `ThreadProcessor::handle` call.
#[derive(Debug, Clone)]
pub struct Sent {
    pub reply: ReplyResult,
    /// Guardrail state observed before the reply was generated.
    pub guardrail: GuardrailState,
    /// History turns passed ahead of the prompt.
    pub history_turns: usize,
}
