//! Thread processor: one trigger in, at most one reply out.
//!
//! Flow:
//! 1. Resolve the thread id, then serialise on it
//! 2. Fetch the thread and classify every message
//! 3. Recompute the guardrail state from the full history
//! 4. Pick the triggering message and claim it in the ledger
//! 5. Build the prompt and run the agent once
//! 6. Inspect the output, then send exactly one reply
//!
//! Every failure before step 6 sends nothing.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::agent::ReasoningAgent;
use crate::error::{AgentError, ProcessingError};
use crate::mailbox::{AttachmentInfo, MailThread, MailboxService};
use crate::pipeline::context;
use crate::pipeline::dedup::ThreadGate;
use crate::pipeline::guardrail::{GuardrailDetector, GuardrailState};
use crate::pipeline::prompt::{PromptInput, build_prompt};
use crate::pipeline::types::{
    ConversationTurn, InboundEvent, ReplyResult, Sent, ThreadMessage, Trigger,
};
use crate::safety::SafetyLayer;

/// Shown when a triggering message has no usable sender.
const UNKNOWN_SENDER: &str = "Unknown";

/// The message a reply will answer.
#[derive(Debug)]
struct Target {
    message_id: String,
    from: String,
    subject: Option<String>,
    body: Option<String>,
    attachments: Vec<AttachmentInfo>,
}

pub struct ThreadProcessor {
    mailbox: Arc<dyn MailboxService>,
    agent: Arc<dyn ReasoningAgent>,
    inbox_id: String,
    inbox_domain: String,
    detector: GuardrailDetector,
    safety: SafetyLayer,
    gate: ThreadGate,
}

impl ThreadProcessor {
    pub fn new(
        mailbox: Arc<dyn MailboxService>,
        agent: Arc<dyn ReasoningAgent>,
        inbox_id: impl Into<String>,
        inbox_domain: impl Into<String>,
    ) -> Self {
        Self {
            mailbox,
            agent,
            inbox_id: inbox_id.into(),
            inbox_domain: inbox_domain.into(),
            detector: GuardrailDetector::default(),
            safety: SafetyLayer::new(),
            gate: ThreadGate::default(),
        }
    }

    pub fn with_detector(mut self, detector: GuardrailDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_gate(mut self, gate: ThreadGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn inbox_id(&self) -> &str {
        &self.inbox_id
    }

    pub fn gate(&self) -> &ThreadGate {
        &self.gate
    }

    /// Handle one trigger.
    pub async fn handle(&self, trigger: Trigger) -> Result<Sent, ProcessingError> {
        let thread_id = trigger
            .thread_id()
            .ok_or(ProcessingError::MissingThreadContext)?
            .to_string();
        let _permit = self.gate.lock(&thread_id).await;

        debug!(thread_id = %thread_id, source = trigger.source(), "Handling trigger");

        let thread = self
            .mailbox
            .get_thread(&self.inbox_id, &thread_id)
            .await
            .map_err(|source| ProcessingError::ThreadFetch {
                thread_id: thread_id.clone(),
                source,
            })?;

        let messages = context::classify(&thread.messages, &self.inbox_domain);
        let guardrail = self.detector.detect(&thread.messages);
        let target = self.resolve_target(&trigger, &thread, &messages, &thread_id)?;

        if !self.gate.claim(&thread_id, &target.message_id) {
            return Err(ProcessingError::Duplicate {
                thread_id,
                message_id: target.message_id,
            });
        }

        match self.respond(&thread_id, &messages, &target, guardrail).await {
            Ok(sent) => Ok(sent),
            Err(e) => {
                self.gate.release(&thread_id, &target.message_id);
                Err(e)
            }
        }
    }

    /// Steps after the message is claimed; the caller releases the claim on error.
    async fn respond(
        &self,
        thread_id: &str,
        messages: &[ThreadMessage],
        target: &Target,
        guardrail: GuardrailState,
    ) -> Result<Sent, ProcessingError> {
        let prompt = build_prompt(
            &PromptInput {
                from: &target.from,
                subject: target.subject.as_deref(),
                body: target.body.as_deref(),
                attachments: &target.attachments,
                thread_id,
                message_id: &target.message_id,
            },
            guardrail,
        );

        let mut conversation = context::history(messages, Some(&target.message_id));
        let history_turns = conversation.len();
        conversation.push(ConversationTurn::user(prompt));

        info!(
            thread_id = %thread_id,
            message_id = %target.message_id,
            from = %target.from,
            history_turns,
            guardrail_sent = guardrail.already_sent(),
            "Invoking agent"
        );

        let agent_failed = |source| ProcessingError::AgentInvocation {
            thread_id: thread_id.to_string(),
            source,
        };
        let output = self.agent.run(&conversation).await.map_err(agent_failed)?;
        let reply = output.final_output.trim();
        if reply.is_empty() {
            return Err(agent_failed(AgentError::EmptyOutput));
        }

        let inspection = self.safety.inspect_reply(reply);
        if !inspection.is_clean() {
            warn!(
                thread_id = %thread_id,
                warnings = ?inspection.warnings,
                "Reply contains suspicious text; sending anyway"
            );
        }

        let rendered_html = match guardrail {
            GuardrailState::Pending => self.detector.mark(reply),
            GuardrailState::AlreadySent => reply.to_string(),
        };

        self.mailbox
            .reply(&self.inbox_id, &target.message_id, &rendered_html)
            .await
            .map_err(|source| ProcessingError::Delivery {
                thread_id: thread_id.to_string(),
                message_id: target.message_id.clone(),
                source,
            })?;

        info!(
            thread_id = %thread_id,
            message_id = %target.message_id,
            chars = rendered_html.len(),
            tokens = output.usage.total(),
            "Reply sent"
        );

        Ok(Sent {
            reply: ReplyResult {
                thread_id: thread_id.to_string(),
                message_id: target.message_id.clone(),
                rendered_html,
            },
            guardrail,
            history_turns,
        })
    }

    fn resolve_target(
        &self,
        trigger: &Trigger,
        thread: &MailThread,
        messages: &[ThreadMessage],
        thread_id: &str,
    ) -> Result<Target, ProcessingError> {
        let no_user_message = || ProcessingError::NoUserMessage {
            thread_id: thread_id.to_string(),
        };

        match trigger {
            Trigger::Event(event) => match event.message_id.as_deref().map(str::trim) {
                Some(id) if !id.is_empty() => {
                    if !self.is_user_message(event, id, messages) {
                        debug!(thread_id, message_id = id, "Event sent by this inbox; ignoring");
                        return Err(no_user_message());
                    }
                    Ok(self.target_from_event(event, id, thread))
                }
                _ => {
                    let latest = context::latest_external(messages).ok_or_else(no_user_message)?;
                    Ok(self.target_from_thread(&latest.message_id, thread))
                }
            },
            Trigger::Poll(_) => {
                let latest = context::latest_external(messages).ok_or_else(no_user_message)?;
                Ok(self.target_from_thread(&latest.message_id, thread))
            }
        }
    }

    /// The fetched copy decides; the event sender only counts when the
    /// message is not in the thread yet.
    fn is_user_message(
        &self,
        event: &InboundEvent,
        message_id: &str,
        messages: &[ThreadMessage],
    ) -> bool {
        match messages.iter().find(|m| m.message_id == message_id) {
            Some(stored) => stored.is_external,
            None => {
                event.from.is_none()
                    || context::is_external(event.from.as_deref(), &self.inbox_domain)
            }
        }
    }

    /// Event fields win; the fetched copy fills gaps.
    fn target_from_event(
        &self,
        event: &InboundEvent,
        message_id: &str,
        thread: &MailThread,
    ) -> Target {
        let stored = thread.messages.iter().find(|m| m.message_id == message_id);
        let stored_body = stored
            .map(|m| context::message_body(m.text.as_deref(), m.html.as_deref()))
            .filter(|b| !b.is_empty());
        let event_body = context::message_body(event.text.as_deref(), event.html.as_deref());

        Target {
            message_id: message_id.to_string(),
            from: event
                .from
                .clone()
                .or_else(|| stored.and_then(|m| m.from_address.clone()))
                .unwrap_or_else(|| UNKNOWN_SENDER.to_string()),
            subject: event.subject.clone().or_else(|| thread.subject.clone()),
            body: Some(event_body).filter(|b| !b.is_empty()).or(stored_body),
            attachments: if event.attachments.is_empty() {
                stored.map(|m| m.attachments.clone()).unwrap_or_default()
            } else {
                event.attachments.clone()
            },
        }
    }

    fn target_from_thread(&self, message_id: &str, thread: &MailThread) -> Target {
        let stored = thread.messages.iter().find(|m| m.message_id == message_id);
        Target {
            message_id: message_id.to_string(),
            from: stored
                .and_then(|m| m.from_address.clone())
                .unwrap_or_else(|| UNKNOWN_SENDER.to_string()),
            subject: thread
                .subject
                .clone()
                .or_else(|| stored.and_then(|m| m.subject.clone())),
            body: stored
                .map(|m| context::message_body(m.text.as_deref(), m.html.as_deref()))
                .filter(|b| !b.is_empty()),
            attachments: stored.map(|m| m.attachments.clone()).unwrap_or_default(),
        }
    }
}
