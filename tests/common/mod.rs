//! Shared fakes for integration tests: an in-memory mailbox and a scripted
//! agent. No network calls.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use inbox_agent::agent::{AgentOutput, ConversationTurn, ReasoningAgent};
use inbox_agent::error::{AgentError, MailboxError};
use inbox_agent::llm::TokenUsage;
use inbox_agent::mailbox::{
    AttachmentContent, AttachmentInfo, CreateInbox, Inbox, MailMessage, MailThread,
    MailboxService, RegisterWebhook, ThreadSummary, WebhookHandle,
};
use inbox_agent::pipeline::ThreadProcessor;

pub const INBOX_ID: &str = "hiring@agentmail.to";
pub const INBOX_DOMAIN: &str = "agentmail.to";

/// Maximum time any async wait in a test may take.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

pub fn message(id: &str, from: &str, text: &str) -> MailMessage {
    MailMessage {
        message_id: id.to_string(),
        from_address: Some(from.to_string()),
        subject: None,
        text: Some(text.to_string()),
        html: None,
        timestamp: None,
        attachments: vec![],
    }
}

pub fn attachment(id: &str, filename: &str) -> AttachmentInfo {
    AttachmentInfo {
        attachment_id: id.to_string(),
        filename: Some(filename.to_string()),
        content_type: Some("application/pdf".to_string()),
        size: Some(4096),
    }
}

/// In-memory mailbox. Replies are appended to the thread as messages from
/// the inbox, and the thread gains the `sent` label, as the provider does.
#[derive(Default)]
pub struct FakeMailbox {
    threads: Mutex<HashMap<String, MailThread>>,
    order: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    replies: Mutex<Vec<(String, String)>>,
    fetches: Mutex<Vec<String>>,
    webhooks: Mutex<Vec<RegisterWebhook>>,
    reply_seq: Mutex<usize>,
}

impl FakeMailbox {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_thread(
        &self,
        thread_id: &str,
        subject: &str,
        labels: &[&str],
        messages: Vec<MailMessage>,
    ) {
        self.order.lock().unwrap().push(thread_id.to_string());
        self.threads.lock().unwrap().insert(
            thread_id.to_string(),
            MailThread {
                thread_id: thread_id.to_string(),
                subject: Some(subject.to_string()),
                labels: labels.iter().map(|s| s.to_string()).collect(),
                messages,
            },
        );
    }

    pub fn push_message(&self, thread_id: &str, message: MailMessage) {
        if let Some(thread) = self.threads.lock().unwrap().get_mut(thread_id) {
            thread.messages.push(message);
        }
    }

    /// Make `get_thread` fail for this thread.
    pub fn fail_thread(&self, thread_id: &str) {
        self.failing.lock().unwrap().insert(thread_id.to_string());
    }

    /// `(message_id, html)` of every reply, in order.
    pub fn replies(&self) -> Vec<(String, String)> {
        self.replies.lock().unwrap().clone()
    }

    /// Thread ids passed to `get_thread`, in order.
    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn webhooks(&self) -> Vec<RegisterWebhook> {
        self.webhooks.lock().unwrap().clone()
    }

    fn thread_of(&self, message_id: &str) -> Option<String> {
        self.threads
            .lock()
            .unwrap()
            .values()
            .find(|t| t.messages.iter().any(|m| m.message_id == message_id))
            .map(|t| t.thread_id.clone())
    }
}

#[async_trait]
impl MailboxService for FakeMailbox {
    async fn create_inbox(&self, request: &CreateInbox) -> Result<Inbox, MailboxError> {
        Ok(Inbox {
            inbox_id: format!(
                "{}@{}",
                request.username,
                request.domain.as_deref().unwrap_or(INBOX_DOMAIN)
            ),
            display_name: request.display_name.clone(),
        })
    }

    async fn get_thread(
        &self,
        _inbox_id: &str,
        thread_id: &str,
    ) -> Result<MailThread, MailboxError> {
        self.fetches.lock().unwrap().push(thread_id.to_string());
        if self.failing.lock().unwrap().contains(thread_id) {
            return Err(MailboxError::Api {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        self.threads
            .lock()
            .unwrap()
            .get(thread_id)
            .cloned()
            .ok_or_else(|| MailboxError::ThreadNotFound {
                thread_id: thread_id.to_string(),
            })
    }

    async fn list_threads(
        &self,
        _inbox_id: &str,
        labels: &[String],
    ) -> Result<Vec<ThreadSummary>, MailboxError> {
        let threads = self.threads.lock().unwrap();
        Ok(self
            .order
            .lock()
            .unwrap()
            .iter()
            .filter_map(|id| threads.get(id))
            .filter(|t| labels.iter().all(|l| t.labels.contains(l)))
            .map(|t| ThreadSummary {
                thread_id: t.thread_id.clone(),
                subject: t.subject.clone(),
                labels: t.labels.clone(),
            })
            .collect())
    }

    async fn reply(
        &self,
        _inbox_id: &str,
        message_id: &str,
        html: &str,
    ) -> Result<(), MailboxError> {
        self.replies
            .lock()
            .unwrap()
            .push((message_id.to_string(), html.to_string()));

        if let Some(thread_id) = self.thread_of(message_id) {
            let seq = {
                let mut seq = self.reply_seq.lock().unwrap();
                *seq += 1;
                *seq
            };
            let mut threads = self.threads.lock().unwrap();
            if let Some(thread) = threads.get_mut(&thread_id) {
                thread.messages.push(MailMessage {
                    message_id: format!("reply-{seq}"),
                    from_address: Some(format!("Hiring <{INBOX_ID}>")),
                    subject: None,
                    text: None,
                    html: Some(html.to_string()),
                    timestamp: None,
                    attachments: vec![],
                });
                if !thread.labels.iter().any(|l| l == "sent") {
                    thread.labels.push("sent".to_string());
                }
            }
        }
        Ok(())
    }

    async fn get_attachment(
        &self,
        _inbox_id: &str,
        _message_id: &str,
        _attachment_id: &str,
    ) -> Result<AttachmentContent, MailboxError> {
        Ok(AttachmentContent {
            content_type: Some("text/plain".to_string()),
            bytes: b"attachment".to_vec(),
        })
    }

    async fn register_webhook(
        &self,
        request: &RegisterWebhook,
    ) -> Result<WebhookHandle, MailboxError> {
        self.webhooks.lock().unwrap().push(request.clone());
        Ok(WebhookHandle {
            webhook_id: "wh-1".to_string(),
            url: Some(request.url.clone()),
        })
    }
}

/// Agent answering with a fixed reply and recording every conversation.
pub struct ScriptedAgent {
    answer: String,
    delay: Duration,
    failure: Option<fn() -> AgentError>,
    calls: Mutex<Vec<Vec<ConversationTurn>>>,
}

impl ScriptedAgent {
    pub fn answering(answer: &str) -> Arc<Self> {
        Self::slow(answer, Duration::ZERO)
    }

    pub fn slow(answer: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            answer: answer.to_string(),
            delay,
            failure: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Every run fails with the error `failure` builds.
    pub fn failing(failure: fn() -> AgentError) -> Arc<Self> {
        Arc::new(Self {
            answer: String::new(),
            delay: Duration::ZERO,
            failure: Some(failure),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Vec<ConversationTurn>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReasoningAgent for ScriptedAgent {
    async fn run(&self, conversation: &[ConversationTurn]) -> Result<AgentOutput, AgentError> {
        self.calls.lock().unwrap().push(conversation.to_vec());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(failure) = self.failure {
            return Err(failure());
        }
        Ok(AgentOutput {
            final_output: self.answer.clone(),
            usage: TokenUsage {
                input_tokens: 100,
                output_tokens: 20,
            },
            tool_calls: 0,
        })
    }
}

pub fn processor(mailbox: &Arc<FakeMailbox>, agent: &Arc<ScriptedAgent>) -> Arc<ThreadProcessor> {
    Arc::new(ThreadProcessor::new(
        Arc::clone(mailbox) as Arc<dyn MailboxService>,
        Arc::clone(agent) as Arc<dyn ReasoningAgent>,
        INBOX_ID,
        INBOX_DOMAIN,
    ))
}

/// Poll `check` until it holds or the test timeout elapses.
pub async fn wait_until(check: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + TEST_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
