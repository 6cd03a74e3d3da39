//! Mailbox Service abstraction.
//!
//! The provider stores inboxes and threads and delivers mail; this crate only
//! calls it. `AgentMailClient` is the production implementation, tests swap
//! in fakes behind the same trait.

pub mod agentmail;
pub mod types;

pub use agentmail::AgentMailClient;
pub use types::*;

use async_trait::async_trait;

use crate::error::MailboxError;

/// Request body for `create_inbox`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CreateInbox {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub client_id: String,
}

/// Request body for `register_webhook`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RegisterWebhook {
    pub url: String,
    pub inbox_ids: Vec<String>,
    pub event_types: Vec<String>,
    pub client_id: String,
}

/// Operations consumed from the Mailbox Service.
#[async_trait]
pub trait MailboxService: Send + Sync {
    /// Create (or, for a known client id, return) an inbox.
    async fn create_inbox(&self, request: &CreateInbox) -> Result<Inbox, MailboxError>;

    /// Fetch a thread with its messages in chronological order.
    async fn get_thread(&self, inbox_id: &str, thread_id: &str)
    -> Result<MailThread, MailboxError>;

    /// List threads, optionally restricted to the given labels.
    async fn list_threads(
        &self,
        inbox_id: &str,
        labels: &[String],
    ) -> Result<Vec<ThreadSummary>, MailboxError>;

    /// Reply to a message with an HTML body.
    async fn reply(&self, inbox_id: &str, message_id: &str, html: &str)
    -> Result<(), MailboxError>;

    /// Download one attachment of a message.
    async fn get_attachment(
        &self,
        inbox_id: &str,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<AttachmentContent, MailboxError>;

    /// Register a webhook for inbound events.
    async fn register_webhook(
        &self,
        request: &RegisterWebhook,
    ) -> Result<WebhookHandle, MailboxError>;
}
