//! Wire types for the Mailbox Service.

use serde::{Deserialize, Deserializer, Serialize};

/// A provisioned inbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inbox {
    pub inbox_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Attachment metadata as carried on messages and webhook events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentInfo {
    pub attachment_id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// One message of a thread, as returned by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailMessage {
    pub message_id: String,
    /// Sender, usually `Name <address>` or a bare address.
    #[serde(default, rename = "from", deserialize_with = "string_or_first")]
    pub from_address: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    /// Provider timestamp, kept verbatim.
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentInfo>,
}

/// A full thread with its messages in chronological order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailThread {
    pub thread_id: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub messages: Vec<MailMessage>,
}

/// Thread listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub thread_id: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl ThreadSummary {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l.eq_ignore_ascii_case(label))
    }
}

/// One page of `list_threads`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ThreadPage {
    #[serde(default)]
    pub threads: Vec<ThreadSummary>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Downloaded attachment body.
#[derive(Debug, Clone)]
pub struct AttachmentContent {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl AttachmentContent {
    /// Body as text when it is valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

/// A registered webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookHandle {
    pub webhook_id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Accept `"a@b"`, `["a@b", ...]` or null for address fields.
pub(crate) fn string_or_first<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(s)) => Some(s),
        Some(OneOrMany::Many(v)) => v.into_iter().next(),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_from_accepts_string_or_list() {
        let single: MailMessage =
            serde_json::from_str(r#"{"message_id":"m1","from":"Ann <ann@x.com>"}"#).unwrap();
        assert_eq!(single.from_address.as_deref(), Some("Ann <ann@x.com>"));

        let list: MailMessage =
            serde_json::from_str(r#"{"message_id":"m2","from":["ann@x.com","b@y.com"]}"#).unwrap();
        assert_eq!(list.from_address.as_deref(), Some("ann@x.com"));

        let missing: MailMessage = serde_json::from_str(r#"{"message_id":"m3"}"#).unwrap();
        assert!(missing.from_address.is_none());
        assert!(missing.attachments.is_empty());
    }

    #[test]
    fn thread_defaults_when_fields_absent() {
        let thread: MailThread = serde_json::from_str(r#"{"thread_id":"t1"}"#).unwrap();
        assert!(thread.messages.is_empty());
        assert!(thread.labels.is_empty());
        assert!(thread.subject.is_none());
    }

    #[test]
    fn summary_label_match_is_case_insensitive() {
        let summary = ThreadSummary {
            thread_id: "t1".into(),
            subject: None,
            labels: vec!["received".into(), "SENT".into()],
        };
        assert!(summary.has_label("sent"));
        assert!(!summary.has_label("unread"));
    }
}
