//! Once-per-thread informational block tracking.
//!
//! The state is never stored: it is recomputed from the thread on every
//! invocation. Replies sent while the block is owed carry [`GUARDRAIL_MARKER`],
//! an HTML comment invisible to the reader. Older threads are still
//! recognised through legacy sentinel phrases.

use serde::Serialize;

use crate::mailbox::MailMessage;

/// Marker appended to the reply that delivers the block.
pub const GUARDRAIL_MARKER: &str = "<!-- inbox-agent:guardrail-block -->";

/// Phrases that identified the block before the marker existed.
pub const DEFAULT_LEGACY_SENTINELS: &[&str] = &[
    "For legal reasons I am copy pasting the details of the role",
    "<strong>Role:</strong> Founding Engineer",
];

/// Whether the thread already contains the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardrailState {
    /// Not yet sent; the next reply must include it.
    Pending,
    AlreadySent,
}

impl GuardrailState {
    pub fn already_sent(self) -> bool {
        self == Self::AlreadySent
    }
}

#[derive(Debug, Clone)]
pub struct GuardrailDetector {
    sentinels: Vec<String>,
}

impl GuardrailDetector {
    /// Detector recognising the marker, the default legacy phrases and `extra`.
    pub fn new(extra: impl IntoIterator<Item = String>) -> Self {
        let mut sentinels: Vec<String> = std::iter::once(GUARDRAIL_MARKER.to_string())
            .chain(DEFAULT_LEGACY_SENTINELS.iter().map(|s| s.to_string()))
            .collect();
        for phrase in extra {
            let phrase = phrase.trim().to_string();
            if !phrase.is_empty() && !sentinels.contains(&phrase) {
                sentinels.push(phrase);
            }
        }
        Self { sentinels }
    }

    /// Scan both bodies of every message.
    pub fn detect(&self, messages: &[MailMessage]) -> GuardrailState {
        let found = messages
            .iter()
            .flat_map(|m| [m.text.as_deref(), m.html.as_deref()])
            .flatten()
            .any(|body| self.contains_sentinel(body));
        if found {
            GuardrailState::AlreadySent
        } else {
            GuardrailState::Pending
        }
    }

    fn contains_sentinel(&self, body: &str) -> bool {
        self.sentinels.iter().any(|s| body.contains(s.as_str()))
    }

    /// Append the marker to a reply body unless already present.
    pub fn mark(&self, html: &str) -> String {
        if html.contains(GUARDRAIL_MARKER) {
            html.to_string()
        } else {
            format!("{html}\n{GUARDRAIL_MARKER}")
        }
    }
}

impl Default for GuardrailDetector {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
