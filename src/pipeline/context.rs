//! Thread context reconstruction: sender classification and turn history.
//!
//! Pure functions, no I/O.

use crate::mailbox::MailMessage;
use crate::pipeline::types::{ConversationTurn, ThreadMessage};

/// Extract the bare address from `Name <addr>` or `addr`, lowercased.
pub fn parse_address(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let candidate = match (raw.rfind('<'), raw.rfind('>')) {
        (Some(open), Some(close)) if open < close => &raw[open + 1..close],
        _ => raw,
    };
    let candidate = candidate.trim().trim_matches('"');
    if candidate.contains('@') && !candidate.contains(char::is_whitespace) {
        Some(candidate.to_lowercase())
    } else {
        None
    }
}

/// Domain part of an address.
pub fn domain_of(address: &str) -> Option<&str> {
    address
        .rsplit_once('@')
        .map(|(_, domain)| domain)
        .filter(|d| !d.is_empty())
}

/// Whether a sender is outside the inbox's own domain.
///
/// Messages with no parsable sender count as the inbox's own.
pub fn is_external(sender: Option<&str>, inbox_domain: &str) -> bool {
    sender
        .and_then(parse_address)
        .as_deref()
        .and_then(domain_of)
        .is_some_and(|domain| !domain.eq_ignore_ascii_case(inbox_domain.trim()))
}

/// Body used for a message: text, else HTML, else empty.
pub fn message_body(text: Option<&str>, html: Option<&str>) -> String {
    [text, html]
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Classify every message; order and count are preserved.
pub fn classify(messages: &[MailMessage], inbox_domain: &str) -> Vec<ThreadMessage> {
    messages
        .iter()
        .map(|m| ThreadMessage {
            message_id: m.message_id.clone(),
            sender_address: m.from_address.as_deref().and_then(parse_address),
            body: message_body(m.text.as_deref(), m.html.as_deref()),
            is_external: is_external(m.from_address.as_deref(), inbox_domain),
        })
        .collect()
}

/// Role-tagged history, skipping only the message being answered.
pub fn history(
    messages: &[ThreadMessage],
    exclude_message_id: Option<&str>,
) -> Vec<ConversationTurn> {
    messages
        .iter()
        .filter(|m| Some(m.message_id.as_str()) != exclude_message_id)
        .map(ThreadMessage::to_turn)
        .collect()
}

/// Most recent externally authored message.
pub fn latest_external(messages: &[ThreadMessage]) -> Option<&ThreadMessage> {
    messages.iter().rev().find(|m| m.is_external)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::TurnRole;

    fn mail(id: &str, from: Option<&str>, text: Option<&str>, html: Option<&str>) -> MailMessage {
        MailMessage {
            message_id: id.into(),
            from_address: from.map(str::to_string),
            subject: None,
            text: text.map(str::to_string),
            html: html.map(str::to_string),
            timestamp: None,
            attachments: vec![],
        }
    }

    #[test]
    fn parse_address_forms() {
        assert_eq!(parse_address("ann@x.com").as_deref(), Some("ann@x.com"));
        assert_eq!(
            parse_address("Ann Lee <Ann@X.com>").as_deref(),
            Some("ann@x.com")
        );
        assert_eq!(parse_address("\"Lee, Ann\" <ann@x.com>").as_deref(), Some("ann@x.com"));
        assert_eq!(parse_address("not an address"), None);
        assert_eq!(parse_address(""), None);
    }

    #[test]
    fn external_is_domain_based() {
        assert!(is_external(Some("ann@gmail.com"), "agentmail.to"));
        assert!(!is_external(Some("Bot <hiring@agentmail.to>"), "agentmail.to"));
        assert!(!is_external(Some("hiring@AgentMail.TO"), "agentmail.to"));
        assert!(!is_external(None, "agentmail.to"));
        assert!(!is_external(Some("garbage"), "agentmail.to"));
        // A lookalike domain is still external.
        assert!(is_external(Some("x@evil-agentmail.to"), "agentmail.to"));
    }

    #[test]
    fn body_prefers_text_then_html() {
        assert_eq!(message_body(Some("t"), Some("<p>h</p>")), "t");
        assert_eq!(message_body(Some("  "), Some("<p>h</p>")), "<p>h</p>");
        assert_eq!(message_body(None, None), "");
    }

    #[test]
    fn all_internal_thread_yields_only_assistant_turns() {
        let messages: Vec<MailMessage> = (0..4)
            .map(|i| {
                let body = format!("b{i}");
                mail(&format!("m{i}"), Some("hiring@agentmail.to"), Some(body.as_str()), None)
            })
            .collect();
        let classified = classify(&messages, "agentmail.to");
        let turns = history(&classified, None);
        assert_eq!(turns.len(), 4);
        assert!(turns.iter().all(|t| t.role == TurnRole::Assistant));
        let bodies: Vec<_> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(bodies, vec!["b0", "b1", "b2", "b3"]);
    }

    #[test]
    fn empty_messages_are_kept_as_empty_turns() {
        let messages = vec![
            mail("m1", Some("ann@gmail.com"), Some("hello"), None),
            mail("m2", Some("hiring@agentmail.to"), None, None),
            mail("m3", Some("ann@gmail.com"), Some("again"), None),
        ];
        let classified = classify(&messages, "agentmail.to");
        let turns = history(&classified, Some("m3"));
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1], ConversationTurn::assistant(""));
    }

    #[test]
    fn latest_external_skips_trailing_internal() {
        let messages = vec![
            mail("m1", Some("ann@gmail.com"), Some("first"), None),
            mail("m2", Some("bob@gmail.com"), Some("second"), None),
            mail("m3", Some("hiring@agentmail.to"), Some("ours"), None),
        ];
        let classified = classify(&messages, "agentmail.to");
        assert_eq!(latest_external(&classified).unwrap().message_id, "m2");

        let internal_only = classify(&messages[2..], "agentmail.to");
        assert!(latest_external(&internal_only).is_none());
    }

    #[test]
    fn single_message_thread_has_empty_history() {
        let messages = vec![mail("m1", Some("ann@gmail.com"), Some("hi"), None)];
        let classified = classify(&messages, "agentmail.to");
        assert!(history(&classified, Some("m1")).is_empty());
    }
}
