//! Safety layer: inspects generated replies before delivery.
//!
//! Checks are advisory. A flagged reply is still sent; the warnings only
//! feed the logs.

use std::sync::LazyLock;

use regex::Regex;

struct ReplyPattern {
    name: &'static str,
    regex: Regex,
}

static REPLY_PATTERNS: LazyLock<Vec<ReplyPattern>> = LazyLock::new(|| {
    [
        ("error_wording", r"(?i)error"),
        ("preamble_leak", r"(?i)\bhere it goes\b"),
        ("tool_failure_echo", r"(?i)\btool '[^']+' does not exist\b"),
        ("unfilled_placeholder", r"\{[a-z_]+\}"),
    ]
    .into_iter()
    .map(|(name, pattern)| ReplyPattern {
        name,
        regex: Regex::new(pattern).expect("reply pattern is a valid regex"),
    })
    .collect()
});

/// Outcome of inspecting a reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyInspection {
    /// Names of the patterns that matched.
    pub warnings: Vec<&'static str>,
}

impl ReplyInspection {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Advisory checks on agent output.
#[derive(Debug, Default, Clone, Copy)]
pub struct SafetyLayer;

impl SafetyLayer {
    pub fn new() -> Self {
        Self
    }

    /// Flag suspicious reply text. Never blocks.
    pub fn inspect_reply(&self, reply: &str) -> ReplyInspection {
        ReplyInspection {
            warnings: REPLY_PATTERNS
                .iter()
                .filter(|p| p.regex.is_match(reply))
                .map(|p| p.name)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_reply() {
        let result = SafetyLayer::new().inspect_reply("<p>Thanks for reaching out!</p>");
        assert!(result.is_clean());
    }

    #[test]
    fn error_wording_flagged_anywhere() {
        let safety = SafetyLayer::new();
        assert_eq!(
            safety.inspect_reply("Sorry, an Error occurred.").warnings,
            vec!["error_wording"]
        );
        assert_eq!(
            safety.inspect_reply("Some errors occurred while checking").warnings,
            vec!["error_wording"]
        );
        assert!(safety.inspect_reply("Looking forward to it").is_clean());
    }

    #[test]
    fn multiple_patterns_reported() {
        let result = SafetyLayer::new().inspect_reply("Here it goes: {inbox} error");
        assert_eq!(
            result.warnings,
            vec!["error_wording", "preamble_leak", "unfilled_placeholder"]
        );
    }
}
