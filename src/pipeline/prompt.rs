//! Prompt assembly for the triggering message.

use crate::mailbox::AttachmentInfo;
use crate::pipeline::guardrail::GuardrailState;

pub const NO_SUBJECT: &str = "(No subject)";
pub const NO_CONTENT: &str = "(No text content)";

pub const INCLUDE_BLOCK_INSTRUCTION: &str = "This is the FIRST reply in this thread that \
    includes the one-time information block. Include that block exactly once as specified \
    by your instructions, then ask ONE concise question.";

pub const SKIP_BLOCK_INSTRUCTION: &str = "The one-time information block has ALREADY been \
    sent earlier in this thread. Do NOT include or repeat that block again. Respond with \
    ONLY a concise follow-up question based on the attachments and prior messages.";

/// Facts about the message being answered.
#[derive(Debug, Clone, Default)]
pub struct PromptInput<'a> {
    pub from: &'a str,
    pub subject: Option<&'a str>,
    pub body: Option<&'a str>,
    pub attachments: &'a [AttachmentInfo],
    pub thread_id: &'a str,
    pub message_id: &'a str,
}

/// Build the final user turn handed to the agent.
pub fn build_prompt(input: &PromptInput<'_>, guardrail: GuardrailState) -> String {
    let subject = non_blank(input.subject).unwrap_or(NO_SUBJECT);
    let body = non_blank(input.body).unwrap_or(NO_CONTENT);

    let mut prompt = format!(
        "From: {}\nSubject: {subject}\nBody: {body}\n",
        input.from
    );

    if !input.attachments.is_empty() {
        prompt.push_str("\nAttachments:\n");
        for a in input.attachments {
            prompt.push_str(&format!(
                "- {} (ID: {}, Type: {}, Size: {} bytes)\n",
                a.filename.as_deref().unwrap_or("unnamed"),
                a.attachment_id,
                a.content_type.as_deref().unwrap_or("unknown"),
                a.size.map_or_else(|| "?".to_string(), |s| s.to_string()),
            ));
        }
    }

    prompt.push_str(&format!(
        "\nIMPORTANT FOR TOOL CALLS:\n- THREAD_ID: {}\n- MESSAGE_ID: {}\n\n\
         Use these EXACT values when calling get_thread and get_attachment tools.\n\n",
        input.thread_id, input.message_id
    ));

    prompt.push_str(match guardrail {
        GuardrailState::Pending => INCLUDE_BLOCK_INSTRUCTION,
        GuardrailState::AlreadySent => SKIP_BLOCK_INSTRUCTION,
    });
    prompt
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment() -> AttachmentInfo {
        AttachmentInfo {
            attachment_id: "att-1".into(),
            filename: Some("cv.pdf".into()),
            content_type: Some("application/pdf".into()),
            size: Some(2048),
        }
    }

    #[test]
    fn prompt_carries_ids_and_attachment_listing() {
        let attachments = vec![attachment()];
        let prompt = build_prompt(
            &PromptInput {
                from: "Ann <ann@gmail.com>",
                subject: Some("Applying"),
                body: Some("Please see my CV"),
                attachments: &attachments,
                thread_id: "T1",
                message_id: "M1",
            },
            GuardrailState::Pending,
        );
        assert!(prompt.starts_with(
            "From: Ann <ann@gmail.com>\nSubject: Applying\nBody: Please see my CV\n"
        ));
        assert!(prompt.contains("- cv.pdf (ID: att-1, Type: application/pdf, Size: 2048 bytes)"));
        assert!(prompt.contains("- THREAD_ID: T1\n- MESSAGE_ID: M1"));
        assert!(prompt.ends_with(INCLUDE_BLOCK_INSTRUCTION));
        assert!(!prompt.contains(SKIP_BLOCK_INSTRUCTION));
    }

    #[test]
    fn placeholders_and_skip_instruction() {
        let prompt = build_prompt(
            &PromptInput {
                from: "ann@gmail.com",
                subject: None,
                body: Some("  "),
                thread_id: "T",
                message_id: "M",
                ..Default::default()
            },
            GuardrailState::AlreadySent,
        );
        assert!(prompt.contains("Subject: (No subject)"));
        assert!(prompt.contains("Body: (No text content)"));
        assert!(!prompt.contains("Attachments:"));
        assert!(prompt.contains(SKIP_BLOCK_INSTRUCTION));
        assert!(!prompt.contains(INCLUDE_BLOCK_INSTRUCTION));
    }
}
