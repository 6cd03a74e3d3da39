//! Startup wiring against an in-memory mailbox.

mod common;

use std::collections::HashMap;

use common::FakeMailbox;
use inbox_agent::app::App;
use inbox_agent::config::ServiceConfig;

fn config(extra: &[(&str, &str)]) -> ServiceConfig {
    let mut env: HashMap<String, String> = [
        ("INBOX_USERNAME", "hiring"),
        ("AGENTMAIL_API_KEY", "am-key"),
        ("OPENAI_API_KEY", "sk-test"),
        ("SYSTEM_PROMPT", "You answer for {inbox}."),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in extra {
        env.insert(k.to_string(), v.to_string());
    }
    ServiceConfig::from_lookup(|key| env.get(key).cloned()).unwrap()
}

#[tokio::test]
async fn registers_webhook_for_created_inbox() {
    let mailbox = FakeMailbox::new();
    let app = App::with_mailbox(
        config(&[("WEBHOOK_URL", "https://example.com/hook")]),
        mailbox.clone(),
        true,
    )
    .await
    .unwrap();

    assert_eq!(app.inbox.inbox_id, "hiring@agentmail.to");
    assert_eq!(app.processor.inbox_id(), "hiring@agentmail.to");

    let hooks = mailbox.webhooks();
    assert_eq!(hooks.len(), 1);
    assert_eq!(hooks[0].url, "https://example.com/hook");
    assert_eq!(hooks[0].inbox_ids, vec!["hiring@agentmail.to"]);
    assert_eq!(hooks[0].event_types, vec!["message.received"]);
    assert_eq!(hooks[0].client_id, "hiring-agent-webhook");
}

#[tokio::test]
async fn no_registration_without_url_or_when_disabled() {
    let mailbox = FakeMailbox::new();
    App::with_mailbox(config(&[]), mailbox.clone(), true)
        .await
        .unwrap();
    App::with_mailbox(
        config(&[("WEBHOOK_URL", "https://example.com/hook")]),
        mailbox.clone(),
        false,
    )
    .await
    .unwrap();

    assert!(mailbox.webhooks().is_empty());
}
