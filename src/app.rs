//! Startup wiring shared by the webhook server and the batch scanner.

use std::sync::Arc;

use tracing::{info, warn};

use crate::agent::ToolAgent;
use crate::config::ServiceConfig;
use crate::error::Error;
use crate::llm::{HostedTool, Reasoning, create_provider};
use crate::mailbox::{AgentMailClient, CreateInbox, Inbox, MailboxService, RegisterWebhook};
use crate::pipeline::{GuardrailDetector, ThreadProcessor};
use crate::tools::{ToolRegistry, register_mailbox_tools};

/// Webhook event types the service subscribes to.
pub const WEBHOOK_EVENT_TYPES: &[&str] = &["message.received"];

/// Everything a binary needs once the inbox exists.
pub struct App {
    pub config: ServiceConfig,
    pub inbox: Inbox,
    pub mailbox: Arc<dyn MailboxService>,
    pub processor: Arc<ThreadProcessor>,
}

impl App {
    /// Build the production service against AgentMail and OpenAI.
    pub async fn bootstrap(config: ServiceConfig, register_webhook: bool) -> Result<Self, Error> {
        let mailbox: Arc<dyn MailboxService> = Arc::new(AgentMailClient::new(
            config.mailbox.base_url.clone(),
            config.mailbox.api_key.clone(),
        ));
        Self::with_mailbox(config, mailbox, register_webhook).await
    }

    /// Build the service on top of an existing mailbox client.
    pub async fn with_mailbox(
        config: ServiceConfig,
        mailbox: Arc<dyn MailboxService>,
        register_webhook: bool,
    ) -> Result<Self, Error> {
        let inbox = mailbox
            .create_inbox(&CreateInbox {
                username: config.mailbox.username.clone(),
                domain: Some(config.mailbox.domain.clone()),
                display_name: config.mailbox.display_name.clone(),
                client_id: config.mailbox.client_id.clone(),
            })
            .await?;
        info!(inbox_id = %inbox.inbox_id, "Inbox ready");

        if register_webhook {
            Self::register_webhook(&config, mailbox.as_ref(), &inbox).await;
        }

        let tools = Arc::new(ToolRegistry::new());
        register_mailbox_tools(&tools, Arc::clone(&mailbox), &inbox.inbox_id);
        info!(tools = tools.count(), "Tools registered");

        let instructions = config.agent.instructions(&config.mailbox.inbox_address());
        let reasoning = Reasoning::new(create_provider(&config.agent))
            .with_system_prompt(instructions)
            .with_hosted_tools(vec![HostedTool::WebSearch]);
        let agent = Arc::new(ToolAgent::new(
            config.agent.name.clone(),
            reasoning,
            tools,
            config.agent.max_turns,
        ));

        let processor = ThreadProcessor::new(
            Arc::clone(&mailbox),
            agent,
            inbox.inbox_id.clone(),
            config.mailbox.domain.clone(),
        )
        .with_detector(GuardrailDetector::new(config.guardrail_sentinels.clone()));

        Ok(Self {
            config,
            inbox,
            mailbox,
            processor: Arc::new(processor),
        })
    }

    /// Failure is logged; the server still runs and the batch scanner can
    /// catch up on missed events.
    async fn register_webhook(config: &ServiceConfig, mailbox: &dyn MailboxService, inbox: &Inbox) {
        let Some(url) = config.webhook.url.clone() else {
            info!("WEBHOOK_URL not set; skipping webhook registration");
            return;
        };

        let request = RegisterWebhook {
            url,
            inbox_ids: vec![inbox.inbox_id.clone()],
            event_types: WEBHOOK_EVENT_TYPES.iter().map(|s| s.to_string()).collect(),
            client_id: config.webhook.client_id.clone(),
        };
        match mailbox.register_webhook(&request).await {
            Ok(handle) => {
                info!(webhook_id = %handle.webhook_id, url = %request.url, "Webhook registered")
            }
            Err(e) => warn!(error = %e, url = %request.url, "Webhook registration failed"),
        }
    }
}
