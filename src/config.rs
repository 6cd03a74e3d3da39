//! Configuration types.
//!
//! Everything comes from the environment (optionally seeded from a `.env`
//! file). `from_lookup` takes an arbitrary key lookup so tests can build a
//! config without touching the process environment.

use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Prompt used when neither `SYSTEM_PROMPT` nor a prompt file is available.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an email assistant answering mail sent to \
{inbox}. Reply helpfully and concisely in HTML. Use the mailbox tools to read the full \
thread or attachments when you need more context.";

pub const DEFAULT_AGENTMAIL_BASE_URL: &str = "https://api.agentmail.to/v0";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_INBOX_DOMAIN: &str = "agentmail.to";
pub const DEFAULT_PROMPT_FILE: &str = "system_prompt.txt";

/// Which inbox to provision and how to reach the Mailbox Service.
#[derive(Debug, Clone)]
pub struct MailboxConfig {
    pub username: String,
    pub display_name: Option<String>,
    pub domain: String,
    pub api_key: SecretString,
    pub base_url: String,
    pub client_id: String,
}

impl MailboxConfig {
    /// Address of the managed inbox, e.g. `hiring@agentmail.to`.
    pub fn inbox_address(&self) -> String {
        format!("{}@{}", self.username, self.domain)
    }
}

/// Webhook server settings.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Public URL to register with the provider. No registration when unset.
    pub url: Option<String>,
    pub client_id: String,
    pub port: u16,
    /// Number of workers draining the event queue.
    pub worker_count: usize,
    /// Events buffered before new deliveries are dropped.
    pub queue_capacity: usize,
}

/// Reasoning agent settings.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub name: String,
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub max_turns: usize,
    /// Raw system prompt; may contain `{inbox}` placeholders.
    pub system_prompt: String,
}

impl AgentConfig {
    /// System prompt with every `{inbox}` placeholder substituted.
    pub fn instructions(&self, inbox_address: &str) -> String {
        self.system_prompt.trim().replace("{inbox}", inbox_address)
    }
}

/// Full service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub mailbox: MailboxConfig,
    pub webhook: WebhookConfig,
    pub agent: AgentConfig,
    /// Extra phrases that mark the one-time block as already sent.
    pub guardrail_sentinels: Vec<String>,
}

impl ServiceConfig {
    /// Build config from environment variables, loading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require =
            |key: &str| get(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()));

        let username = require("INBOX_USERNAME")?;
        let mailbox = MailboxConfig {
            display_name: get("DISPLAY_NAME"),
            domain: get("INBOX_DOMAIN").unwrap_or_else(|| DEFAULT_INBOX_DOMAIN.to_string()),
            api_key: SecretString::from(require("AGENTMAIL_API_KEY")?),
            base_url: get("AGENTMAIL_BASE_URL")
                .unwrap_or_else(|| DEFAULT_AGENTMAIL_BASE_URL.to_string()),
            client_id: get("INBOX_CLIENT_ID").unwrap_or_else(|| format!("{username}-agent-1")),
            username,
        };

        let webhook = WebhookConfig {
            url: get("WEBHOOK_URL"),
            client_id: get("WEBHOOK_CLIENT_ID")
                .unwrap_or_else(|| format!("{}-agent-webhook", mailbox.username)),
            port: parse_or("PORT", get("PORT"), 8080)?,
            worker_count: parse_or("WORKER_COUNT", get("WORKER_COUNT"), 4usize)?.max(1),
            queue_capacity: parse_or("QUEUE_CAPACITY", get("QUEUE_CAPACITY"), 64usize)?.max(1),
        };

        let system_prompt = match get("SYSTEM_PROMPT") {
            Some(prompt) => prompt,
            None => load_prompt_file(get("SYSTEM_PROMPT_FILE"))?,
        };

        let agent = AgentConfig {
            name: get("AGENT_NAME").unwrap_or_else(|| "Inbox Agent".to_string()),
            api_key: SecretString::from(require("OPENAI_API_KEY")?),
            base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            model: get("AGENT_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
            max_turns: parse_or("AGENT_MAX_TURNS", get("AGENT_MAX_TURNS"), 10usize)?.max(1),
            system_prompt,
        };

        let guardrail_sentinels = get("GUARDRAIL_SENTINELS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            mailbox,
            webhook,
            agent,
            guardrail_sentinels,
        })
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?}: {e}"),
        }),
    }
}

/// Read the prompt file. An explicitly configured file must exist; the
/// default file is optional and falls back to the built-in prompt.
fn load_prompt_file(explicit: Option<String>) -> Result<String, ConfigError> {
    let (path, required) = match explicit {
        Some(path) => (PathBuf::from(path), true),
        None => (PathBuf::from(DEFAULT_PROMPT_FILE), false),
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) if !contents.trim().is_empty() => Ok(contents),
        Ok(_) if !required => Ok(DEFAULT_SYSTEM_PROMPT.to_string()),
        Ok(_) => Err(ConfigError::InvalidValue {
            key: "SYSTEM_PROMPT_FILE".to_string(),
            message: format!("{} is empty", path.display()),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
            tracing::warn!("No system prompt configured, using built-in default");
            Ok(DEFAULT_SYSTEM_PROMPT.to_string())
        }
        Err(source) => Err(ConfigError::Read {
            path: path.display().to_string(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("INBOX_USERNAME", "hiring"),
        ("AGENTMAIL_API_KEY", "am-key"),
        ("OPENAI_API_KEY", "sk-test"),
        ("SYSTEM_PROMPT", "You answer for {inbox}. Sign as {inbox}."),
    ];

    #[test]
    fn defaults_applied() {
        let config = ServiceConfig::from_lookup(lookup(BASE)).unwrap();
        assert_eq!(config.mailbox.inbox_address(), "hiring@agentmail.to");
        assert_eq!(config.mailbox.base_url, DEFAULT_AGENTMAIL_BASE_URL);
        assert_eq!(config.mailbox.client_id, "hiring-agent-1");
        assert_eq!(config.mailbox.api_key.expose_secret(), "am-key");
        assert_eq!(config.webhook.port, 8080);
        assert_eq!(config.webhook.worker_count, 4);
        assert!(config.webhook.url.is_none());
        assert_eq!(config.agent.model, "gpt-4o");
        assert_eq!(config.agent.max_turns, 10);
        assert!(config.guardrail_sentinels.is_empty());
    }

    #[test]
    fn missing_username_is_reported() {
        let err = ServiceConfig::from_lookup(lookup(&[("AGENTMAIL_API_KEY", "k")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "INBOX_USERNAME"));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let pairs: Vec<(&str, &str)> = BASE
            .iter()
            .map(|&(k, v)| if k == "OPENAI_API_KEY" { (k, "   ") } else { (k, v) })
            .collect();
        let err = ServiceConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "OPENAI_API_KEY"));
    }

    #[test]
    fn invalid_port_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("PORT", "eighty"));
        let err = ServiceConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "PORT"));
    }

    #[test]
    fn worker_count_floor_is_one() {
        let mut pairs = BASE.to_vec();
        pairs.push(("WORKER_COUNT", "0"));
        let config = ServiceConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.webhook.worker_count, 1);
    }

    #[test]
    fn sentinels_split_on_commas() {
        let mut pairs = BASE.to_vec();
        pairs.push(("GUARDRAIL_SENTINELS", "Role details follow, ,<b>Role:</b>"));
        let config = ServiceConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(
            config.guardrail_sentinels,
            vec!["Role details follow".to_string(), "<b>Role:</b>".to_string()]
        );
    }

    #[test]
    fn instructions_substitute_every_placeholder() {
        let config = ServiceConfig::from_lookup(lookup(BASE)).unwrap();
        let text = config.agent.instructions("hiring@agentmail.to");
        assert_eq!(
            text,
            "You answer for hiring@agentmail.to. Sign as hiring@agentmail.to."
        );
    }

    #[test]
    fn prompt_loaded_from_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "File prompt for {{inbox}}").unwrap();
        let path = file.path().display().to_string();

        let pairs: Vec<(&str, &str)> = BASE
            .iter()
            .copied()
            .filter(|(k, _)| *k != "SYSTEM_PROMPT")
            .chain([("SYSTEM_PROMPT_FILE", path.as_str())])
            .collect();
        let config = ServiceConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.agent.instructions("a@b.c"), "File prompt for a@b.c");
    }

    #[test]
    fn missing_explicit_prompt_file_is_an_error() {
        let pairs: Vec<(&str, &str)> = BASE
            .iter()
            .copied()
            .filter(|(k, _)| *k != "SYSTEM_PROMPT")
            .chain([("SYSTEM_PROMPT_FILE", "/nonexistent/prompt.txt")])
            .collect();
        let err = ServiceConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
