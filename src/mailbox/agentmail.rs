//! AgentMail REST client.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use super::types::ThreadPage;
use super::{
    AttachmentContent, CreateInbox, Inbox, MailThread, MailboxService, RegisterWebhook,
    ThreadSummary, WebhookHandle,
};
use crate::error::MailboxError;

/// Upper bound on pages followed by `list_threads`.
const MAX_THREAD_PAGES: usize = 50;

/// HTTP client for the AgentMail API.
#[derive(Clone)]
pub struct AgentMailClient {
    http: Client,
    base_url: String,
    api_key: SecretString,
}

impl AgentMailClient {
    pub fn new(base_url: impl Into<String>, api_key: SecretString) -> Self {
        Self::with_client(Client::new(), base_url, api_key)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(self.api_key.expose_secret())
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, MailboxError> {
        let response = Self::check(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| MailboxError::InvalidResponse(format!("{e}: {}", truncate(&body, 200))))
    }

    async fn check(response: Response) -> Result<Response, MailboxError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(MailboxError::Api {
            status: status.as_u16(),
            body: truncate(&body, 500),
        })
    }
}

#[async_trait]
impl MailboxService for AgentMailClient {
    async fn create_inbox(&self, request: &CreateInbox) -> Result<Inbox, MailboxError> {
        let response = self
            .authed(self.http.post(self.url("/inboxes")))
            .json(request)
            .send()
            .await?;
        Self::json(response).await
    }

    async fn get_thread(
        &self,
        inbox_id: &str,
        thread_id: &str,
    ) -> Result<MailThread, MailboxError> {
        let response = self
            .authed(
                self.http
                    .get(self.url(&format!("/inboxes/{inbox_id}/threads/{thread_id}"))),
            )
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(MailboxError::ThreadNotFound {
                thread_id: thread_id.to_string(),
            });
        }
        Self::json(response).await
    }

    async fn list_threads(
        &self,
        inbox_id: &str,
        labels: &[String],
    ) -> Result<Vec<ThreadSummary>, MailboxError> {
        let mut threads = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_THREAD_PAGES {
            let mut query: Vec<(&str, String)> =
                labels.iter().map(|l| ("labels", l.clone())).collect();
            if let Some(ref token) = page_token {
                query.push(("page_token", token.clone()));
            }

            let response = self
                .authed(self.http.get(self.url(&format!("/inboxes/{inbox_id}/threads"))))
                .query(&query)
                .send()
                .await?;
            let page: ThreadPage = Self::json(response).await?;
            threads.extend(page.threads);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(threads),
            }
        }

        tracing::warn!(
            inbox_id,
            pages = MAX_THREAD_PAGES,
            "Stopped following thread pages"
        );
        Ok(threads)
    }

    async fn reply(
        &self,
        inbox_id: &str,
        message_id: &str,
        html: &str,
    ) -> Result<(), MailboxError> {
        let response = self
            .authed(self.http.post(
                self.url(&format!("/inboxes/{inbox_id}/messages/{message_id}/reply")),
            ))
            .json(&serde_json::json!({ "html": html }))
            .send()
            .await?;
        Self::check(response).await?;
        tracing::debug!(inbox_id, message_id, "Reply accepted by provider");
        Ok(())
    }

    async fn get_attachment(
        &self,
        inbox_id: &str,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<AttachmentContent, MailboxError> {
        let response = self
            .authed(self.http.get(self.url(&format!(
                "/inboxes/{inbox_id}/messages/{message_id}/attachments/{attachment_id}"
            ))))
            .send()
            .await?;
        let response = Self::check(response).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();
        Ok(AttachmentContent {
            content_type,
            bytes,
        })
    }

    async fn register_webhook(
        &self,
        request: &RegisterWebhook,
    ) -> Result<WebhookHandle, MailboxError> {
        let response = self
            .authed(self.http.post(self.url("/webhooks")))
            .json(request)
            .send()
            .await?;
        Self::json(response).await
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
