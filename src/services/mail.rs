//! Mail delivery
//!
//! Email is a best-effort side channel for notifications. `HttpMailSender`
//! posts messages to a JSON mail relay; `LogMailSender` stands in when mail
//! is disabled.

use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use crate::config::MailConfig;
use crate::utils::errors::{MailError, MailResult, UniHubError, Result};

/// A single email
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> MailResult<()>;
}

/// Relay request body
#[derive(Debug, Serialize)]
struct RelayRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Mail sender backed by an HTTP relay
#[derive(Debug, Clone)]
pub struct HttpMailSender {
    client: Client,
    config: MailConfig,
}

impl HttpMailSender {
    pub fn new(config: MailConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("UniHub-Notifier/1.0")
            .build()
            .map_err(UniHubError::Http)?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl MailSender for HttpMailSender {
    async fn send(&self, mail: &OutgoingMail) -> MailResult<()> {
        debug!(to = %mail.to, subject = %mail.subject, "Posting mail to relay");

        let body = RelayRequest {
            from: &self.config.from_address,
            to: &mail.to,
            subject: &mail.subject,
            text: &mail.text,
        };

        let response = self.client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MailError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected { status: status.as_u16(), body });
        }

        info!(to = %mail.to, "Mail accepted by relay");
        Ok(())
    }
}

/// Mail sender used when delivery is disabled
#[derive(Debug, Clone, Default)]
pub struct LogMailSender;

#[async_trait]
impl MailSender for LogMailSender {
    async fn send(&self, mail: &OutgoingMail) -> MailResult<()> {
        debug!(to = %mail.to, subject = %mail.subject, "Mail disabled, skipping delivery");
        Ok(())
    }
}
