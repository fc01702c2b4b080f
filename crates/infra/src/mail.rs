//! Outbound email delivery.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Which template produced a message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    NewEscalation,
    TeamMemberAssignment,
    StatusUpdate,
}

/// Wire shape accepted by the notification endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport failed: {0}")]
    Transport(String),

    #[error("mail endpoint rejected message with status {0}")]
    Rejected(u16),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &OutboundEmail) -> Result<(), MailError>;
}

/// Logs messages instead of delivering them (no endpoint configured).
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &OutboundEmail) -> Result<(), MailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            kind = ?message.kind,
            "notification skipped: no mail endpoint configured"
        );
        Ok(())
    }
}

/// POSTs each message as JSON to a notification endpoint.
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpMailer {
    /// Every request is abandoned after `timeout`, so a hung endpoint only
    /// costs one failed recipient.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &OutboundEmail) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(message)
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MailError::Rejected(status.as_u16()));
        }
        tracing::debug!(to = %message.to, kind = ?message.kind, "notification delivered");
        Ok(())
    }
}

/// Records sends in memory; recipients listed in `failing` are rejected.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutboundEmail>>,
    failing: Mutex<Vec<String>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, recipient: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.push(recipient.to_lowercase());
        }
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn sent_to(&self, recipient: &str) -> Vec<OutboundEmail> {
        self.sent()
            .into_iter()
            .filter(|m| m.to.eq_ignore_ascii_case(recipient))
            .collect()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: &OutboundEmail) -> Result<(), MailError> {
        let rejected = self
            .failing
            .lock()
            .map(|f| f.contains(&message.to.to_lowercase()))
            .unwrap_or(false);
        if rejected {
            return Err(MailError::Rejected(502));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }
        Ok(())
    }
}
