//! Email messages and senders

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use camp_core::config::EmailConfig;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Send failed: {0}")]
    SendFailed(String),
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
}

pub type EmailResult<T> = Result<T, EmailError>;

/// Email address with optional display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    pub email: String,
    pub name: Option<String>,
}

impl EmailAddress {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// RFC 5322 mailbox
    pub fn to_rfc5322(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", name, self.email),
            None => self.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub id: String,
    pub from: EmailAddress,
    pub to: EmailAddress,
    pub subject: String,
    pub text_body: String,
    /// Free-form labels, e.g. `checkout`, `tenant:3`
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl EmailMessage {
    pub fn new(
        from: EmailAddress,
        to: EmailAddress,
        subject: impl Into<String>,
        text_body: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            from,
            to,
            subject: subject.into(),
            text_body: text_body.into(),
            tags: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send a message, returning its id
    async fn send(&self, message: &EmailMessage) -> EmailResult<String>;
}

/// Writes messages to the log instead of delivering them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> EmailResult<String> {
        if !message.to.email.contains('@') {
            return Err(EmailError::InvalidRecipient(message.to.email.clone()));
        }
        tracing::info!(
            message_id = %message.id,
            to = %message.to.to_rfc5322(),
            subject = %message.subject,
            tags = ?message.tags,
            "Email delivered to log"
        );
        tracing::debug!(body = %message.text_body, "Email body");
        Ok(message.id.clone())
    }
}

/// Keeps sent messages in memory
#[derive(Debug, Default)]
pub struct MemoryEmailSender {
    sent: Mutex<Vec<EmailMessage>>,
}

impl MemoryEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, email: &str) -> Vec<EmailMessage> {
        self.sent
            .lock()
            .iter()
            .filter(|m| m.to.email.eq_ignore_ascii_case(email))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl EmailSender for MemoryEmailSender {
    async fn send(&self, message: &EmailMessage) -> EmailResult<String> {
        self.sent.lock().push(message.clone());
        Ok(message.id.clone())
    }
}

/// Sender named by `email.delivery_method`; anything but `memory` logs
pub fn sender_from_config(config: &EmailConfig) -> Arc<dyn EmailSender> {
    match config.delivery_method.as_str() {
        "memory" => Arc::new(MemoryEmailSender::new()),
        "log" => Arc::new(LogEmailSender),
        other => {
            tracing::warn!(delivery_method = other, "Unknown email delivery method, using log");
            Arc::new(LogEmailSender)
        }
    }
}

/// Send and report; `false` when delivery failed
pub async fn deliver(sender: &dyn EmailSender, message: EmailMessage) -> bool {
    match sender.send(&message).await {
        Ok(id) => {
            tracing::debug!(message_id = %id, subject = %message.subject, "Email sent");
            true
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                to = %message.to.email,
                subject = %message.subject,
                "Email delivery failed"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(to: &str) -> EmailMessage {
        EmailMessage::new(
            EmailAddress::new("camps@example.com").with_name("CampHQ"),
            EmailAddress::new(to),
            "Hello",
            "Body",
        )
        .tag("test")
    }

    #[test]
    fn test_rfc5322() {
        let address = EmailAddress::new("pat@example.com").with_name("Pat Parent");
        assert_eq!(address.to_rfc5322(), "Pat Parent <pat@example.com>");
        assert_eq!(EmailAddress::new("a@b.c").to_rfc5322(), "a@b.c");
    }

    #[tokio::test]
    async fn test_memory_sender_captures() {
        let sender = MemoryEmailSender::new();
        assert!(deliver(&sender, message("pat@example.com")).await);
        assert!(deliver(&sender, message("sam@example.com")).await);

        assert_eq!(sender.sent().len(), 2);
        assert_eq!(sender.sent_to("PAT@example.com").len(), 1);
        assert!(sender.sent()[0].has_tag("test"));
        sender.clear();
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_log_sender_rejects_bad_recipient() {
        assert!(deliver(&LogEmailSender, message("pat@example.com")).await);
        assert!(!deliver(&LogEmailSender, message("not-an-address")).await);
    }
}
