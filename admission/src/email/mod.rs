//! Outgoing email collaborators.
//!
//! Sending is fire-and-forget from the caller's perspective: a failed send is
//! logged and never rolls back the action that triggered it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

/// A message ready to send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub address: String,
    pub subject: String,
    /// HTML body
    pub body: String,
}

/// Email delivery errors
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email delivery failed: {0}")]
    Delivery(String),
}

/// Trait for email delivery
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, email: Email) -> Result<(), EmailError>;
}

/// Writes every message to the log instead of delivering it
#[derive(Debug, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send_email(&self, email: Email) -> Result<(), EmailError> {
        log::info!(
            "Outgoing email to {} [{}]: {}",
            email.address,
            email.subject,
            email.body
        );
        Ok(())
    }
}

/// Keeps sent messages in memory
#[derive(Debug, Default)]
pub struct MemoryEmailSender {
    outbox: Mutex<Vec<Email>>,
}

impl MemoryEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages sent so far, oldest first
    pub async fn sent(&self) -> Vec<Email> {
        self.outbox.lock().await.clone()
    }

    /// Most recent message sent to `address`
    pub async fn last_to(&self, address: &str) -> Option<Email> {
        self.outbox
            .lock()
            .await
            .iter()
            .rev()
            .find(|email| email.address == address)
            .cloned()
    }
}

#[async_trait]
impl EmailSender for MemoryEmailSender {
    async fn send_email(&self, email: Email) -> Result<(), EmailError> {
        self.outbox.lock().await.push(email);
        Ok(())
    }
}

/// Extract the `href` target of the first link in an email body
pub fn first_link(body: &str) -> Option<&str> {
    let start = body.find("href=\"")? + "href=\"".len();
    let rest = &body[start..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_sender_keeps_order() {
        let sender = MemoryEmailSender::new();
        for subject in ["first", "second"] {
            sender
                .send_email(Email {
                    address: "alice@example.com".to_string(),
                    subject: subject.to_string(),
                    body: String::new(),
                })
                .await
                .unwrap();
        }

        let sent = sender.sent().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sender.last_to("alice@example.com").await.unwrap().subject,
            "second"
        );
        assert!(sender.last_to("bob@example.com").await.is_none());
    }

    #[test]
    fn test_first_link() {
        let body = "Confirm using this <a href=\"https://x.test/c?code=1\">link</a>";
        assert_eq!(first_link(body), Some("https://x.test/c?code=1"));
        assert_eq!(first_link("no link"), None);
    }
}
