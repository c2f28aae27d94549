//! In-memory channel that records what would have been sent.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{DeliveryError, EmailMessage, NotificationChannel};

/// A text message captured by [`RecordingDelivery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentText {
    pub to: String,
    pub body: String,
}

#[derive(Default)]
pub struct RecordingDelivery {
    emails: Mutex<Vec<EmailMessage>>,
    texts: Mutex<Vec<SentText>>,
    fail: bool,
}

impl RecordingDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel whose every send fails, for exercising error paths.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn emails(&self) -> Vec<EmailMessage> {
        self.emails.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn texts(&self) -> Vec<SentText> {
        self.texts.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn emails_to(&self, address: &str) -> Vec<EmailMessage> {
        self.emails()
            .into_iter()
            .filter(|m| m.to == address)
            .collect()
    }
}

#[async_trait]
impl NotificationChannel for RecordingDelivery {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send_email(&self, message: &EmailMessage) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(DeliveryError::Build("recording channel set to fail".into()));
        }
        if let Ok(mut emails) = self.emails.lock() {
            emails.push(message.clone());
        }
        Ok(())
    }

    async fn send_text(&self, to: &str, body: &str) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(DeliveryError::HttpStatus(500));
        }
        if let Ok(mut texts) = self.texts.lock() {
            texts.push(SentText {
                to: to.to_string(),
                body: body.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_emails_and_texts() {
        let channel = RecordingDelivery::new();
        channel
            .send_email(&EmailMessage {
                to: "a@example.com".into(),
                cc: vec![],
                subject: "Hi".into(),
                body: "Body".into(),
            })
            .await
            .unwrap();
        channel.send_text("+15555550100", "Hello").await.unwrap();

        assert_eq!(channel.emails_to("a@example.com").len(), 1);
        assert!(channel.emails_to("b@example.com").is_empty());
        assert_eq!(channel.texts()[0].body, "Hello");
    }

    #[tokio::test]
    async fn failing_channel_records_nothing() {
        let channel = RecordingDelivery::failing();
        assert!(channel.send_text("+15555550100", "Hello").await.is_err());
        assert!(channel.texts().is_empty());
    }
}
