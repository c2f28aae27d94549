//! External delivery channels for notifications.
//!
//! A [`NotificationChannel`] sends either email or SMS (or both, for the
//! test recorder). [`Deliveries`] bundles the channels the
//! [`Notifier`](crate::Notifier) was configured with; a missing channel
//! means that kind of delivery is skipped.

pub mod email;
pub mod recording;
pub mod sms;

use std::sync::Arc;

use async_trait::async_trait;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("SMTP transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Email build error: {0}")]
    Build(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("SMS gateway returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Channel does not support {0}")]
    Unsupported(&'static str),
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// A plain-text email ready to hand to a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub cc: Vec<String>,
    pub subject: String,
    pub body: String,
}

// ---------------------------------------------------------------------------
// Channel trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    async fn send_email(&self, _message: &EmailMessage) -> Result<(), DeliveryError> {
        Err(DeliveryError::Unsupported("email"))
    }

    /// `to` is an E.164 phone number.
    async fn send_text(&self, _to: &str, _body: &str) -> Result<(), DeliveryError> {
        Err(DeliveryError::Unsupported("text"))
    }
}

/// The channels available to the notifier.
#[derive(Clone, Default)]
pub struct Deliveries {
    pub email: Option<Arc<dyn NotificationChannel>>,
    pub text: Option<Arc<dyn NotificationChannel>>,
}

impl Deliveries {
    /// Build from `SMTP_*` and `TWILIO_*` environment variables.
    pub fn from_env() -> Self {
        let email = email::EmailConfig::from_env()
            .map(|cfg| Arc::new(email::SmtpEmail::new(cfg)) as Arc<dyn NotificationChannel>);
        let text = sms::SmsConfig::from_env()
            .map(|cfg| Arc::new(sms::TwilioSms::new(cfg)) as Arc<dyn NotificationChannel>);

        if email.is_none() {
            tracing::warn!("SMTP_HOST not set, notification emails are disabled");
        }
        if text.is_none() {
            tracing::warn!("Twilio credentials not set, notification texts are disabled");
        }
        Self { email, text }
    }

    /// Route both kinds of delivery through one channel.
    pub fn single(channel: Arc<dyn NotificationChannel>) -> Self {
        Self {
            email: Some(channel.clone()),
            text: Some(channel),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    struct EmailOnly;

    #[async_trait]
    impl NotificationChannel for EmailOnly {
        fn name(&self) -> &'static str {
            "email-only"
        }

        async fn send_email(&self, _message: &EmailMessage) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn unimplemented_kind_is_unsupported() {
        let channel = EmailOnly;
        assert_matches!(
            channel.send_text("+15555550100", "hi").await,
            Err(DeliveryError::Unsupported("text"))
        );
    }

    #[test]
    fn single_routes_both_kinds() {
        let deliveries = Deliveries::single(Arc::new(EmailOnly));
        assert_eq!(deliveries.email.as_ref().map(|c| c.name()), Some("email-only"));
        assert_eq!(deliveries.text.as_ref().map(|c| c.name()), Some("email-only"));
        assert!(Deliveries::default().email.is_none());
    }

    #[test]
    fn error_display() {
        assert_eq!(
            DeliveryError::HttpStatus(401).to_string(),
            "SMS gateway returned HTTP 401"
        );
        assert_eq!(
            DeliveryError::Unsupported("email").to_string(),
            "Channel does not support email"
        );
    }
}
