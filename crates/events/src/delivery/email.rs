//! Notification email via SMTP.
//!
//! [`SmtpEmail`] wraps the `lettre` async SMTP transport. If `SMTP_HOST` is
//! not set, [`EmailConfig::from_env`] returns `None` and emails are skipped.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{DeliveryError, EmailMessage, NotificationChannel};

const DEFAULT_SMTP_PORT: u16 = 587;

const DEFAULT_FROM_ADDRESS: &str = "noreply@schoolnet.local";

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable        | Required | Default                    |
    /// |-----------------|----------|----------------------------|
    /// | `SMTP_HOST`     | yes      | none                       |
    /// | `SMTP_PORT`     | no       | `587`                      |
    /// | `SMTP_FROM`     | no       | `noreply@schoolnet.local`  |
    /// | `SMTP_USER`     | no       | none                       |
    /// | `SMTP_PASSWORD` | no       | none                       |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

pub struct SmtpEmail {
    config: EmailConfig,
}

impl SmtpEmail {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, message: &EmailMessage) -> Result<Message, DeliveryError> {
        let mut builder = Message::builder()
            .from(self.config.from_address.parse()?)
            .to(message.to.parse()?)
            .subject(message.subject.as_str())
            .header(ContentType::TEXT_PLAIN);
        for cc in &message.cc {
            builder = builder.cc(cc.parse()?);
        }
        builder
            .body(message.body.clone())
            .map_err(|e| DeliveryError::Build(e.to_string()))
    }
}

#[async_trait]
impl NotificationChannel for SmtpEmail {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn send_email(&self, message: &EmailMessage) -> Result<(), DeliveryError> {
        let email = self.build_message(message)?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
                .port(self.config.smtp_port);
        if let (Some(user), Some(pass)) = (&self.config.smtp_user, &self.config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        transport_builder.build().send(email).await?;

        tracing::info!(to = %message.to, cc = message.cc.len(), "Notification email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn mailer() -> SmtpEmail {
        SmtpEmail::new(EmailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            from_address: DEFAULT_FROM_ADDRESS.to_string(),
            smtp_user: None,
            smtp_password: None,
        })
    }

    fn message(to: &str, cc: &[&str]) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            cc: cc.iter().map(|s| s.to_string()).collect(),
            subject: "Task: Essay draft".to_string(),
            body: "Body".to_string(),
        }
    }

    #[test]
    fn from_env_returns_none_without_smtp_host() {
        std::env::remove_var("SMTP_HOST");
        assert!(EmailConfig::from_env().is_none());
    }

    #[test]
    fn builds_message_with_cc() {
        let built = mailer()
            .build_message(&message("student@example.com", &["parent@example.com"]))
            .unwrap();
        let raw = String::from_utf8(built.formatted()).unwrap();
        assert!(raw.contains("Cc: parent@example.com"));
        assert!(raw.contains("Subject: Task: Essay draft"));
    }

    #[test]
    fn bad_cc_address_is_rejected() {
        assert_matches!(
            mailer().build_message(&message("student@example.com", &["not-an-email"])),
            Err(DeliveryError::Address(_))
        );
    }
}
