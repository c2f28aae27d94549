//! Notification texts via the Twilio Messages API.

use std::time::Duration;

use async_trait::async_trait;

use super::{DeliveryError, NotificationChannel};

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// E.164 sender number.
    pub from_number: String,
    pub api_base: String,
}

impl SmsConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` unless all three Twilio variables are set.
    ///
    /// | Variable             | Required |
    /// |----------------------|----------|
    /// | `TWILIO_ACCOUNT_SID` | yes      |
    /// | `TWILIO_AUTH_TOKEN`  | yes      |
    /// | `TWILIO_FROM_NUMBER` | yes      |
    pub fn from_env() -> Option<Self> {
        Some(Self {
            account_sid: std::env::var("TWILIO_ACCOUNT_SID").ok()?,
            auth_token: std::env::var("TWILIO_AUTH_TOKEN").ok()?,
            from_number: std::env::var("TWILIO_FROM_NUMBER").ok()?,
            api_base: TWILIO_API_BASE.to_string(),
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.api_base.trim_end_matches('/'),
            self.account_sid
        )
    }
}

pub struct TwilioSms {
    client: reqwest::Client,
    config: SmsConfig,
}

impl TwilioSms {
    pub fn new(config: SmsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client, config }
    }
}

#[async_trait]
impl NotificationChannel for TwilioSms {
    fn name(&self) -> &'static str {
        "twilio"
    }

    async fn send_text(&self, to: &str, body: &str) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(self.config.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", to),
                ("From", self.config.from_number.as_str()),
                ("Body", body),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DeliveryError::HttpStatus(response.status().as_u16()));
        }

        tracing::info!(to, "Notification text sent");
        Ok(())
    }
}
