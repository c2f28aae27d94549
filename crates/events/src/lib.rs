//! SchoolNet event bus and notification delivery.
//!
//! - [`EventBus`] is the in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`] is the event envelope published on it.
//! - [`Notifier`] is the single place notifications are created. It
//!   renders titles, persists the row and fans out to email and SMS.
//! - [`templates`] renders titles, activity-log lines, SMS bodies and
//!   plain-text email bodies.
//! - [`delivery`] holds the external channels (SMTP email, Twilio SMS) and
//!   an in-memory recorder for tests.

pub mod bus;
pub mod delivery;
pub mod notifier;
pub mod templates;

pub use bus::{EventBus, PlatformEvent};
pub use delivery::email::{EmailConfig, SmtpEmail};
pub use delivery::recording::RecordingDelivery;
pub use delivery::sms::{SmsConfig, TwilioSms};
pub use delivery::{Deliveries, DeliveryError, EmailMessage, NotificationChannel};
pub use notifier::{NewNotification, Notifier, NotifierConfig, NotifyError};
