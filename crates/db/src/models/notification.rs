//! Notification recipient and notification models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use schoolnet_core::types::{DbId, Timestamp};

/// A row from the `notification_recipients` table.
///
/// One per user. Holds channel eligibility (phone, opt-outs) and is the
/// anchor for de-duplicating sends.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationRecipient {
    pub id: DbId,
    pub user_id: DbId,
    pub phone_number: Option<String>,
    pub phone_number_confirmed: Option<Timestamp>,
    #[serde(skip_serializing)]
    pub phone_number_verification_code: String,
    pub confirmation_last_sent: Option<Timestamp>,
    pub receive_emails: bool,
    pub receive_texts: bool,
    pub unsubscribed_email_notifications: Vec<String>,
    pub unsubscribed_text_notifications: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl NotificationRecipient {
    pub fn can_text(&self) -> bool {
        self.receive_texts
            && self.phone_number_confirmed.is_some()
            && self.phone_number.as_deref().is_some_and(|p| !p.is_empty())
    }

    pub fn unsubscribed_from_email(&self, notification_type: &str) -> bool {
        self.unsubscribed_email_notifications
            .iter()
            .any(|t| t == notification_type)
    }

    pub fn unsubscribed_from_text(&self, notification_type: &str) -> bool {
        self.unsubscribed_text_notifications
            .iter()
            .any(|t| t == notification_type)
    }
}

/// DTO for the channel kill switches and opt-out lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRecipient {
    pub receive_emails: Option<bool>,
    pub receive_texts: Option<bool>,
    pub unsubscribed_email_notifications: Option<Vec<String>>,
    pub unsubscribed_text_notifications: Option<Vec<String>>,
}

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub recipient_id: Option<DbId>,
    pub notification_type: String,
    pub actor_id: Option<DbId>,
    pub is_cc: bool,
    pub cc_email: Option<String>,
    pub title: String,
    pub description: String,
    pub activity_log_title: String,
    pub activity_log_description: String,
    pub emailed: Option<Timestamp>,
    pub texted: Option<Timestamp>,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub related_object_type: Option<String>,
    pub related_object_id: Option<DbId>,
    pub secondary_related_object_type: Option<String>,
    pub secondary_related_object_id: Option<DbId>,
    pub additional_args: serde_json::Value,
    pub created_at: Timestamp,
}

/// Insert DTO for a notification whose title has already been rendered.
#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub recipient_id: Option<DbId>,
    pub notification_type: String,
    pub actor_id: Option<DbId>,
    pub is_cc: bool,
    pub cc_email: Option<String>,
    pub title: String,
    pub description: String,
    pub activity_log_title: String,
    pub activity_log_description: String,
    pub related_object_type: Option<String>,
    pub related_object_id: Option<DbId>,
    pub secondary_related_object_type: Option<String>,
    pub secondary_related_object_id: Option<DbId>,
    pub additional_args: serde_json::Value,
}
