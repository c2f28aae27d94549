//! Recipient settings, phone verification and account invitations.

use chrono::Utc;
use schoolnet_core::notification_types::{self as types, validate_unsubscribe, Audience, Channel};
use schoolnet_core::roles::{ROLE_ADMIN, ROLE_COUNSELOR, ROLE_PARENT, ROLE_STUDENT, ROLE_TUTOR};
use schoolnet_core::types::DbId;
use schoolnet_core::verification::{
    code_matches, e164, generate_verification_code, normalize_phone_number, verification_text,
};
use schoolnet_db::models::notification::{NotificationRecipient, UpdateRecipient};
use schoolnet_db::models::user::User;
use schoolnet_db::repositories::{NotificationRecipientRepo, StudentRepo, UserRepo};
use schoolnet_db::DbPool;
use schoolnet_events::{NewNotification, Notifier};
use serde_json::json;

use crate::error::{ManagerError, ManagerResult};

/// Channel switches and opt-out lists a user submits.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct SubscriptionUpdate {
    pub receive_emails: Option<bool>,
    pub receive_texts: Option<bool>,
    pub unsubscribed_email_notifications: Option<Vec<String>>,
    pub unsubscribed_text_notifications: Option<Vec<String>>,
}

pub struct NotificationManager {
    pool: DbPool,
    notifier: Notifier,
}

impl NotificationManager {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            pool: notifier.pool().clone(),
            notifier,
        }
    }

    async fn user(&self, user_id: DbId) -> ManagerResult<User> {
        UserRepo::find_by_id(&self.pool, user_id)
            .await?
            .ok_or_else(|| ManagerError::not_found("User", user_id))
    }

    pub async fn recipient(&self, user_id: DbId) -> ManagerResult<NotificationRecipient> {
        self.user(user_id).await?;
        Ok(NotificationRecipientRepo::get_or_create(&self.pool, user_id).await?)
    }

    async fn audience(&self, user: &User) -> ManagerResult<Audience> {
        Ok(match user.role.as_str() {
            ROLE_STUDENT => {
                let is_cap = StudentRepo::find_by_user_id(&self.pool, user.id)
                    .await?
                    .is_some_and(|s| s.is_cap);
                if is_cap {
                    Audience::CapStudent
                } else {
                    Audience::CasStudent
                }
            }
            ROLE_PARENT => Audience::Parent,
            ROLE_TUTOR => Audience::Tutor,
            ROLE_COUNSELOR => Audience::Counselor,
            ROLE_ADMIN => Audience::Administrator,
            other => {
                return Err(ManagerError::validation(format!("Unknown role '{other}'")));
            }
        })
    }

    /// Store a new phone number, or clear it with `None`. Either way the
    /// number has to be confirmed again.
    pub async fn set_phone_number(
        &self,
        user_id: DbId,
        raw: Option<&str>,
    ) -> ManagerResult<NotificationRecipient> {
        let recipient = self.recipient(user_id).await?;
        let normalized = match raw.map(str::trim).filter(|r| !r.is_empty()) {
            Some(raw) => Some(normalize_phone_number(raw)?),
            None => None,
        };
        NotificationRecipientRepo::set_phone_number(&self.pool, recipient.id, normalized.as_deref())
            .await?
            .ok_or_else(|| ManagerError::not_found("NotificationRecipient", recipient.id))
    }

    /// Text a fresh verification code to the recipient's phone number.
    pub async fn send_verification(&self, user_id: DbId) -> ManagerResult<NotificationRecipient> {
        let recipient = self.recipient(user_id).await?;
        let phone = recipient
            .phone_number
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ManagerError::validation("No phone number to verify"))?;
        let channel = self
            .notifier
            .deliveries()
            .text
            .clone()
            .ok_or_else(|| ManagerError::validation("Text messaging is not configured"))?;

        let code = generate_verification_code();
        NotificationRecipientRepo::set_verification_code(&self.pool, recipient.id, &code).await?;
        channel.send_text(&e164(phone), &verification_text(&code)).await?;
        tracing::info!(user_id, recipient_id = recipient.id, "Phone verification code sent");

        NotificationRecipientRepo::find_by_id(&self.pool, recipient.id)
            .await?
            .ok_or_else(|| ManagerError::not_found("NotificationRecipient", recipient.id))
    }

    pub async fn confirm_phone(
        &self,
        user_id: DbId,
        code: &str,
    ) -> ManagerResult<NotificationRecipient> {
        let recipient = self.recipient(user_id).await?;
        if !code_matches(&recipient.phone_number_verification_code, code) {
            return Err(ManagerError::validation("Invalid verification code"));
        }
        if !NotificationRecipientRepo::confirm_phone(&self.pool, recipient.id).await? {
            return Err(ManagerError::validation("No phone number to confirm"));
        }
        NotificationRecipientRepo::find_by_id(&self.pool, recipient.id)
            .await?
            .ok_or_else(|| ManagerError::not_found("NotificationRecipient", recipient.id))
    }

    /// Replace the recipient's channel switches and opt-out lists. Every
    /// opt-out must be one the user's audience is allowed on that channel.
    pub async fn update_subscriptions(
        &self,
        user_id: DbId,
        update: SubscriptionUpdate,
    ) -> ManagerResult<NotificationRecipient> {
        let user = self.user(user_id).await?;
        let audience = self.audience(&user).await?;

        let checks = [
            (Channel::Email, &update.unsubscribed_email_notifications),
            (Channel::Text, &update.unsubscribed_text_notifications),
        ];
        for (channel, list) in checks {
            for notification_type in list.iter().flatten() {
                validate_unsubscribe(audience, notification_type, channel)
                    .map_err(ManagerError::validation)?;
            }
        }

        let recipient = NotificationRecipientRepo::get_or_create(&self.pool, user_id).await?;
        NotificationRecipientRepo::update(
            &self.pool,
            recipient.id,
            &UpdateRecipient {
                receive_emails: update.receive_emails,
                receive_texts: update.receive_texts,
                unsubscribed_email_notifications: update.unsubscribed_email_notifications.map(dedup),
                unsubscribed_text_notifications: update.unsubscribed_text_notifications.map(dedup),
            },
        )
        .await?
        .ok_or_else(|| ManagerError::not_found("NotificationRecipient", recipient.id))
    }

    /// Invite a user who has not set a password yet.
    pub async fn send_invite(&self, user_id: DbId, actor_user_id: Option<DbId>) -> ManagerResult<()> {
        let user = self.user(user_id).await?;
        if !user.is_pending() {
            return Err(ManagerError::conflict("User has already accepted their invite"));
        }
        self.notifier
            .create(
                NewNotification::new(types::INVITE)
                    .to_user(user.id)
                    .actor(actor_user_id)
                    .related("user", user.id)
                    .args(json!({ "first_name": user.first_name })),
            )
            .await?;
        UserRepo::set_last_invited(&self.pool, user.id, Utc::now()).await?;
        tracing::info!(user_id, "Invite sent");
        Ok(())
    }

    /// Set the user's password and let the administrators know.
    pub async fn accept_invite(&self, user_id: DbId, password_hash: &str) -> ManagerResult<User> {
        let user = UserRepo::accept_invite(&self.pool, user_id, password_hash)
            .await?
            .ok_or_else(|| ManagerError::conflict("Invite already accepted or user not found"))?;

        let name = user.full_name();
        for admin in UserRepo::list_admins(&self.pool).await? {
            self.notifier
                .create(
                    NewNotification::new(types::USER_ACCEPTED_INVITE)
                        .to_user(admin.id)
                        .actor(Some(user.id))
                        .related("user", user.id)
                        .args(json!({ "name": name })),
                )
                .await?;
        }
        tracing::info!(user_id, "Invite accepted");
        Ok(user)
    }
}

fn dedup(mut types: Vec<String>) -> Vec<String> {
    types.sort();
    types.dedup();
    types
}
