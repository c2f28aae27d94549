//! Notification creation and fan-out.
//!
//! [`Notifier::create`] is the only path that writes to the `notifications`
//! table. It renders the title, persists the row, publishes
//! `notification.created` on the bus, then emails and texts the recipient
//! according to the type's configuration and the recipient's opt-outs.
//! Delivery failures are logged; they never fail creation.

use std::sync::Arc;

use schoolnet_core::notification_types::{
    allowed_for_pending_user, is_system_notification, notification_config,
};
use schoolnet_core::roles::{ROLE_PARENT, ROLE_STUDENT};
use schoolnet_core::types::DbId;
use schoolnet_core::verification::{e164, text_fits};
use schoolnet_db::models::notification::{CreateNotification, Notification, NotificationRecipient};
use schoolnet_db::models::user::User;
use schoolnet_db::repositories::{
    NotificationRecipientRepo, NotificationRepo, ParentRepo, StudentRepo, UserRepo,
};
use schoolnet_db::DbPool;

use crate::bus::{EventBus, PlatformEvent, NOTIFICATION_CREATED};
use crate::delivery::{Deliveries, EmailMessage};
use crate::templates;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification type '{0}' requires a recipient")]
    RecipientRequired(String),

    #[error("No title renderer for notification type '{0}'")]
    NoTitle(String),

    #[error("Recipient user {0} does not exist")]
    UnknownUser(DbId),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

const DEFAULT_SITE_NAME: &str = "SchoolNet";
const DEFAULT_SITE_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub site_name: String,
    pub site_url: String,
}

impl NotifierConfig {
    /// | Variable    | Default                 |
    /// |-------------|-------------------------|
    /// | `SITE_NAME` | `SchoolNet`             |
    /// | `SITE_URL`  | `http://localhost:3000` |
    pub fn from_env() -> Self {
        Self {
            site_name: std::env::var("SITE_NAME").unwrap_or_else(|_| DEFAULT_SITE_NAME.into()),
            site_url: std::env::var("SITE_URL").unwrap_or_else(|_| DEFAULT_SITE_URL.into()),
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            site_name: DEFAULT_SITE_NAME.into(),
            site_url: DEFAULT_SITE_URL.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// NewNotification
// ---------------------------------------------------------------------------

/// A notification to create. Built with [`NewNotification::new`] and the
/// chained setters.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub notification_type: String,
    pub recipient_user_id: Option<DbId>,
    pub actor_id: Option<DbId>,
    pub related: Option<(String, DbId)>,
    pub secondary_related: Option<(String, DbId)>,
    pub additional_args: serde_json::Value,
    pub description: String,
    pub cc_email: Option<String>,
    pub is_cc: bool,
}

impl NewNotification {
    pub fn new(notification_type: impl Into<String>) -> Self {
        Self {
            notification_type: notification_type.into(),
            recipient_user_id: None,
            actor_id: None,
            related: None,
            secondary_related: None,
            additional_args: serde_json::Value::Object(Default::default()),
            description: String::new(),
            cc_email: None,
            is_cc: false,
        }
    }

    pub fn to_user(mut self, user_id: DbId) -> Self {
        self.recipient_user_id = Some(user_id);
        self
    }

    pub fn actor(mut self, user_id: Option<DbId>) -> Self {
        self.actor_id = user_id;
        self
    }

    pub fn related(mut self, object_type: impl Into<String>, id: DbId) -> Self {
        self.related = Some((object_type.into(), id));
        self
    }

    pub fn secondary_related(mut self, object_type: impl Into<String>, id: DbId) -> Self {
        self.secondary_related = Some((object_type.into(), id));
        self
    }

    pub fn args(mut self, args: serde_json::Value) -> Self {
        self.additional_args = args;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn cc_email(mut self, email: Option<String>) -> Self {
        self.cc_email = email.filter(|e| !e.is_empty());
        self
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Notifier {
    pool: DbPool,
    bus: Arc<EventBus>,
    deliveries: Deliveries,
    config: NotifierConfig,
}

/// What the single-recipient pass decided about a parent copy.
struct Created {
    notification: Notification,
    parent_copy_for: Option<DbId>,
}

impl Notifier {
    pub fn new(
        pool: DbPool,
        bus: Arc<EventBus>,
        deliveries: Deliveries,
        config: NotifierConfig,
    ) -> Self {
        Self {
            pool,
            bus,
            deliveries,
            config,
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn config(&self) -> &NotifierConfig {
        &self.config
    }

    pub fn deliveries(&self) -> &Deliveries {
        &self.deliveries
    }

    /// Create a notification and deliver it.
    ///
    /// When the email is not sent and the type copies parents, the
    /// student's parent gets their own copy (flagged `is_cc`). Returns the
    /// refreshed row, so `emailed`/`texted` reflect what was delivered.
    pub async fn create(&self, input: NewNotification) -> Result<Option<Notification>, NotifyError> {
        let created = self.create_single(&input).await?;

        if let Some(parent_user_id) = created.parent_copy_for {
            let mut copy = input.clone();
            copy.recipient_user_id = Some(parent_user_id);
            copy.is_cc = true;
            if let Err(e) = self.create_single(&copy).await {
                tracing::error!(
                    notification_id = created.notification.id,
                    parent_user_id,
                    error = %e,
                    "Failed to create parent copy of notification"
                );
            }
        }

        Ok(NotificationRepo::find_by_id(&self.pool, created.notification.id).await?)
    }

    /// Whether the user already has a notification of this type about an object.
    pub async fn exists(
        &self,
        recipient_user_id: DbId,
        notification_type: &str,
        related_object_type: &str,
        related_object_id: DbId,
    ) -> Result<bool, NotifyError> {
        let Some(recipient) =
            NotificationRecipientRepo::find_by_user_id(&self.pool, recipient_user_id).await?
        else {
            return Ok(false);
        };
        Ok(NotificationRepo::exists_for_related(
            &self.pool,
            recipient.id,
            notification_type,
            related_object_type,
            related_object_id,
        )
        .await?)
    }

    async fn create_single(&self, input: &NewNotification) -> Result<Created, NotifyError> {
        let notification_type = input.notification_type.as_str();

        let recipient = match input.recipient_user_id {
            Some(user_id) => {
                let user = UserRepo::find_by_id(&self.pool, user_id)
                    .await?
                    .ok_or(NotifyError::UnknownUser(user_id))?;
                let recipient = NotificationRecipientRepo::get_or_create(&self.pool, user_id).await?;
                Some((user, recipient))
            }
            None if is_system_notification(notification_type) => None,
            None => return Err(NotifyError::RecipientRequired(notification_type.to_string())),
        };

        let args = &input.additional_args;
        let title = templates::title(notification_type, args, &self.config.site_name)
            .ok_or_else(|| NotifyError::NoTitle(notification_type.to_string()))?;

        let (related_object_type, related_object_id) = input.related.clone().unzip();
        let (secondary_related_object_type, secondary_related_object_id) =
            input.secondary_related.clone().unzip();

        let notification = NotificationRepo::create(
            &self.pool,
            &CreateNotification {
                recipient_id: recipient.as_ref().map(|(_, r)| r.id),
                notification_type: notification_type.to_string(),
                actor_id: input.actor_id,
                is_cc: input.is_cc,
                cc_email: input.cc_email.clone(),
                activity_log_title: templates::activity_log_title(notification_type, &title, args),
                activity_log_description: templates::activity_log_description(
                    notification_type,
                    args,
                ),
                title,
                description: input.description.clone(),
                related_object_type,
                related_object_id,
                secondary_related_object_type,
                secondary_related_object_id,
                additional_args: args.clone(),
            },
        )
        .await?;

        let mut event = PlatformEvent::new(NOTIFICATION_CREATED)
            .with_source("notification", notification.id)
            .with_payload(serde_json::json!({
                "notification_type": notification.notification_type,
                "recipient_id": notification.recipient_id,
            }));
        if let Some(actor) = input.actor_id {
            event = event.with_actor(actor);
        }
        self.bus.publish(event);

        let Some((user, recipient)) = recipient else {
            return Ok(Created {
                notification,
                parent_copy_for: None,
            });
        };

        let config = notification_config(notification_type);
        let mut parent_copy_for = None;

        if self.should_email(&user, &recipient, notification_type) {
            self.send_email(&notification, &user).await;
        } else if config.cc_parent && !input.is_cc && user.role == ROLE_STUDENT {
            parent_copy_for = self.parent_user_id(user.id).await?;
        }

        if config.default_text
            && !recipient.unsubscribed_from_text(notification_type)
            && recipient.can_text()
        {
            self.send_text(&notification, &recipient).await;
        }

        Ok(Created {
            notification,
            parent_copy_for,
        })
    }

    fn should_email(
        &self,
        user: &User,
        recipient: &NotificationRecipient,
        notification_type: &str,
    ) -> bool {
        if recipient.unsubscribed_from_email(notification_type) || !recipient.receive_emails {
            return false;
        }
        !user.is_pending() || allowed_for_pending_user(notification_type)
    }

    async fn parent_user_id(&self, student_user_id: DbId) -> Result<Option<DbId>, sqlx::Error> {
        let Some(student) = StudentRepo::find_by_user_id(&self.pool, student_user_id).await? else {
            return Ok(None);
        };
        let Some(parent_id) = student.parent_id else {
            return Ok(None);
        };
        Ok(ParentRepo::find_by_id(&self.pool, parent_id)
            .await?
            .map(|p| p.user_id))
    }

    /// Addresses copied on an email to `user`.
    async fn cc_addresses(
        &self,
        notification: &Notification,
        user: &User,
    ) -> Result<Vec<String>, sqlx::Error> {
        let mut cc = Vec::new();
        let config = notification_config(&notification.notification_type);

        if user.role == ROLE_STUDENT && config.cc_parent && !notification.is_cc {
            if let Some(parent_user_id) = self.parent_user_id(user.id).await? {
                if let Some(parent_user) = UserRepo::find_by_id(&self.pool, parent_user_id).await? {
                    cc.push(parent_user.email);
                }
                if let Some(parent) = ParentRepo::find_by_user_id(&self.pool, parent_user_id).await? {
                    cc.extend(parent.cc_email);
                }
            }
        } else if user.role == ROLE_PARENT {
            if let Some(parent) = ParentRepo::find_by_user_id(&self.pool, user.id).await? {
                cc.extend(parent.cc_email);
            }
        }
        cc.extend(notification.cc_email.clone());

        cc.retain(|address| !address.is_empty() && address != &user.email);
        cc.dedup();
        Ok(cc)
    }

    async fn send_email(&self, notification: &Notification, user: &User) {
        let Some(channel) = &self.deliveries.email else {
            tracing::debug!(notification_id = notification.id, "No email channel configured");
            return;
        };

        let cc = match self.cc_addresses(notification, user).await {
            Ok(cc) => cc,
            Err(e) => {
                tracing::error!(notification_id = notification.id, error = %e, "Failed to resolve cc addresses");
                Vec::new()
            }
        };

        let message = EmailMessage {
            to: user.email.clone(),
            cc,
            subject: notification.title.clone(),
            body: templates::email_body(
                &notification.title,
                &notification.description,
                &notification.additional_args,
                &self.config.site_name,
                &self.config.site_url,
            ),
        };

        match channel.send_email(&message).await {
            Ok(()) => {
                if let Err(e) = NotificationRepo::mark_emailed(&self.pool, notification.id).await {
                    tracing::error!(notification_id = notification.id, error = %e, "Failed to mark notification emailed");
                }
            }
            Err(e) => {
                tracing::error!(
                    notification_id = notification.id,
                    channel = channel.name(),
                    error = %e,
                    "Notification email failed"
                );
            }
        }
    }

    async fn send_text(&self, notification: &Notification, recipient: &NotificationRecipient) {
        let Some(channel) = &self.deliveries.text else {
            tracing::debug!(notification_id = notification.id, "No text channel configured");
            return;
        };
        let Some(phone) = recipient.phone_number.as_deref() else {
            return;
        };

        let body = templates::text_body(
            &notification.notification_type,
            &notification.title,
            &notification.additional_args,
            &self.config.site_name,
        );
        if !text_fits(&body) {
            tracing::warn!(
                notification_id = notification.id,
                length = body.chars().count(),
                "Notification text too long, not sent"
            );
            return;
        }

        match channel.send_text(&e164(phone), &body).await {
            Ok(()) => {
                if let Err(e) = NotificationRepo::mark_texted(&self.pool, notification.id).await {
                    tracing::error!(notification_id = notification.id, error = %e, "Failed to mark notification texted");
                }
            }
            Err(e) => {
                tracing::error!(
                    notification_id = notification.id,
                    channel = channel.name(),
                    error = %e,
                    "Notification text failed"
                );
            }
        }
    }
}
