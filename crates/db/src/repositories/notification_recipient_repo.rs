//! Repository for the `notification_recipients` table.

use sqlx::PgPool;
use schoolnet_core::types::DbId;

use crate::models::notification::{NotificationRecipient, UpdateRecipient};

const COLUMNS: &str = "id, user_id, phone_number, phone_number_confirmed, \
                        phone_number_verification_code, confirmation_last_sent, receive_emails, \
                        receive_texts, unsubscribed_email_notifications, \
                        unsubscribed_text_notifications, created_at, updated_at";

/// Provides access to per-user delivery settings.
pub struct NotificationRecipientRepo;

impl NotificationRecipientRepo {
    /// Return the recipient for a user, creating it with defaults on first use.
    pub async fn get_or_create(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<NotificationRecipient, sqlx::Error> {
        sqlx::query(
            "INSERT INTO notification_recipients (user_id) VALUES ($1)
             ON CONFLICT ON CONSTRAINT uq_notification_recipients_user DO NOTHING",
        )
        .bind(user_id)
        .execute(pool)
        .await?;

        let query = format!("SELECT {COLUMNS} FROM notification_recipients WHERE user_id = $1");
        sqlx::query_as::<_, NotificationRecipient>(&query)
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<NotificationRecipient>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notification_recipients WHERE id = $1");
        sqlx::query_as::<_, NotificationRecipient>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_user_id(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<NotificationRecipient>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notification_recipients WHERE user_id = $1");
        sqlx::query_as::<_, NotificationRecipient>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Apply channel switches and opt-out lists. `None` fields are left untouched.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateRecipient,
    ) -> Result<Option<NotificationRecipient>, sqlx::Error> {
        let query = format!(
            "UPDATE notification_recipients SET
                receive_emails = COALESCE($2, receive_emails),
                receive_texts = COALESCE($3, receive_texts),
                unsubscribed_email_notifications = COALESCE($4, unsubscribed_email_notifications),
                unsubscribed_text_notifications = COALESCE($5, unsubscribed_text_notifications)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationRecipient>(&query)
            .bind(id)
            .bind(input.receive_emails)
            .bind(input.receive_texts)
            .bind(&input.unsubscribed_email_notifications)
            .bind(&input.unsubscribed_text_notifications)
            .fetch_optional(pool)
            .await
    }

    /// Store a new phone number. Any previous confirmation and pending code are cleared.
    pub async fn set_phone_number(
        pool: &PgPool,
        id: DbId,
        phone_number: Option<&str>,
    ) -> Result<Option<NotificationRecipient>, sqlx::Error> {
        let query = format!(
            "UPDATE notification_recipients SET
                phone_number = $2,
                phone_number_confirmed = NULL,
                phone_number_verification_code = ''
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationRecipient>(&query)
            .bind(id)
            .bind(phone_number)
            .fetch_optional(pool)
            .await
    }

    /// Store a freshly generated verification code and stamp `confirmation_last_sent`.
    pub async fn set_verification_code(
        pool: &PgPool,
        id: DbId,
        code: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notification_recipients
             SET phone_number_verification_code = $2, confirmation_last_sent = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(code)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark the phone number confirmed and consume the verification code.
    pub async fn confirm_phone(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notification_recipients
             SET phone_number_confirmed = NOW(), phone_number_verification_code = ''
             WHERE id = $1 AND phone_number IS NOT NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
