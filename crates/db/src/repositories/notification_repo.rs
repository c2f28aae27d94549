//! Repository for the `notifications` table.

use sqlx::PgPool;
use schoolnet_core::types::{DbId, Timestamp};

use crate::models::notification::{CreateNotification, Notification};

/// Column list for `notifications` queries.
const COLUMNS: &str = "id, recipient_id, notification_type, actor_id, is_cc, cc_email, title, \
                        description, activity_log_title, activity_log_description, emailed, \
                        texted, is_read, read_at, related_object_type, related_object_id, \
                        secondary_related_object_type, secondary_related_object_id, \
                        additional_args, created_at";

/// Provides CRUD operations for notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Persist a rendered notification.
    pub async fn create(
        pool: &PgPool,
        input: &CreateNotification,
    ) -> Result<Notification, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications
                (recipient_id, notification_type, actor_id, is_cc, cc_email, title, description,
                 activity_log_title, activity_log_description, related_object_type,
                 related_object_id, secondary_related_object_type, secondary_related_object_id,
                 additional_args)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(input.recipient_id)
            .bind(&input.notification_type)
            .bind(input.actor_id)
            .bind(input.is_cc)
            .bind(&input.cc_email)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.activity_log_title)
            .bind(&input.activity_log_description)
            .bind(&input.related_object_type)
            .bind(input.related_object_id)
            .bind(&input.secondary_related_object_type)
            .bind(input.secondary_related_object_id)
            .bind(&input.additional_args)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Notification>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notifications WHERE id = $1");
        sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn mark_emailed(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE notifications SET emailed = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn mark_texted(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE notifications SET texted = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// List notifications for a user.
    ///
    /// When `unread_only` is `true`, only notifications with `is_read = false`
    /// are returned.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let filter = if unread_only {
            "AND is_read = false"
        } else {
            ""
        };
        let query = format!(
            "SELECT {COLUMNS} FROM notifications
             WHERE recipient_id = (SELECT id FROM notification_recipients WHERE user_id = $1)
               {filter}
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Mark a single notification as read.
    ///
    /// Returns `true` if the notification belongs to the user and was unread.
    pub async fn mark_read(
        pool: &PgPool,
        notification_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications n SET is_read = true, read_at = NOW()
             FROM notification_recipients r
             WHERE n.id = $1 AND n.recipient_id = r.id AND r.user_id = $2
               AND n.is_read = false",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark all unread notifications as read for a user.
    ///
    /// Returns the number of notifications that were marked read.
    pub async fn mark_all_read(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications n SET is_read = true, read_at = NOW()
             FROM notification_recipients r
             WHERE n.recipient_id = r.id AND r.user_id = $1 AND n.is_read = false",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn unread_count(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications n
             JOIN notification_recipients r ON r.id = n.recipient_id
             WHERE r.user_id = $1 AND n.is_read = false",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(count.unwrap_or(0))
    }

    /// Whether a recipient already has a notification of this type about an object.
    pub async fn exists_for_related(
        pool: &PgPool,
        recipient_id: DbId,
        notification_type: &str,
        related_object_type: &str,
        related_object_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM notifications
                WHERE recipient_id = $1 AND notification_type = $2
                  AND related_object_type = $3 AND related_object_id = $4
             )",
        )
        .bind(recipient_id)
        .bind(notification_type)
        .bind(related_object_type)
        .bind(related_object_id)
        .fetch_one(pool)
        .await
    }

    /// Most recent time a recipient was sent a notification of this type.
    pub async fn last_sent_at(
        pool: &PgPool,
        recipient_id: DbId,
        notification_type: &str,
    ) -> Result<Option<Timestamp>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT MAX(created_at) FROM notifications
             WHERE recipient_id = $1 AND notification_type = $2",
        )
        .bind(recipient_id)
        .bind(notification_type)
        .fetch_one(pool)
        .await
    }

    /// User ids that received a notification of this type at or after `since`.
    pub async fn user_ids_notified_since(
        pool: &PgPool,
        notification_type: &str,
        since: Timestamp,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT DISTINCT r.user_id FROM notifications n
             JOIN notification_recipients r ON r.id = n.recipient_id
             WHERE n.notification_type = $1 AND n.created_at >= $2",
        )
        .bind(notification_type)
        .bind(since)
        .fetch_all(pool)
        .await
    }

    /// Notifications of a type about an object, newest first.
    pub async fn list_for_related(
        pool: &PgPool,
        notification_type: &str,
        related_object_type: &str,
        related_object_id: DbId,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications
             WHERE notification_type = $1 AND related_object_type = $2
               AND related_object_id = $3
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(notification_type)
            .bind(related_object_type)
            .bind(related_object_id)
            .fetch_all(pool)
            .await
    }

    /// Ids of every object of `related_object_type` that already has a
    /// notification of this type.
    pub async fn related_ids_for_type(
        pool: &PgPool,
        notification_type: &str,
        related_object_type: &str,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT DISTINCT related_object_id FROM notifications
             WHERE notification_type = $1 AND related_object_type = $2
               AND related_object_id IS NOT NULL",
        )
        .bind(notification_type)
        .bind(related_object_type)
        .fetch_all(pool)
        .await
    }

    /// Notifications addressed to a user, filtered by type. Used by jobs and tests.
    pub async fn list_for_user_by_type(
        pool: &PgPool,
        user_id: DbId,
        notification_type: &str,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications
             WHERE recipient_id = (SELECT id FROM notification_recipients WHERE user_id = $1)
               AND notification_type = $2
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .bind(notification_type)
            .fetch_all(pool)
            .await
    }
}
