//! Reminders for invited users who have not set a password yet.

use schoolnet_core::notification_types as types;
use schoolnet_core::reminders::invite_reminder_due;
use schoolnet_core::types::{DbId, Timestamp};
use schoolnet_db::models::user::User;
use schoolnet_db::repositories::{NotificationRecipientRepo, NotificationRepo, UserRepo};
use schoolnet_events::NewNotification;

use super::{JobContext, JobResult};

/// Re-send the invite two days after it went out, then weekly. Returns the
/// ids of users reminded.
pub async fn invite_reminders(ctx: &JobContext, now: Timestamp) -> JobResult<Vec<DbId>> {
    let pool = ctx.pool();
    let mut sent = Vec::new();

    for user in UserRepo::list_pending_invited(pool).await? {
        let already_sent = match NotificationRecipientRepo::find_by_user_id(pool, user.id).await? {
            Some(recipient) => NotificationRepo::last_sent_at(pool, recipient.id, types::INVITE_REMINDER)
                .await?
                .is_some(),
            None => false,
        };
        if !invite_reminder_due(now, user.created_at, user.last_invited, already_sent) {
            continue;
        }
        match remind(ctx, &user, now).await {
            Ok(()) => sent.push(user.id),
            Err(e) => tracing::error!(user_id = user.id, error = %e, "Failed to send invite reminder"),
        }
    }

    if !sent.is_empty() {
        tracing::info!(count = sent.len(), "Sent invite reminders");
    }
    Ok(sent)
}

async fn remind(ctx: &JobContext, user: &User, now: Timestamp) -> JobResult<()> {
    UserRepo::set_last_invited(ctx.pool(), user.id, now).await?;
    ctx.notifier
        .create(
            NewNotification::new(types::INVITE_REMINDER)
                .to_user(user.id)
                .related("user", user.id),
        )
        .await?;
    Ok(())
}
