//! Student-facing task notices: the daily digest of new tasks and the
//! overdue / coming-due reminder.

use std::collections::{BTreeMap, HashSet};

use chrono::Duration;
use schoolnet_core::format::format_day;
use schoolnet_core::notification_types as types;
use schoolnet_core::reminders::{
    backoff_elapsed, task_due_bucket, DueBucket, TASK_DIGEST_LOOKBACK_HOURS,
    TASK_DIGEST_MIN_GAP_HOURS, TASK_DUE_WINDOW_HOURS, TASK_REMINDER_BACKOFF_HOURS,
};
use schoolnet_core::types::{DbId, Timestamp};
use schoolnet_db::models::task::StudentTaskRow;
use schoolnet_db::repositories::{NotificationRepo, TaskRepo};
use schoolnet_events::NewNotification;
use serde_json::{json, Value};

use super::{load_user, JobContext, JobResult};

fn group_by_user(rows: Vec<StudentTaskRow>) -> BTreeMap<DbId, Vec<StudentTaskRow>> {
    let mut grouped: BTreeMap<DbId, Vec<StudentTaskRow>> = BTreeMap::new();
    for row in rows {
        grouped.entry(row.for_user_id).or_default().push(row);
    }
    grouped
}

fn task_item(row: &StudentTaskRow, timezone: &str) -> Value {
    match row.due {
        Some(due) => json!({"title": row.title, "due": format_day(due, timezone)}),
        None => json!({"title": row.title}),
    }
}

// ---------------------------------------------------------------------------
// Daily digest
// ---------------------------------------------------------------------------

/// Tell students and parents about tasks assigned in the last day. Users
/// that got a digest in the last 23 hours are skipped. Returns the user ids
/// notified.
pub async fn daily_task_digest(ctx: &JobContext, now: Timestamp) -> JobResult<Vec<DbId>> {
    let pool = ctx.pool();
    let since = now - Duration::hours(TASK_DIGEST_LOOKBACK_HOURS);
    let rows: Vec<StudentTaskRow> = TaskRepo::list_assigned_since(pool, since)
        .await?
        .into_iter()
        .filter(|t| t.assigned_time.is_some_and(|at| at > since && at <= now))
        .collect();

    let recently: HashSet<DbId> = NotificationRepo::user_ids_notified_since(
        pool,
        types::TASK_DIGEST,
        now - Duration::hours(TASK_DIGEST_MIN_GAP_HOURS),
    )
    .await?
    .into_iter()
    .collect();

    let mut sent = Vec::new();
    for (user_id, tasks) in group_by_user(rows) {
        if recently.contains(&user_id) {
            continue;
        }
        let Some(user) = load_user(pool, user_id).await? else {
            continue;
        };
        let items: Vec<Value> = tasks.iter().map(|t| task_item(t, &user.timezone)).collect();
        let result = ctx
            .notifier
            .create(
                NewNotification::new(types::TASK_DIGEST)
                    .to_user(user_id)
                    .related("user", user_id)
                    .args(json!({"count": items.len(), "tasks": items})),
            )
            .await;
        match result {
            Ok(_) => sent.push(user_id),
            Err(e) => tracing::error!(user_id, error = %e, "Failed to send task digest"),
        }
    }

    if sent.is_empty() {
        tracing::debug!("No task digests to send");
    } else {
        tracing::info!(count = sent.len(), "Sent task digests");
    }
    Ok(sent)
}

// ---------------------------------------------------------------------------
// Overdue and coming-due reminders
// ---------------------------------------------------------------------------

/// Remind assignees of overdue tasks and tasks due within two days.
///
/// Tasks reminded about in the last 23 hours are left out. A task's
/// `last_reminder_sent` only moves when the reminder was actually emailed
/// or texted, so a muted reminder is retried next run. Returns the task ids
/// reminded about.
pub async fn student_task_reminders(ctx: &JobContext, now: Timestamp) -> JobResult<Vec<DbId>> {
    let pool = ctx.pool();
    let rows: Vec<StudentTaskRow> =
        TaskRepo::list_reminder_candidates(pool, now + Duration::hours(TASK_DUE_WINDOW_HOURS))
            .await?
            .into_iter()
            .filter(|t| backoff_elapsed(t.last_reminder_sent, now, TASK_REMINDER_BACKOFF_HOURS))
            .filter(|t| task_due_bucket(t.due, now).is_some())
            .collect();

    let mut reminded = Vec::new();
    for (user_id, tasks) in group_by_user(rows) {
        let Some(user) = load_user(pool, user_id).await? else {
            continue;
        };
        let (overdue, coming_due): (Vec<&StudentTaskRow>, Vec<&StudentTaskRow>) = tasks
            .iter()
            .partition(|t| task_due_bucket(t.due, now) == Some(DueBucket::Overdue));

        let args = json!({
            "count": tasks.len(),
            "overdue": overdue.iter().map(|t| task_item(t, &user.timezone)).collect::<Vec<_>>(),
            "coming_due": coming_due.iter().map(|t| task_item(t, &user.timezone)).collect::<Vec<_>>(),
        });
        let notification = match ctx
            .notifier
            .create(
                NewNotification::new(types::STUDENT_TASK_REMINDER)
                    .to_user(user_id)
                    .args(args),
            )
            .await
        {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(user_id, error = %e, "Failed to send task reminder");
                continue;
            }
        };

        let delivered = notification.is_some_and(|n| n.emailed.is_some() || n.texted.is_some());
        if !delivered {
            tracing::debug!(user_id, "Task reminder not delivered, will retry");
            continue;
        }
        let ids: Vec<DbId> = tasks.iter().map(|t| t.task_id).collect();
        TaskRepo::set_last_reminder_sent(pool, &ids, now).await?;
        reminded.extend(ids);
    }

    if !reminded.is_empty() {
        tracing::info!(count = reminded.len(), "Sent student task reminders");
    }
    Ok(reminded)
}
