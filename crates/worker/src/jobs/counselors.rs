//! Counselor digests: upcoming and overdue student tasks (2pm local),
//! recently completed tasks (7pm local) and the weekly meeting list.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Duration;
use schoolnet_core::format::{format_datetime, format_day};
use schoolnet_core::notification_types as types;
use schoolnet_core::reminders::WEEKLY_DIGEST_MIN_GAP_DAYS;
use schoolnet_core::send_window::{
    completed_digest_window, in_send_window, is_weekend, task_digest_window,
    COUNSELOR_COMPLETED_TASKS_SEND_HOUR, COUNSELOR_TASK_DIGEST_SEND_HOUR,
};
use schoolnet_core::types::{DbId, Timestamp};
use schoolnet_db::models::user::{Counselor, User};
use schoolnet_db::repositories::{CounselorMeetingRepo, CounselorRepo, NotificationRepo, TaskRepo};
use schoolnet_db::DbPool;
use schoolnet_events::NewNotification;
use serde_json::{json, Value};

use super::{load_student, load_user, JobContext, JobResult};

const WEEKLY_DIGEST_DAYS: i64 = 7;

/// Active counselors with their users, minus those in `exclude_users`.
async fn counselors_excluding(
    pool: &DbPool,
    exclude_users: &HashSet<DbId>,
) -> JobResult<Vec<(Counselor, User)>> {
    let mut out = Vec::new();
    for counselor in CounselorRepo::list_active(pool).await? {
        if exclude_users.contains(&counselor.user_id) {
            continue;
        }
        if let Some(user) = load_user(pool, counselor.user_id).await? {
            out.push((counselor, user));
        }
    }
    Ok(out)
}

/// Student display names, looked up once per student.
struct StudentNames<'a> {
    pool: &'a DbPool,
    cache: HashMap<DbId, String>,
}

impl<'a> StudentNames<'a> {
    fn new(pool: &'a DbPool) -> Self {
        Self {
            pool,
            cache: HashMap::new(),
        }
    }

    async fn get(&mut self, student_id: DbId) -> JobResult<String> {
        if let Some(name) = self.cache.get(&student_id) {
            return Ok(name.clone());
        }
        let name = load_student(self.pool, student_id)
            .await?
            .map(|(_, u)| u.full_name())
            .unwrap_or_default();
        self.cache.insert(student_id, name.clone());
        Ok(name)
    }
}

// ---------------------------------------------------------------------------
// Task digest
// ---------------------------------------------------------------------------

/// Send each counselor, at 2pm their time, the open tasks of students they
/// meet soon: tasks on those meetings plus anything due before the window
/// ends. Returns counselor ids.
pub async fn counselor_task_digest(ctx: &JobContext, now: Timestamp) -> JobResult<Vec<DbId>> {
    if ctx.skip_weekends && is_weekend(now) {
        tracing::debug!("Skipping counselor task digest on weekend");
        return Ok(Vec::new());
    }
    let pool = ctx.pool();
    let (start, end) = task_digest_window(now);
    let already: HashSet<DbId> = NotificationRepo::user_ids_notified_since(
        pool,
        types::COUNSELOR_TASK_DIGEST,
        start - Duration::hours(24),
    )
    .await?
    .into_iter()
    .collect();

    let mut sent = Vec::new();
    for (counselor, user) in counselors_excluding(pool, &already).await? {
        if !in_send_window(now, &user.timezone, COUNSELOR_TASK_DIGEST_SEND_HOUR) {
            continue;
        }
        match task_digest_for(ctx, &counselor, &user, start, end).await {
            Ok(true) => sent.push(counselor.id),
            Ok(false) => {}
            Err(e) => tracing::error!(
                counselor_id = counselor.id,
                error = %e,
                "Failed to send counselor task digest"
            ),
        }
    }

    if !sent.is_empty() {
        tracing::info!(count = sent.len(), "Sent counselor task digests");
    }
    Ok(sent)
}

async fn task_digest_for(
    ctx: &JobContext,
    counselor: &Counselor,
    user: &User,
    start: Timestamp,
    end: Timestamp,
) -> JobResult<bool> {
    let pool = ctx.pool();
    let meetings: Vec<_> = CounselorMeetingRepo::list_for_counselor_between(pool, counselor.id, start, end)
        .await?
        .into_iter()
        .filter(|m| m.ends_at.map_or(true, |e| e <= end))
        .collect();
    if meetings.is_empty() {
        return Ok(false);
    }

    let mut names = StudentNames::new(pool);
    // Keyed by task id so a task on a meeting that is also overdue shows once.
    let mut tasks: BTreeMap<DbId, Value> = BTreeMap::new();
    let mut students = HashSet::new();

    for meeting in &meetings {
        let student = names.get(meeting.student_id).await?;
        for task in TaskRepo::list_for_meeting(pool, meeting.id).await? {
            if task.completed.is_some() || task.archived.is_some() {
                continue;
            }
            tasks.entry(task.id).or_insert_with(|| {
                json!({
                    "title": task.title,
                    "student": student,
                    "due": task.due.map(|d| format_day(d, &user.timezone)),
                })
            });
        }
        if !students.insert(meeting.student_id) {
            continue;
        }
        for row in TaskRepo::list_overdue_for_student(pool, meeting.student_id, end).await? {
            tasks.entry(row.task_id).or_insert_with(|| {
                json!({
                    "title": row.title,
                    "student": student,
                    "due": row.due.map(|d| format_day(d, &user.timezone)),
                })
            });
        }
    }

    if tasks.is_empty() {
        return Ok(false);
    }
    let items: Vec<Value> = tasks.into_values().collect();
    ctx.notifier
        .create(
            NewNotification::new(types::COUNSELOR_TASK_DIGEST)
                .to_user(user.id)
                .related("counselor", counselor.id)
                .args(json!({"count": items.len(), "tasks": items})),
        )
        .await?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Completed tasks
// ---------------------------------------------------------------------------

/// Send each counselor, at 7pm their time, the tasks their students
/// completed since the last digest window. Returns counselor ids.
pub async fn counselor_completed_tasks(ctx: &JobContext, now: Timestamp) -> JobResult<Vec<DbId>> {
    if ctx.skip_weekends && is_weekend(now) {
        tracing::debug!("Skipping completed tasks digest on weekend");
        return Ok(Vec::new());
    }
    let pool = ctx.pool();
    let (start, end) = completed_digest_window(now);
    let already: HashSet<DbId> =
        NotificationRepo::user_ids_notified_since(pool, types::COUNSELOR_COMPLETED_TASKS, start)
            .await?
            .into_iter()
            .collect();

    let mut sent = Vec::new();
    for (counselor, user) in counselors_excluding(pool, &already).await? {
        if !in_send_window(now, &user.timezone, COUNSELOR_COMPLETED_TASKS_SEND_HOUR) {
            continue;
        }
        let rows = TaskRepo::list_completed_for_counselor(pool, counselor.id, start, end).await?;
        if rows.is_empty() {
            continue;
        }

        let mut names = StudentNames::new(pool);
        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            let student = match row.student_id {
                Some(id) => names.get(id).await?,
                None => String::new(),
            };
            items.push(json!({"title": row.title, "student": student}));
        }
        let result = ctx
            .notifier
            .create(
                NewNotification::new(types::COUNSELOR_COMPLETED_TASKS)
                    .to_user(user.id)
                    .related("counselor", counselor.id)
                    .args(json!({"count": items.len(), "tasks": items})),
            )
            .await;
        match result {
            Ok(_) => sent.push(counselor.id),
            Err(e) => tracing::error!(
                counselor_id = counselor.id,
                error = %e,
                "Failed to send completed tasks digest"
            ),
        }
    }

    if !sent.is_empty() {
        tracing::info!(count = sent.len(), "Sent completed tasks digests");
    }
    Ok(sent)
}

// ---------------------------------------------------------------------------
// Weekly digest
// ---------------------------------------------------------------------------

/// Send every counselor with meetings in the coming week a list of them.
/// Counselors that got one in the last six days are skipped.
pub async fn counselor_weekly_digest(ctx: &JobContext, now: Timestamp) -> JobResult<Vec<DbId>> {
    let pool = ctx.pool();
    let end = now + Duration::days(WEEKLY_DIGEST_DAYS);
    let already: HashSet<DbId> = NotificationRepo::user_ids_notified_since(
        pool,
        types::COUNSELOR_WEEKLY_DIGEST,
        now - Duration::days(WEEKLY_DIGEST_MIN_GAP_DAYS),
    )
    .await?
    .into_iter()
    .collect();

    let mut sent = Vec::new();
    for (counselor, user) in counselors_excluding(pool, &already).await? {
        let meetings = CounselorMeetingRepo::list_for_counselor_between(pool, counselor.id, now, end).await?;
        if meetings.is_empty() {
            continue;
        }

        let mut names = StudentNames::new(pool);
        let mut lines = Vec::with_capacity(meetings.len());
        for meeting in &meetings {
            let when = meeting
                .starts_at
                .map(|s| format_datetime(s, &user.timezone))
                .unwrap_or_default();
            lines.push(format!(
                "{} ({}) - {when}",
                meeting.title,
                names.get(meeting.student_id).await?
            ));
        }
        let result = ctx
            .notifier
            .create(
                NewNotification::new(types::COUNSELOR_WEEKLY_DIGEST)
                    .to_user(user.id)
                    .related("counselor", counselor.id)
                    .args(json!({"count": lines.len(), "meetings": lines})),
            )
            .await;
        match result {
            Ok(_) => sent.push(counselor.id),
            Err(e) => tracing::error!(
                counselor_id = counselor.id,
                error = %e,
                "Failed to send weekly digest"
            ),
        }
    }

    if !sent.is_empty() {
        tracing::info!(count = sent.len(), "Sent counselor weekly digests");
    }
    Ok(sent)
}
