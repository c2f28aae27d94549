//! Operations notices for administrators: courses about to start and the
//! daily report of students' first individual sessions.

use std::collections::HashSet;

use chrono::Duration;
use schoolnet_core::format::{format_datetime, format_hours, format_mdy};
use schoolnet_core::notification_types as types;
use schoolnet_core::reminders::DAILY_DIGEST_MIN_GAP_HOURS;
use schoolnet_core::types::{DbId, Timestamp};
use schoolnet_db::models::tutoring::{Course, StudentTutoringSession};
use schoolnet_db::models::user::User;
use schoolnet_db::repositories::{
    CourseRepo, NotificationRepo, TutorRepo, TutoringSessionRepo, UserRepo,
};
use schoolnet_db::DbPool;
use schoolnet_events::NewNotification;
use schoolnet_managers::TutoringPackageManager;
use serde_json::json;

use super::{load_student, load_user, JobContext, JobResult};

const UPCOMING_COURSE_DAYS: i64 = 7;
const FIRST_SESSION_LOOKBACK_HOURS: i64 = 24;

async fn tutor_name(pool: &DbPool, tutor_id: Option<DbId>) -> JobResult<Option<String>> {
    let Some(tutor_id) = tutor_id else {
        return Ok(None);
    };
    Ok(match TutorRepo::find_by_id(pool, tutor_id).await? {
        Some(tutor) => load_user(pool, tutor.user_id).await?.map(|u| u.full_name()),
        None => None,
    })
}

// ---------------------------------------------------------------------------
// Upcoming courses
// ---------------------------------------------------------------------------

/// "SAT Bootcamp starting on 03/04/2024 with Tia Test".
async fn course_display_name(pool: &DbPool, course: &Course) -> JobResult<String> {
    let Some(first) = CourseRepo::first_session(pool, course.id).await? else {
        return Ok(course.name.clone());
    };
    let mut name = format!("{} starting on {}", course.name, format_mdy(first.starts_at));
    if let Some(tutor) = tutor_name(pool, first.primary_tutor_id.or(course.primary_tutor_id)).await? {
        name.push_str(&format!(" with {tutor}"));
    }
    Ok(name)
}

/// Tell every admin about courses whose first session is within a week.
/// Each course is announced once. Returns course ids.
pub async fn upcoming_courses(ctx: &JobContext, now: Timestamp) -> JobResult<Vec<DbId>> {
    let pool = ctx.pool();
    let notified =
        NotificationRepo::related_ids_for_type(pool, types::OPS_UPCOMING_COURSE, "course").await?;
    let courses = CourseRepo::list_starting_before(
        pool,
        now,
        now + Duration::days(UPCOMING_COURSE_DAYS),
        &notified,
    )
    .await?;
    if courses.is_empty() {
        tracing::debug!("No new courses starting this week");
        return Ok(Vec::new());
    }

    let admins = UserRepo::list_admins(pool).await?;
    let mut announced = Vec::with_capacity(courses.len());
    for course in &courses {
        let name = course_display_name(pool, course).await?;
        for admin in &admins {
            if let Err(e) = ctx
                .notifier
                .create(
                    NewNotification::new(types::OPS_UPCOMING_COURSE)
                        .to_user(admin.id)
                        .related("course", course.id)
                        .args(json!({"course": name})),
                )
                .await
            {
                tracing::error!(
                    course_id = course.id,
                    admin_id = admin.id,
                    error = %e,
                    "Failed to send upcoming course notice"
                );
            }
        }
        announced.push(course.id);
    }

    tracing::info!(count = announced.len(), "Announced upcoming courses");
    Ok(announced)
}

// ---------------------------------------------------------------------------
// First individual sessions
// ---------------------------------------------------------------------------

/// One report line per session, with the student's remaining hours.
async fn first_session_line(
    ctx: &JobContext,
    packages: &TutoringPackageManager,
    session: &StudentTutoringSession,
    timezone: &str,
) -> JobResult<Option<String>> {
    let pool = ctx.pool();
    let Some(student_id) = session.student_id else {
        return Ok(None);
    };
    let Some((_, student_user)) = load_student(pool, student_id).await? else {
        return Ok(None);
    };
    let tutor = tutor_name(pool, session.individual_session_tutor_id)
        .await?
        .unwrap_or_default();
    let hours = packages.available_hours(student_id).await?;
    Ok(Some(format!(
        "{} with {tutor} - {} (curriculum {}h, test prep {}h, group test prep {}h left)",
        student_user.full_name(),
        format_datetime(session.starts_at, timezone),
        format_hours(hours.individual_curriculum.max(0)),
        format_hours(hours.individual_test_prep.max(0)),
        format_hours(hours.group_test_prep.max(0)),
    )))
}

/// Send every admin the individual sessions of the last day that were a
/// student's first. The report goes out even when the list is empty; admins
/// that got one in the last 23 hours are skipped. Returns admin user ids.
pub async fn first_session_digest(ctx: &JobContext, now: Timestamp) -> JobResult<Vec<DbId>> {
    let pool = ctx.pool();
    let recently: HashSet<DbId> = NotificationRepo::user_ids_notified_since(
        pool,
        types::FIRST_INDIVIDUAL_TUTORING_SESSION_DAILY_DIGEST,
        now - Duration::hours(DAILY_DIGEST_MIN_GAP_HOURS),
    )
    .await?
    .into_iter()
    .collect();
    let admins: Vec<User> = UserRepo::list_admins(pool)
        .await?
        .into_iter()
        .filter(|a| !recently.contains(&a.id))
        .collect();
    if admins.is_empty() {
        return Ok(Vec::new());
    }

    let sessions = TutoringSessionRepo::list_first_individual_between(
        pool,
        now - Duration::hours(FIRST_SESSION_LOOKBACK_HOURS),
        now,
    )
    .await?;
    let packages = TutoringPackageManager::new(ctx.notifier.clone());

    let mut sent = Vec::new();
    for admin in &admins {
        let mut lines = Vec::with_capacity(sessions.len());
        for session in &sessions {
            match first_session_line(ctx, &packages, session, &admin.timezone).await {
                Ok(Some(line)) => lines.push(line),
                Ok(None) => {}
                Err(e) => tracing::error!(
                    session_id = session.id,
                    error = %e,
                    "Failed to describe first session"
                ),
            }
        }
        let result = ctx
            .notifier
            .create(
                NewNotification::new(types::FIRST_INDIVIDUAL_TUTORING_SESSION_DAILY_DIGEST)
                    .to_user(admin.id)
                    .related("user", admin.id)
                    .args(json!({"count": lines.len(), "sessions": lines})),
            )
            .await;
        match result {
            Ok(_) => sent.push(admin.id),
            Err(e) => tracing::error!(admin_id = admin.id, error = %e, "Failed to send first session report"),
        }
    }

    tracing::info!(
        admins = sent.len(),
        sessions = sessions.len(),
        "Sent first session reports"
    );
    Ok(sent)
}
