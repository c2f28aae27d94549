//! Reminders for upcoming tutoring sessions and counselor meetings, and the
//! admin notice about students running out of tutoring hours.

use std::collections::{BTreeMap, HashSet};

use chrono::{Duration, NaiveTime, TimeZone, Utc};
use schoolnet_core::format::{format_datetime, format_mdy};
use schoolnet_core::hours::is_last_session;
use schoolnet_core::notification_types as types;
use schoolnet_core::reminders::{
    reminder_due, reminder_windows, COUNSELOR_MEETING_REMINDER_MINUTES,
    DAILY_DIGEST_MIN_GAP_HOURS, TUTORING_SESSION_REMINDER_MINUTES,
};
use schoolnet_core::types::{DbId, Timestamp};
use schoolnet_db::models::counseling::CounselorMeeting;
use schoolnet_db::models::tutoring::{GroupTutoringSession, StudentTutoringSession};
use schoolnet_db::models::user::User;
use schoolnet_db::repositories::{
    CounselorMeetingRepo, CounselorRepo, NotificationRepo, TutorRepo, TutoringSessionRepo,
    UserRepo,
};
use schoolnet_events::NewNotification;
use schoolnet_managers::TutoringPackageManager;
use serde_json::json;

use super::{load_student, load_user, JobContext, JobResult};

/// Days ahead the last-session check looks.
const LAST_MEETING_LOOKAHEAD_DAYS: i64 = 7;

// ---------------------------------------------------------------------------
// Tutoring sessions
// ---------------------------------------------------------------------------

/// Sessions and group sessions a reminder went out for.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TutoringReminders {
    pub sessions: Vec<DbId>,
    pub group_sessions: Vec<DbId>,
}

impl TutoringReminders {
    pub fn len(&self) -> usize {
        self.sessions.len() + self.group_sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub async fn upcoming_tutoring_sessions(
    ctx: &JobContext,
    now: Timestamp,
) -> JobResult<TutoringReminders> {
    let pool = ctx.pool();
    let mut sent = TutoringReminders::default();

    for window in reminder_windows(now, TUTORING_SESSION_REMINDER_MINUTES) {
        let sessions = TutoringSessionRepo::list_starting_between(pool, window.after, window.until)
            .await?
            .into_iter()
            .filter(|s| !s.missed && window.contains(s.starts_at))
            .filter(|s| reminder_due(s.starts_at, s.last_reminder_sent, window.threshold_minutes));

        for session in sessions {
            if let Some(group_id) = session.group_tutoring_session_id {
                let cancelled = TutoringSessionRepo::find_group(pool, group_id)
                    .await?
                    .map_or(true, |g| g.cancelled);
                if cancelled {
                    continue;
                }
            }
            match remind_session(ctx, &session, now).await {
                Ok(()) => sent.sessions.push(session.id),
                Err(e) => tracing::error!(
                    session_id = session.id,
                    error = %e,
                    "Failed to send tutoring session reminder"
                ),
            }
        }

        let groups = TutoringSessionRepo::list_group_starting_between(pool, window.after, window.until)
            .await?
            .into_iter()
            .filter(|g| window.contains(g.starts_at))
            .filter(|g| reminder_due(g.starts_at, g.last_reminder_sent, window.threshold_minutes));

        for group in groups {
            match remind_group_session(ctx, &group, now).await {
                Ok(()) => sent.group_sessions.push(group.id),
                Err(e) => tracing::error!(
                    group_session_id = group.id,
                    error = %e,
                    "Failed to send group session reminder"
                ),
            }
        }
    }

    if !sent.is_empty() {
        tracing::info!(
            sessions = sent.sessions.len(),
            group_sessions = sent.group_sessions.len(),
            "Sent tutoring session reminders"
        );
    }
    Ok(sent)
}

async fn remind_session(
    ctx: &JobContext,
    session: &StudentTutoringSession,
    now: Timestamp,
) -> JobResult<()> {
    let pool = ctx.pool();
    TutoringSessionRepo::set_last_reminder_sent(pool, session.id, now).await?;

    let student = match session.student_id {
        Some(id) => load_student(pool, id).await?,
        None => None,
    };
    let Some((_, student_user)) = student else {
        return Ok(());
    };

    ctx.notifier
        .create(
            NewNotification::new(types::STUDENT_TUTORING_SESSION_REMINDER)
                .to_user(student_user.id)
                .related("student_tutoring_session", session.id)
                .args(json!({
                    "date": format_datetime(session.starts_at, &student_user.timezone),
                })),
        )
        .await?;

    if let Some(tutor_id) = session.individual_session_tutor_id {
        if let Some(tutor) = TutorRepo::find_by_id(pool, tutor_id).await? {
            if let Some(tutor_user) = load_user(pool, tutor.user_id).await? {
                ctx.notifier
                    .create(
                        NewNotification::new(types::TUTOR_TUTORING_SESSION_REMINDER)
                            .to_user(tutor_user.id)
                            .related("student_tutoring_session", session.id)
                            .args(json!({
                                "student": student_user.full_name(),
                                "date": format_datetime(session.starts_at, &tutor_user.timezone),
                            })),
                    )
                    .await?;
            }
        }
    }
    Ok(())
}

async fn remind_group_session(
    ctx: &JobContext,
    group: &GroupTutoringSession,
    now: Timestamp,
) -> JobResult<()> {
    let pool = ctx.pool();
    TutoringSessionRepo::set_group_last_reminder_sent(pool, group.id, now).await?;

    for tutor in TutorRepo::list_for_group_session(pool, group.id).await? {
        let Some(user) = load_user(pool, tutor.user_id).await? else {
            continue;
        };
        ctx.notifier
            .create(
                NewNotification::new(types::TUTOR_GTS_REMINDER)
                    .to_user(user.id)
                    .related("group_tutoring_session", group.id)
                    .args(json!({
                        "title": group.title,
                        "date": format_datetime(group.starts_at, &user.timezone),
                    })),
            )
            .await?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Counselor meetings
// ---------------------------------------------------------------------------

pub async fn upcoming_counselor_meetings(ctx: &JobContext, now: Timestamp) -> JobResult<Vec<DbId>> {
    let pool = ctx.pool();
    let mut sent = Vec::new();

    for window in reminder_windows(now, COUNSELOR_MEETING_REMINDER_MINUTES) {
        let meetings = CounselorMeetingRepo::list_starting_between(pool, window.after, window.until)
            .await?
            .into_iter()
            .filter_map(|m| m.starts_at.map(|start| (start, m)))
            .filter(|(start, m)| {
                window.contains(*start)
                    && reminder_due(*start, m.last_reminder_sent, window.threshold_minutes)
            });

        for (start, meeting) in meetings {
            match remind_meeting(ctx, &meeting, start, now).await {
                Ok(()) => sent.push(meeting.id),
                Err(e) => tracing::error!(
                    meeting_id = meeting.id,
                    student_id = meeting.student_id,
                    error = %e,
                    "Failed to send counselor meeting reminder"
                ),
            }
        }
    }

    if !sent.is_empty() {
        tracing::info!(count = sent.len(), "Sent counselor meeting reminders");
    }
    Ok(sent)
}

async fn remind_meeting(
    ctx: &JobContext,
    meeting: &CounselorMeeting,
    start: Timestamp,
    now: Timestamp,
) -> JobResult<()> {
    let pool = ctx.pool();
    let Some((student, student_user)) = load_student(pool, meeting.student_id).await? else {
        return Ok(());
    };
    let counselor_name = match student.counselor_id {
        Some(id) => match CounselorRepo::find_by_id(pool, id).await? {
            Some(c) => load_user(pool, c.user_id).await?.map(|u| u.full_name()),
            None => None,
        },
        None => None,
    };

    ctx.notifier
        .create(
            NewNotification::new(types::STUDENT_COUNSELOR_SESSION_REMINDER)
                .to_user(student_user.id)
                .related("counselor_meeting", meeting.id)
                .args(json!({
                    "meeting_title": meeting.title,
                    "counselor": counselor_name.unwrap_or_default(),
                    "date": format_datetime(start, &student_user.timezone),
                })),
        )
        .await?;
    CounselorMeetingRepo::set_last_reminder_sent(pool, meeting.id, now).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Last meetings
// ---------------------------------------------------------------------------

/// Notify administrators about students whose last paid individual session
/// falls in the coming week. Admins that got this notice in the last 23
/// hours are skipped. Returns the student ids reported.
pub async fn last_meetings(ctx: &JobContext, now: Timestamp) -> JobResult<Vec<DbId>> {
    let pool = ctx.pool();
    let recently: HashSet<DbId> = NotificationRepo::user_ids_notified_since(
        pool,
        types::LAST_MEETING,
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
        tracing::debug!("Every admin already has today's last session notice");
        return Ok(Vec::new());
    }

    let day_start = Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN));
    let window_end = day_start + Duration::days(LAST_MEETING_LOOKAHEAD_DAYS);
    let packages = TutoringPackageManager::new(ctx.notifier.clone());

    let sessions: Vec<StudentTutoringSession> =
        TutoringSessionRepo::list_starting_between(pool, day_start - Duration::seconds(1), window_end)
            .await?
            .into_iter()
            .filter(|s| s.individual_session_tutor_id.is_some())
            .collect();

    // Latest session in the window per student.
    let mut latest: BTreeMap<DbId, &StudentTutoringSession> = BTreeMap::new();
    for session in &sessions {
        let Some(student_id) = session.student_id else {
            continue;
        };
        latest
            .entry(student_id)
            .and_modify(|s| {
                if session.starts_at > s.starts_at {
                    *s = session;
                }
            })
            .or_insert(session);
    }

    let mut students = Vec::new();
    let mut names = Vec::new();
    for (student_id, session) in latest {
        if TutoringSessionRepo::has_later_individual(pool, student_id, session.starts_at).await? {
            continue;
        }
        let hours = match packages.available_hours(student_id).await {
            Ok(hours) => hours,
            Err(e) => {
                tracing::error!(student_id, error = %e, "Failed to load tutoring hours");
                continue;
            }
        };
        if !is_last_session(hours.remaining_for(&session.session_type)) {
            continue;
        }
        students.push(student_id);
        if let Some((_, user)) = load_student(pool, student_id).await? {
            names.push(format!("{} - {}", user.full_name(), format_mdy(session.starts_at)));
        }
    }

    if students.is_empty() {
        tracing::debug!("No students with a last session this week");
        return Ok(students);
    }

    for admin in &admins {
        if let Err(e) = ctx
            .notifier
            .create(
                NewNotification::new(types::LAST_MEETING)
                    .to_user(admin.id)
                    .args(json!({
                        "count": students.len(),
                        "date": format_mdy(now),
                        "students": names,
                    })),
            )
            .await
        {
            tracing::error!(admin_id = admin.id, error = %e, "Failed to send last meeting notice");
        }
    }

    tracing::info!(count = students.len(), "Notified admins of last sessions");
    Ok(students)
}
