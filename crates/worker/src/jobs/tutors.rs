//! Tutor jobs: the daily schedule and biweekly time cards.

use std::collections::HashSet;

use chrono::Duration;
use schoolnet_core::format::{format_datetime, format_mdy};
use schoolnet_core::notification_types as types;
use schoolnet_core::reminders::DAILY_DIGEST_MIN_GAP_HOURS;
use schoolnet_core::time_cards::{tutor_pay_period, TIME_CARD_BUFFER_DAYS};
use schoolnet_core::types::{DbId, Timestamp};
use schoolnet_db::models::user::{Tutor, User};
use schoolnet_db::repositories::{
    NotificationRepo, TutorRepo, TutorTimeCardRepo, TutoringSessionRepo,
};
use schoolnet_events::NewNotification;
use schoolnet_managers::TutorTimeCardManager;
use serde_json::json;

use super::{load_student, load_user, JobContext, JobResult};

const DAILY_DIGEST_HOURS: i64 = 24;

// ---------------------------------------------------------------------------
// Daily digest
// ---------------------------------------------------------------------------

/// Send each tutor their sessions for the next day. Tutors with nothing
/// scheduled, or that got a digest in the last 23 hours, get nothing.
/// Returns tutor ids.
pub async fn tutor_daily_digest(ctx: &JobContext, now: Timestamp) -> JobResult<Vec<DbId>> {
    let pool = ctx.pool();
    let recently: HashSet<DbId> = NotificationRepo::user_ids_notified_since(
        pool,
        types::TUTOR_DAILY_DIGEST,
        now - Duration::hours(DAILY_DIGEST_MIN_GAP_HOURS),
    )
    .await?
    .into_iter()
    .collect();
    let mut sent = Vec::new();

    for tutor in TutorRepo::list_active(pool).await? {
        if recently.contains(&tutor.user_id) {
            continue;
        }
        let Some(user) = load_user(pool, tutor.user_id).await? else {
            continue;
        };
        match digest_for(ctx, &tutor, &user, now).await {
            Ok(true) => sent.push(tutor.id),
            Ok(false) => {}
            Err(e) => tracing::error!(tutor_id = tutor.id, error = %e, "Failed to send tutor digest"),
        }
    }

    if sent.is_empty() {
        tracing::debug!("No tutor digests to send");
    } else {
        tracing::info!(count = sent.len(), "Sent tutor daily digests");
    }
    Ok(sent)
}

async fn digest_for(ctx: &JobContext, tutor: &Tutor, user: &User, now: Timestamp) -> JobResult<bool> {
    let pool = ctx.pool();
    let end = now + Duration::hours(DAILY_DIGEST_HOURS);

    let mut lines: Vec<(Timestamp, String)> = Vec::new();
    for session in TutoringSessionRepo::list_upcoming_for_tutor(pool, tutor.id, now, end).await? {
        let student = match session.student_id {
            Some(id) => load_student(pool, id).await?.map(|(_, u)| u.full_name()),
            None => None,
        };
        let when = format_datetime(session.starts_at, &user.timezone);
        lines.push((
            session.starts_at,
            format!("{} - {when}", student.unwrap_or_default()),
        ));
    }
    for group in TutoringSessionRepo::list_group_for_tutor(pool, tutor.id, now, end).await? {
        let when = format_datetime(group.starts_at, &user.timezone);
        lines.push((group.starts_at, format!("{} - {when}", group.title)));
    }
    if lines.is_empty() {
        return Ok(false);
    }
    lines.sort_by_key(|(start, _)| *start);
    let sessions: Vec<String> = lines.into_iter().map(|(_, line)| line).collect();

    ctx.notifier
        .create(
            NewNotification::new(types::TUTOR_DAILY_DIGEST)
                .to_user(user.id)
                .related("tutor", tutor.id)
                .args(json!({"count": sessions.len(), "sessions": sessions})),
        )
        .await?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Time cards
// ---------------------------------------------------------------------------

/// Create time cards for the pay period that just closed, for every active
/// tutor without a recent card, and tell each tutor. Returns card ids.
pub async fn tutor_time_cards(ctx: &JobContext, now: Timestamp) -> JobResult<Vec<DbId>> {
    let pool = ctx.pool();
    let tutor_ids =
        TutorTimeCardRepo::tutors_without_card_since(pool, now - Duration::days(TIME_CARD_BUFFER_DAYS))
            .await?;
    if tutor_ids.is_empty() {
        tracing::debug!("All tutors have a current time card");
        return Ok(Vec::new());
    }

    let period = tutor_pay_period(now);
    let created = TutorTimeCardManager::new(pool.clone())
        .create_many(&tutor_ids, period, true)
        .await?;

    let mut card_ids = Vec::with_capacity(created.created.len());
    for card in &created.created {
        card_ids.push(card.id);
        let tutor_user = match TutorRepo::find_by_id(pool, card.tutor_id).await? {
            Some(tutor) => load_user(pool, tutor.user_id).await?,
            None => None,
        };
        let Some(user) = tutor_user else {
            continue;
        };
        if let Err(e) = ctx
            .notifier
            .create(
                NewNotification::new(types::TUTOR_TIME_CARD)
                    .to_user(user.id)
                    .related("tutor_time_card", card.id)
                    .args(json!({
                        "start": format_mdy(card.starts_at),
                        "end": format_mdy(card.ends_at),
                    })),
            )
            .await
        {
            tracing::error!(time_card_id = card.id, error = %e, "Failed to send time card notice");
        }
    }

    tracing::info!(
        created = card_ids.len(),
        skipped = created.skipped.len(),
        "Created tutor time cards"
    );
    Ok(card_ids)
}
