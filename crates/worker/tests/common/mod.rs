//! Fixtures shared by the worker job tests.
#![allow(dead_code)]

use std::sync::Arc;

use schoolnet_core::roles::{ROLE_ADMIN, ROLE_COUNSELOR, ROLE_PARENT, ROLE_STUDENT, ROLE_TUTOR};
use schoolnet_db::models::user::{CreateCounselor, CreateStudent, CreateUser};
use schoolnet_db::repositories::{CounselorRepo, ParentRepo, StudentRepo, TutorRepo, UserRepo};
use schoolnet_events::{Deliveries, EventBus, Notifier, NotifierConfig, RecordingDelivery};
use schoolnet_worker::JobContext;
use sqlx::PgPool;

/// A job context delivering into a recorder, with the weekend hold off.
pub fn context(pool: &PgPool) -> (JobContext, Arc<RecordingDelivery>) {
    let channel = Arc::new(RecordingDelivery::new());
    let notifier = Notifier::new(
        pool.clone(),
        Arc::new(EventBus::default()),
        Deliveries::single(channel.clone()),
        NotifierConfig::default(),
    );
    (JobContext::new(notifier, false), channel)
}

pub async fn user(pool: &PgPool, email: &str, role: &str, pending: bool) -> i64 {
    UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            first_name: email.split('@').next().unwrap_or_default().to_string(),
            last_name: "Test".to_string(),
            role: role.to_string(),
            timezone: Some("America/New_York".to_string()),
            password_hash: (!pending).then(|| "hash".to_string()),
        },
    )
    .await
    .unwrap()
    .id
}

pub async fn tutor(pool: &PgPool, email: &str) -> (i64, i64) {
    let user_id = user(pool, email, ROLE_TUTOR, false).await;
    (TutorRepo::create(pool, user_id, 4000).await.unwrap().id, user_id)
}

pub async fn admin(pool: &PgPool, email: &str) -> i64 {
    user(pool, email, ROLE_ADMIN, false).await
}

/// Returns (counselor_id, counselor_user_id).
pub async fn counselor(pool: &PgPool, email: &str) -> (i64, i64) {
    let user_id = user(pool, email, ROLE_COUNSELOR, false).await;
    let counselor = CounselorRepo::create(
        pool,
        &CreateCounselor {
            user_id,
            part_time: None,
            hourly_rate_cents: None,
            cc_on_meeting_notes: None,
        },
    )
    .await
    .unwrap();
    (counselor.id, user_id)
}

/// A student with a parent. Returns (student_id, student_user_id).
pub async fn student(pool: &PgPool, prefix: &str) -> (i64, i64) {
    enrolled_student(pool, prefix, None, true).await
}

/// A CAP student with a parent, optionally assigned to a counselor.
pub async fn enrolled_student(
    pool: &PgPool,
    prefix: &str,
    counselor_id: Option<i64>,
    has_access_to_cap: bool,
) -> (i64, i64) {
    let parent_user = user(pool, &format!("{prefix}-parent@example.com"), ROLE_PARENT, false).await;
    let parent = ParentRepo::create(pool, parent_user, None).await.unwrap();
    let student_user = user(pool, &format!("{prefix}@example.com"), ROLE_STUDENT, false).await;
    let student = StudentRepo::create(
        pool,
        &CreateStudent {
            user_id: student_user,
            parent_id: Some(parent.id),
            counselor_id,
            graduation_year: Some(2026),
            is_cap: Some(true),
            has_access_to_cap: Some(has_access_to_cap),
            counselor_pay_rate_cents: None,
        },
    )
    .await
    .unwrap();
    (student.id, student_user)
}

/// User id of the parent created alongside the student `prefix`.
pub async fn parent_user(pool: &PgPool, prefix: &str) -> i64 {
    UserRepo::find_by_email(pool, &format!("{prefix}-parent@example.com"))
        .await
        .unwrap()
        .unwrap()
        .id
}
