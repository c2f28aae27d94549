//! Fixtures shared by the manager integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use schoolnet_core::roles::{ROLE_COUNSELOR, ROLE_PARENT, ROLE_STUDENT, ROLE_TUTOR};
use schoolnet_db::models::user::{CreateCounselor, CreateStudent, CreateUser};
use schoolnet_db::repositories::{
    CounselorRepo, ParentRepo, StudentRepo, TutorRepo, UserRepo,
};
use schoolnet_events::{Deliveries, EventBus, Notifier, NotifierConfig, RecordingDelivery};
use sqlx::PgPool;

pub fn notifier(pool: &PgPool) -> (Notifier, Arc<RecordingDelivery>) {
    let channel = Arc::new(RecordingDelivery::new());
    let notifier = Notifier::new(
        pool.clone(),
        Arc::new(EventBus::default()),
        Deliveries::single(channel.clone()),
        NotifierConfig::default(),
    );
    (notifier, channel)
}

pub async fn user(pool: &PgPool, email: &str, role: &str) -> i64 {
    UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            first_name: email.split('@').next().unwrap_or_default().to_string(),
            last_name: "Test".to_string(),
            role: role.to_string(),
            timezone: Some("America/New_York".to_string()),
            password_hash: Some("hash".to_string()),
        },
    )
    .await
    .unwrap()
    .id
}

/// A counselor. Returns (counselor_id, user_id).
pub async fn counselor(pool: &PgPool, email: &str, part_time: bool) -> (i64, i64) {
    let user_id = user(pool, email, ROLE_COUNSELOR).await;
    let counselor = CounselorRepo::create(
        pool,
        &CreateCounselor {
            user_id,
            part_time: Some(part_time),
            hourly_rate_cents: Some(5000),
            cc_on_meeting_notes: Some(true),
        },
    )
    .await
    .unwrap();
    (counselor.id, user_id)
}

/// A tutor paid 4000 cents an hour. Returns (tutor_id, user_id).
pub async fn tutor(pool: &PgPool, email: &str) -> (i64, i64) {
    let user_id = user(pool, email, ROLE_TUTOR).await;
    (TutorRepo::create(pool, user_id, 4000).await.unwrap().id, user_id)
}

/// A CAP student with platform access, a parent and an optional counselor.
pub struct Family {
    pub student_id: i64,
    pub student_user: i64,
    pub parent_user: i64,
}

pub async fn family(pool: &PgPool, prefix: &str, counselor_id: Option<i64>) -> Family {
    let parent_user = user(pool, &format!("{prefix}-parent@example.com"), ROLE_PARENT).await;
    let parent = ParentRepo::create(pool, parent_user, None).await.unwrap();
    let student_user = user(pool, &format!("{prefix}@example.com"), ROLE_STUDENT).await;
    let student = StudentRepo::create(
        pool,
        &CreateStudent {
            user_id: student_user,
            parent_id: Some(parent.id),
            counselor_id,
            graduation_year: Some(2026),
            is_cap: Some(true),
            has_access_to_cap: Some(true),
            counselor_pay_rate_cents: None,
        },
    )
    .await
    .unwrap();
    Family {
        student_id: student.id,
        student_user,
        parent_user,
    }
}
