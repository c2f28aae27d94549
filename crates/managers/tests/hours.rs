//! Counseling hour banks and tutoring package purchases.

mod common;

use assert_matches::assert_matches;
use chrono::{Duration, TimeZone, Utc};
use schoolnet_core::error::CoreError;
use schoolnet_core::hours::SESSION_TYPE_TEST_PREP;
use schoolnet_core::notification_types as types;
use schoolnet_db::models::counseling::CreateCounselorTimeEntry;
use schoolnet_db::models::tutoring::{
    CreateGroupTutoringSession, CreateStudentTutoringSession, CreateTutoringPackage,
};
use schoolnet_db::repositories::{
    CounselingHoursRepo, CounselorTimeEntryRepo, NotificationRepo, TutoringPackageRepo,
    TutoringSessionRepo,
};
use schoolnet_managers::{CounselingHoursManager, ManagerError, TutoringPackageManager};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Counseling hours
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_counseling_summary(pool: PgPool) {
    let (counselor_id, counselor_user) = common::counselor(&pool, "c@example.com", true).await;
    let family = common::family(&pool, "ada", Some(counselor_id)).await;
    let manager = CounselingHoursManager::new(pool.clone());

    manager
        .add_hours(family.student_id, 600, Some(50_000), None, None, Some(counselor_user))
        .await
        .unwrap();
    manager
        .add_hours(family.student_id, 60, None, Some("Bonus hour".into()), None, None)
        .await
        .unwrap();
    CounselorTimeEntryRepo::create(
        &pool,
        &CreateCounselorTimeEntry {
            counselor_id,
            student_id: Some(family.student_id),
            date: Some(Utc::now()),
            minutes: 90,
            category: "meeting".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    // Entries outside the bank do not use hours.
    CounselorTimeEntryRepo::create(
        &pool,
        &CreateCounselorTimeEntry {
            counselor_id,
            student_id: Some(family.student_id),
            date: Some(Utc::now()),
            minutes: 30,
            category: "other".to_string(),
            include_in_hours_bank: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let summary = manager.summary(family.student_id).await.unwrap();
    assert_eq!(summary.balance.total_minutes, 660);
    assert_eq!(summary.balance.used_minutes, 90);
    assert_eq!(summary.balance.remaining_minutes, 570);
    assert_eq!(summary.total_paid_cents, 50_000);

    let json = serde_json::to_value(summary).unwrap();
    assert_eq!(json["remaining_minutes"], 570);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_add_hours_rejects_non_positive(pool: PgPool) {
    let family = common::family(&pool, "ada", None).await;
    let manager = CounselingHoursManager::new(pool.clone());

    let err = manager
        .add_hours(family.student_id, 0, None, None, None, None)
        .await
        .unwrap_err();
    assert_matches!(err, ManagerError::Core(CoreError::Validation(_)));

    let err = manager
        .add_hours(family.student_id + 100, 60, None, None, None, None)
        .await
        .unwrap_err();
    assert_matches!(err, ManagerError::Core(CoreError::NotFound { .. }));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_counseling_package_for_grade_and_semester(pool: PgPool) {
    let family = common::family(&pool, "ada", None).await;
    let manager = CounselingHoursManager::new(pool.clone());
    // Fall 2024 for the class of 2026 is junior year, first semester.
    let now = Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap();

    CounselingHoursRepo::create_package(&pool, "Essentials", 600, Some(11), Some(2))
        .await
        .unwrap();
    let fall = CounselingHoursRepo::create_package(&pool, "Essentials", 480, Some(11), Some(1))
        .await
        .unwrap();

    let found = manager
        .counseling_package_for(family.student_id, "Essentials", now)
        .await
        .unwrap();
    assert_eq!(found.map(|p| p.id), Some(fall.id));

    let anyone = CounselingHoursRepo::create_package(&pool, "Essentials", 300, None, None)
        .await
        .unwrap();
    let found = manager
        .counseling_package_for(family.student_id, "Essentials", now)
        .await
        .unwrap();
    assert_eq!(found.map(|p| p.id), Some(anyone.id));

    assert!(manager
        .counseling_package_for(family.student_id, "Premium", now)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_counseling_package_needs_graduation_year(pool: PgPool) {
    let family = common::family(&pool, "ada", None).await;
    sqlx::query("UPDATE students SET graduation_year = NULL WHERE id = $1")
        .bind(family.student_id)
        .execute(&pool)
        .await
        .unwrap();
    CounselingHoursRepo::create_package(&pool, "Essentials", 480, Some(11), Some(1))
        .await
        .unwrap();

    let found = CounselingHoursManager::new(pool.clone())
        .counseling_package_for(family.student_id, "Essentials", Utc::now())
        .await
        .unwrap();
    assert!(found.is_none());
}

// ---------------------------------------------------------------------------
// Tutoring packages
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_purchase_and_unpurchase_package(pool: PgPool) {
    let (notifier, _) = common::notifier(&pool);
    let (tutor_id, _) = common::tutor(&pool, "t@example.com").await;
    let family = common::family(&pool, "ada", None).await;
    let other = common::family(&pool, "bea", None).await;
    let manager = TutoringPackageManager::new(notifier);

    let package = TutoringPackageRepo::create(
        &pool,
        &CreateTutoringPackage {
            title: "SAT Prep".to_string(),
            individual_test_prep_minutes: Some(600),
            group_test_prep_minutes: Some(300),
            individual_curriculum_minutes: None,
            price_cents: Some(150_000),
        },
    )
    .await
    .unwrap();
    let starts_at = Utc::now() + Duration::days(7);
    let group = TutoringSessionRepo::create_group(
        &pool,
        &CreateGroupTutoringSession {
            title: "SAT Bootcamp".to_string(),
            primary_tutor_id: Some(tutor_id),
            starts_at,
            ends_at: starts_at + Duration::minutes(120),
            charge_student_duration: Some(120),
        },
    )
    .await
    .unwrap();
    TutoringPackageRepo::attach_group_session(&pool, package.id, group.id)
        .await
        .unwrap();

    let purchase = manager
        .purchase_package(family.student_id, package.id, None, Some(family.parent_user), true)
        .await
        .unwrap();
    assert_eq!(purchase.price_paid_cents, 150_000);

    let at = Utc::now() - Duration::days(1);
    TutoringSessionRepo::create(
        &pool,
        &CreateStudentTutoringSession {
            student_id: Some(family.student_id),
            individual_session_tutor_id: Some(tutor_id),
            group_tutoring_session_id: None,
            session_type: Some(SESSION_TYPE_TEST_PREP.to_string()),
            starts_at: at,
            ends_at: at + Duration::minutes(60),
            duration_minutes: 60,
            is_tentative: Some(false),
        },
    )
    .await
    .unwrap();

    let hours = manager.available_hours(family.student_id).await.unwrap();
    assert_eq!(hours.total_group_test_prep, 300);
    assert_eq!(hours.group_test_prep, 180);
    assert_eq!(hours.individual_test_prep, 540);

    let sent = NotificationRepo::list_for_user_by_type(
        &pool,
        family.student_user,
        types::PACKAGE_PURCHASE_CONFIRMATION,
    )
    .await
    .unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].additional_args["title"], "SAT Prep");

    let err = manager
        .unpurchase_package(other.student_id, purchase.id, None)
        .await
        .unwrap_err();
    assert_matches!(err, ManagerError::Core(CoreError::Validation(_)));

    let reversed = manager
        .unpurchase_package(family.student_id, purchase.id, None)
        .await
        .unwrap();
    assert!(reversed.purchase_reversed.is_some());

    // The group session is cancelled, the individual session still counts.
    let hours = manager.available_hours(family.student_id).await.unwrap();
    assert_eq!(hours.total_group_test_prep, 0);
    assert_eq!(hours.group_test_prep, 0);
    assert_eq!(hours.individual_test_prep, -60);

    let err = manager
        .unpurchase_package(family.student_id, purchase.id, None)
        .await
        .unwrap_err();
    assert_matches!(err, ManagerError::Core(CoreError::Conflict(_)));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_second_purchase_keeps_group_sessions(pool: PgPool) {
    let (notifier, _) = common::notifier(&pool);
    let (tutor_id, _) = common::tutor(&pool, "t@example.com").await;
    let family = common::family(&pool, "ada", None).await;
    let manager = TutoringPackageManager::new(notifier);

    let package = TutoringPackageRepo::create(
        &pool,
        &CreateTutoringPackage {
            title: "Group only".to_string(),
            individual_test_prep_minutes: None,
            group_test_prep_minutes: Some(240),
            individual_curriculum_minutes: None,
            price_cents: Some(40_000),
        },
    )
    .await
    .unwrap();
    let starts_at = Utc::now() + Duration::days(3);
    let group = TutoringSessionRepo::create_group(
        &pool,
        &CreateGroupTutoringSession {
            title: "ACT Bootcamp".to_string(),
            primary_tutor_id: Some(tutor_id),
            starts_at,
            ends_at: starts_at + Duration::minutes(90),
            charge_student_duration: Some(90),
        },
    )
    .await
    .unwrap();
    TutoringPackageRepo::attach_group_session(&pool, package.id, group.id)
        .await
        .unwrap();

    let first = manager
        .purchase_package(family.student_id, package.id, Some(0), None, false)
        .await
        .unwrap();
    manager
        .purchase_package(family.student_id, package.id, None, None, false)
        .await
        .unwrap();
    assert_eq!(first.price_paid_cents, 0);

    manager
        .unpurchase_package(family.student_id, first.id, None)
        .await
        .unwrap();

    // Still enrolled once, still deducted.
    let hours = manager.available_hours(family.student_id).await.unwrap();
    assert_eq!(hours.total_group_test_prep, 240);
    assert_eq!(hours.group_test_prep, 150);
    assert!(NotificationRepo::list_for_user_by_type(
        &pool,
        family.student_user,
        types::PACKAGE_PURCHASE_CONFIRMATION,
    )
    .await
    .unwrap()
    .is_empty());
}
