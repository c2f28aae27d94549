//! Student-scoped endpoints: who may see hours, and the counselor's
//! meeting and task flows.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{body_json, get_auth, post_auth, post_json_auth, token_for};
use schoolnet_core::roles::{ROLE_ADMIN, ROLE_COUNSELOR, ROLE_PARENT, ROLE_STUDENT, ROLE_TUTOR};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_counseling_hours_visibility(pool: PgPool) {
    let admin = common::user(&pool, "boss@example.com", ROLE_ADMIN).await;
    let (counselor_id, counselor_user) = common::counselor(&pool, "cora@example.com").await;
    let (_, stranger_counselor) = common::counselor(&pool, "otto@example.com").await;
    let (_, tutor_user) = common::tutor(&pool, "tia@example.com").await;
    let ada = common::student(&pool, "ada", Some(counselor_id)).await;
    let bo = common::student(&pool, "bo", None).await;
    let (app, _) = common::build_test_app(pool);

    let uri = format!("/api/v1/students/{}/counseling-hours", ada.student_id);

    let response = post_json_auth(
        app.clone(),
        &uri,
        json!({ "minutes": 0 }),
        &token_for(admin, ROLE_ADMIN),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        app.clone(),
        &uri,
        json!({ "minutes": 120, "amount_paid_cents": 30000, "note": "Starter" }),
        &token_for(admin, ROLE_ADMIN),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_json_auth(
        app.clone(),
        &uri,
        json!({ "minutes": 60 }),
        &token_for(counselor_user, ROLE_COUNSELOR),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    for (user_id, role) in [
        (ada.user_id, ROLE_STUDENT),
        (ada.parent_user_id, ROLE_PARENT),
        (counselor_user, ROLE_COUNSELOR),
        (admin, ROLE_ADMIN),
    ] {
        let response = get_auth(app.clone(), &uri, &token_for(user_id, role)).await;
        assert_eq!(response.status(), StatusCode::OK, "{role} should see the hours");
        assert_eq!(body_json(response).await["data"]["total_paid_cents"], 30000);
    }

    for (user_id, role) in [
        (bo.user_id, ROLE_STUDENT),
        (bo.parent_user_id, ROLE_PARENT),
        (stranger_counselor, ROLE_COUNSELOR),
        (tutor_user, ROLE_TUTOR),
    ] {
        let response = get_auth(app.clone(), &uri, &token_for(user_id, role)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{role} should not see the hours");
    }

    let response = get_auth(
        app,
        "/api/v1/students/999999/counseling-hours",
        &token_for(admin, ROLE_ADMIN),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_tutoring_hours_start_empty(pool: PgPool) {
    let ada = common::student(&pool, "ada", None).await;
    let (_, tutor_user) = common::tutor(&pool, "tia@example.com").await;
    let (app, _) = common::build_test_app(pool);
    let uri = format!("/api/v1/students/{}/tutoring-hours", ada.student_id);

    let response = get_auth(app.clone(), &uri, &token_for(ada.parent_user_id, ROLE_PARENT)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["individual_test_prep"], 0);
    assert_eq!(json["data"]["total_individual_curriculum"], 0);

    // A tutor who never worked with the student is turned away.
    let response = get_auth(app, &uri, &token_for(tutor_user, ROLE_TUTOR)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_counselor_meeting_flow(pool: PgPool) {
    let (counselor_id, counselor_user) = common::counselor(&pool, "cora@example.com").await;
    let (_, stranger) = common::counselor(&pool, "otto@example.com").await;
    let ada = common::student(&pool, "ada", Some(counselor_id)).await;
    let (app, channel) = common::build_test_app(pool);
    let token = token_for(counselor_user, ROLE_COUNSELOR);

    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/students/{}/counselor-meetings", ada.student_id),
        json!({ "title": "Essay kickoff" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let meeting_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let start = Utc::now() + Duration::days(3);
    let schedule = format!("/api/v1/counselor-meetings/{meeting_id}/schedule");
    let response = post_json_auth(
        app.clone(),
        &schedule,
        json!({ "starts_at": start, "ends_at": start - Duration::hours(1) }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let times = json!({ "starts_at": start, "ends_at": start + Duration::hours(1) });
    let response = post_json_auth(
        app.clone(),
        &schedule,
        times.clone(),
        &token_for(stranger, ROLE_COUNSELOR),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(app.clone(), &schedule, times.clone(), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["data"]["starts_at"].is_string());
    assert!(!channel.emails_to("ada@example.com").is_empty());

    // Scheduling twice conflicts; rescheduling is the way to move it.
    let response = post_json_auth(app.clone(), &schedule, times, &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/counselor-meetings/{meeting_id}/send-notes"),
        json!({ "subject": "Notes", "note": "Start the draft" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_auth(
        app,
        &format!("/api/v1/counselor-meetings/{meeting_id}/cancel"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["data"]["cancelled"].is_string());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_task_create_and_complete(pool: PgPool) {
    let (counselor_id, counselor_user) = common::counselor(&pool, "cora@example.com").await;
    let ada = common::student(&pool, "ada", Some(counselor_id)).await;
    let bo = common::student(&pool, "bo", None).await;
    let (app, _) = common::build_test_app(pool);
    let token = token_for(counselor_user, ROLE_COUNSELOR);

    // Students cannot assign tasks.
    let response = post_json_auth(
        app.clone(),
        "/api/v1/tasks",
        json!({ "for_user_id": ada.user_id, "title": "Draft essay" }),
        &token_for(ada.user_id, ROLE_STUDENT),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Nor can a counselor assign to a student who is not theirs.
    let response = post_json_auth(
        app.clone(),
        "/api/v1/tasks",
        json!({ "for_user_id": bo.user_id, "title": "Draft essay" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(
        app.clone(),
        "/api/v1/tasks",
        json!({ "for_user_id": ada.user_id, "title": "   " }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        app.clone(),
        "/api/v1/tasks",
        json!({
            "for_user_id": ada.user_id,
            "title": "Draft essay",
            "due": Utc::now() + Duration::days(7),
            "notify": false,
        }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let task_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let student_token = token_for(ada.user_id, ROLE_STUDENT);
    let response = get_auth(app.clone(), "/api/v1/tasks", &student_token).await;
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 1);

    let complete = format!("/api/v1/tasks/{task_id}/complete");
    let response = post_auth(app.clone(), &complete, &token_for(bo.user_id, ROLE_STUDENT)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(app.clone(), &complete, json!({ "notify": false }), &student_token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["data"]["completed"].is_string());

    let response = post_auth(app, &complete, &student_token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
