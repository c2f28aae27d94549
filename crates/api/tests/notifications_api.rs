//! Notification inbox and recipient settings over HTTP.

mod common;

use axum::http::StatusCode;
use common::{body_json, get_auth, post_auth, post_json_auth, put_json_auth, token_for};
use schoolnet_core::notification_types as types;
use schoolnet_core::roles::ROLE_STUDENT;
use schoolnet_db::repositories::NotificationRecipientRepo;
use schoolnet_events::{Deliveries, EventBus, NewNotification, Notifier, NotifierConfig};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

/// Create `count` invite notifications for a user and return their ids.
async fn seed(pool: &PgPool, user_id: i64, count: usize) -> Vec<i64> {
    let notifier = Notifier::new(
        pool.clone(),
        Arc::new(EventBus::default()),
        Deliveries::default(),
        NotifierConfig::default(),
    );
    let mut ids = Vec::new();
    for _ in 0..count {
        let created = notifier
            .create(
                NewNotification::new(types::INVITE)
                    .to_user(user_id)
                    .args(json!({ "first_name": "Ada" })),
            )
            .await
            .unwrap()
            .unwrap();
        ids.push(created.id);
    }
    ids
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_and_mark_read(pool: PgPool) {
    let user_id = common::user(&pool, "ada@example.com", ROLE_STUDENT).await;
    let ids = seed(&pool, user_id, 3).await;
    let other = common::user(&pool, "bo@example.com", ROLE_STUDENT).await;
    let (app, _) = common::build_test_app(pool);
    let token = token_for(user_id, ROLE_STUDENT);

    let response = get_auth(app.clone(), "/api/v1/notifications?limit=2", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 2);

    let response = get_auth(app.clone(), "/api/v1/notifications/unread-count", &token).await;
    assert_eq!(body_json(response).await["data"]["count"], 3);

    let uri = format!("/api/v1/notifications/{}/read", ids[0]);
    let response = post_auth(app.clone(), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    // Already read.
    let response = post_auth(app.clone(), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    // Somebody else's notification.
    let uri = format!("/api/v1/notifications/{}/read", ids[1]);
    let response = post_auth(app.clone(), &uri, &token_for(other, ROLE_STUDENT)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get_auth(
        app.clone(),
        "/api/v1/notifications?unread_only=true",
        &token,
    )
    .await;
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 2);

    let response = post_auth(app.clone(), "/api/v1/notifications/read-all", &token).await;
    assert_eq!(body_json(response).await["data"]["marked_read"], 2);

    let response = get_auth(app, "/api/v1/notifications/unread-count", &token).await;
    assert_eq!(body_json(response).await["data"]["count"], 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_recipient_settings(pool: PgPool) {
    let user_id = common::user(&pool, "ada@example.com", ROLE_STUDENT).await;
    let (app, _) = common::build_test_app(pool);
    let token = token_for(user_id, ROLE_STUDENT);

    let response = get_auth(app.clone(), "/api/v1/notifications/recipient", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["user_id"], user_id);
    assert!(json["data"].get("phone_number_verification_code").is_none());

    let response = put_json_auth(
        app.clone(),
        "/api/v1/notifications/recipient",
        json!({ "receive_texts": false }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["receive_texts"], false);

    let response = put_json_auth(
        app,
        "/api/v1/notifications/recipient",
        json!({ "unsubscribed_email_notifications": ["no_such_type"] }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_phone_verification(pool: PgPool) {
    let user_id = common::user(&pool, "ada@example.com", ROLE_STUDENT).await;
    let (app, channel) = common::build_test_app(pool.clone());
    let token = token_for(user_id, ROLE_STUDENT);

    // Nothing to verify yet.
    let response = post_auth(app.clone(), "/api/v1/notifications/recipient/verify", &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        app.clone(),
        "/api/v1/notifications/recipient/phone",
        json!({ "phone_number": "12" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        app.clone(),
        "/api/v1/notifications/recipient/phone",
        json!({ "phone_number": "(555) 555-0100" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["phone_number"], "15555550100");

    let response = post_auth(app.clone(), "/api/v1/notifications/recipient/verify", &token).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let texts = channel.texts();
    assert_eq!(texts.len(), 1);
    assert_eq!(texts[0].to, "+15555550100");

    let response = post_json_auth(
        app.clone(),
        "/api/v1/notifications/recipient/confirm",
        json!({ "code": "0000" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let code = NotificationRecipientRepo::find_by_user_id(&pool, user_id)
        .await
        .unwrap()
        .unwrap()
        .phone_number_verification_code;
    assert!(texts[0].body.contains(&code));

    let response = post_json_auth(
        app,
        "/api/v1/notifications/recipient/confirm",
        json!({ "code": code }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["data"]["phone_number_confirmed"].is_string());
}
