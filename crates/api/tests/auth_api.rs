//! HTTP-level tests for login, invitations and role enforcement.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, get_auth, post_auth, post_json, post_json_auth, token_for, PASSWORD};
use schoolnet_core::notification_types as types;
use schoolnet_core::roles::{ROLE_ADMIN, ROLE_STUDENT};
use schoolnet_db::models::user::UpdateUser;
use schoolnet_db::repositories::{NotificationRepo, UserRepo};
use serde_json::json;
use sqlx::PgPool;

async fn login(app: axum::Router, email: &str, password: &str) -> axum::response::Response {
    post_json(
        app,
        "/api/v1/auth/login",
        json!({ "email": email, "password": password }),
    )
    .await
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_login_success(pool: PgPool) {
    let user_id = common::user(&pool, "ada@example.com", ROLE_STUDENT).await;
    let (app, _) = common::build_test_app(pool);

    let response = login(app.clone(), "Ada@Example.com", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    assert!(json["access_token"].is_string());
    assert_eq!(json["expires_in"], 15 * 60);
    assert_eq!(json["user"]["id"], user_id);
    assert_eq!(json["user"]["role"], "student");
    assert!(json["user"].get("password_hash").is_none());

    let token = json["access_token"].as_str().unwrap();
    let me = get_auth(app, "/api/v1/users/me", token).await;
    assert_eq!(me.status(), StatusCode::OK);
    assert_eq!(body_json(me).await["data"]["email"], "ada@example.com");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_login_wrong_password(pool: PgPool) {
    common::user(&pool, "ada@example.com", ROLE_STUDENT).await;
    let (app, _) = common::build_test_app(pool);

    let response = login(app, "ada@example.com", "not-the-password").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_login_unknown_email(pool: PgPool) {
    let (app, _) = common::build_test_app(pool);

    let response = login(app, "ghost@example.com", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_login_malformed_email_is_rejected(pool: PgPool) {
    let (app, _) = common::build_test_app(pool);

    let response = login(app, "not-an-email", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_login_inactive_user(pool: PgPool) {
    let user_id = common::user(&pool, "ada@example.com", ROLE_STUDENT).await;
    UserRepo::update(
        &pool,
        user_id,
        &UpdateUser {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let (app, _) = common::build_test_app(pool);

    let response = login(app, "ada@example.com", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Bearer tokens and roles
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_missing_and_garbage_tokens_are_401(pool: PgPool) {
    let (app, _) = common::build_test_app(pool);

    let response = get(app.clone(), "/api/v1/notifications").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get_auth(app, "/api/v1/notifications", "not-a-jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_non_admin_cannot_create_users(pool: PgPool) {
    let student = common::user(&pool, "ada@example.com", ROLE_STUDENT).await;
    let (app, _) = common::build_test_app(pool);

    let response = post_json_auth(
        app,
        "/api/v1/users",
        json!({ "email": "new@example.com", "first_name": "New", "role": "tutor" }),
        &token_for(student, ROLE_STUDENT),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Invitations
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_invite_and_accept(pool: PgPool) {
    let admin = common::user(&pool, "boss@example.com", ROLE_ADMIN).await;
    let (app, channel) = common::build_test_app(pool.clone());
    let admin_token = token_for(admin, ROLE_ADMIN);

    let response = post_json_auth(
        app.clone(),
        "/api/v1/users",
        json!({ "email": "New@Example.com", "first_name": "Nia", "last_name": "Okafor", "role": "tutor" }),
        &admin_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let new_id = json["data"]["user"]["id"].as_i64().unwrap();
    let invite_token = json["data"]["invite_token"].as_str().unwrap().to_string();
    assert_eq!(json["data"]["user"]["email"], "new@example.com");
    assert_eq!(channel.emails_to("new@example.com").len(), 1);

    // A pending user cannot log in yet.
    let response = login(app.clone(), "new@example.com", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The invite token is not an access token.
    let response = get_auth(app.clone(), "/api/v1/users/me", &invite_token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_json(
        app.clone(),
        "/api/v1/auth/accept-invite",
        json!({ "token": invite_token, "password": "short" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        app.clone(),
        "/api/v1/auth/accept-invite",
        json!({ "token": invite_token, "password": PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["user"]["id"], new_id);
    assert!(json["user"]["accepted_invite"].is_string());

    let notices = NotificationRepo::list_for_user_by_type(&pool, admin, types::USER_ACCEPTED_INVITE)
        .await
        .unwrap();
    assert_eq!(notices.len(), 1);

    let response = login(app.clone(), "new@example.com", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Accepting twice, or re-inviting an accepted user, conflicts.
    let response = post_json(
        app.clone(),
        "/api/v1/auth/accept-invite",
        json!({ "token": invite_token, "password": PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = post_auth(app, &format!("/api/v1/users/{new_id}/invite"), &admin_token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_email_conflicts(pool: PgPool) {
    let admin = common::user(&pool, "boss@example.com", ROLE_ADMIN).await;
    common::user(&pool, "taken@example.com", ROLE_STUDENT).await;
    let (app, _) = common::build_test_app(pool);

    let response = post_json_auth(
        app,
        "/api/v1/users",
        json!({ "email": "taken@example.com", "first_name": "Dup", "role": "student" }),
        &token_for(admin, ROLE_ADMIN),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_access_token_cannot_accept_invite(pool: PgPool) {
    let user_id = common::user(&pool, "ada@example.com", ROLE_STUDENT).await;
    let (app, _) = common::build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/auth/accept-invite",
        json!({ "token": token_for(user_id, ROLE_STUDENT), "password": PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
