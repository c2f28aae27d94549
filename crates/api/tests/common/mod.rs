//! Shared fixtures and request helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use schoolnet_api::auth::jwt::{generate_access_token, JwtConfig};
use schoolnet_api::auth::password::hash_password;
use schoolnet_api::config::ServerConfig;
use schoolnet_api::router::build_app_router;
use schoolnet_api::state::AppState;
use schoolnet_core::roles::{ROLE_COUNSELOR, ROLE_PARENT, ROLE_STUDENT, ROLE_TUTOR};
use schoolnet_db::models::user::{CreateCounselor, CreateStudent, CreateUser};
use schoolnet_db::repositories::{CounselorRepo, ParentRepo, StudentRepo, TutorRepo, UserRepo};
use schoolnet_events::{Deliveries, EventBus, Notifier, NotifierConfig, RecordingDelivery};

pub const PASSWORD: &str = "correct-horse-battery";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
            invite_token_expiry_days: 30,
        },
    }
}

/// Build the full application router, delivering notifications into the
/// returned recorder.
pub fn build_test_app(pool: PgPool) -> (Router, Arc<RecordingDelivery>) {
    let config = test_config();
    let channel = Arc::new(RecordingDelivery::new());
    let notifier = Notifier::new(
        pool.clone(),
        Arc::new(EventBus::default()),
        Deliveries::single(channel.clone()),
        NotifierConfig::default(),
    );
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        notifier,
    };
    (build_app_router(state, &config), channel)
}

/// A bearer token for `user_id`, signed with the test secret.
pub fn token_for(user_id: i64, role: &str) -> String {
    generate_access_token(user_id, role, &test_config().jwt).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Create an active user whose password is [`PASSWORD`].
pub async fn user(pool: &PgPool, email: &str, role: &str) -> i64 {
    UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            first_name: email.split('@').next().unwrap_or_default().to_string(),
            last_name: "Test".to_string(),
            role: role.to_string(),
            timezone: Some("America/New_York".to_string()),
            password_hash: Some(hash_password(PASSWORD).unwrap()),
        },
    )
    .await
    .unwrap()
    .id
}

/// Returns (counselor_id, user_id).
pub async fn counselor(pool: &PgPool, email: &str) -> (i64, i64) {
    let user_id = user(pool, email, ROLE_COUNSELOR).await;
    let counselor = CounselorRepo::create(
        pool,
        &CreateCounselor {
            user_id,
            part_time: Some(true),
            hourly_rate_cents: Some(6000),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    (counselor.id, user_id)
}

/// Returns (tutor_id, user_id).
pub async fn tutor(pool: &PgPool, email: &str) -> (i64, i64) {
    let user_id = user(pool, email, ROLE_TUTOR).await;
    (TutorRepo::create(pool, user_id, 4000).await.unwrap().id, user_id)
}

pub struct StudentFixture {
    pub student_id: i64,
    pub user_id: i64,
    pub parent_user_id: i64,
}

/// A student with a parent and, optionally, a counselor.
pub async fn student(pool: &PgPool, prefix: &str, counselor_id: Option<i64>) -> StudentFixture {
    let parent_user_id = user(pool, &format!("{prefix}-parent@example.com"), ROLE_PARENT).await;
    let parent = ParentRepo::create(pool, parent_user_id, None).await.unwrap();
    let user_id = user(pool, &format!("{prefix}@example.com"), ROLE_STUDENT).await;
    let student = StudentRepo::create(
        pool,
        &CreateStudent {
            user_id,
            parent_id: Some(parent.id),
            counselor_id,
            graduation_year: Some(2027),
            is_cap: Some(true),
            has_access_to_cap: Some(true),
            counselor_pay_rate_cents: None,
        },
    )
    .await
    .unwrap();
    StudentFixture {
        student_id: student.id,
        user_id,
        parent_user_id,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

/// POST with no body.
pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::POST, uri, Some(token), None).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
