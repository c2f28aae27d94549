//! Handlers for the `/notifications` resource.
//!
//! All endpoints require authentication via [`AuthUser`] and act on the
//! caller's own notifications and recipient settings.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use schoolnet_core::error::CoreError;
use schoolnet_core::types::DbId;
use schoolnet_db::models::notification::NotificationRecipient;
use schoolnet_db::repositories::NotificationRepo;
use schoolnet_managers::{NotificationManager, SubscriptionUpdate};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::NotificationListParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /notifications/recipient/phone`.
#[derive(Debug, Deserialize)]
pub struct PhoneRequest {
    /// `None` or an empty string clears the number.
    pub phone_number: Option<String>,
}

/// Request body for `POST /notifications/recipient/confirm`.
#[derive(Debug, Deserialize, Validate)]
pub struct ConfirmPhoneRequest {
    #[validate(length(min = 1, max = 16))]
    pub code: String,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// GET /api/v1/notifications
pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<NotificationListParams>,
) -> AppResult<Json<serde_json::Value>> {
    let page = params.pagination();
    let notifications = NotificationRepo::list_for_user(
        &state.pool,
        auth.user_id,
        params.unread_only,
        page.limit(),
        page.offset(),
    )
    .await?;

    Ok(Json(serde_json::json!({ "data": notifications })))
}

/// POST /api/v1/notifications/{id}/read
///
/// Returns 204 on success, or 404 if the notification is not the caller's
/// or was already read.
pub async fn mark_read(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(notification_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let found = NotificationRepo::mark_read(&state.pool, notification_id, auth.user_id).await?;

    if !found {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Notification",
            id: notification_id,
        }));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/notifications/read-all
pub async fn mark_all_read(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let count = NotificationRepo::mark_all_read(&state.pool, auth.user_id).await?;

    Ok(Json(serde_json::json!({
        "data": { "marked_read": count }
    })))
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let count = NotificationRepo::unread_count(&state.pool, auth.user_id).await?;

    Ok(Json(serde_json::json!({
        "data": { "count": count }
    })))
}

// ---------------------------------------------------------------------------
// Recipient settings
// ---------------------------------------------------------------------------

/// GET /api/v1/notifications/recipient
pub async fn get_recipient(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<NotificationRecipient>>> {
    let recipient = manager(&state).recipient(auth.user_id).await?;
    Ok(Json(DataResponse { data: recipient }))
}

/// PUT /api/v1/notifications/recipient
///
/// Update channel switches and per-type opt-outs. Unknown notification
/// types are rejected with 400.
pub async fn update_recipient(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SubscriptionUpdate>,
) -> AppResult<Json<DataResponse<NotificationRecipient>>> {
    let recipient = manager(&state)
        .update_subscriptions(auth.user_id, input)
        .await?;
    Ok(Json(DataResponse { data: recipient }))
}

/// POST /api/v1/notifications/recipient/phone
///
/// Changing the number clears its confirmation.
pub async fn set_phone(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<PhoneRequest>,
) -> AppResult<Json<DataResponse<NotificationRecipient>>> {
    let recipient = manager(&state)
        .set_phone_number(auth.user_id, input.phone_number.as_deref())
        .await?;
    Ok(Json(DataResponse { data: recipient }))
}

/// POST /api/v1/notifications/recipient/verify
///
/// Text a fresh verification code to the caller's phone.
pub async fn send_verification(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    manager(&state).send_verification(auth.user_id).await?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /api/v1/notifications/recipient/confirm
pub async fn confirm_phone(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ConfirmPhoneRequest>,
) -> AppResult<Json<DataResponse<NotificationRecipient>>> {
    input.validate()?;
    let recipient = manager(&state)
        .confirm_phone(auth.user_id, input.code.trim())
        .await?;
    Ok(Json(DataResponse { data: recipient }))
}

fn manager(state: &AppState) -> NotificationManager {
    NotificationManager::new(state.notifier.clone())
}
