//! Handlers for user accounts and invitations.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use schoolnet_core::error::CoreError;
use schoolnet_core::roles::validate_role;
use schoolnet_core::types::DbId;
use schoolnet_db::models::user::{CreateUser, UserResponse};
use schoolnet_db::repositories::UserRepo;
use schoolnet_managers::NotificationManager;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::jwt::generate_invite_token;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /users`. The user is created pending and invited.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub last_name: String,
    pub role: String,
    pub timezone: Option<String>,
}

/// An invite that was just sent, with the token the user accepts it with.
#[derive(Debug, Serialize)]
pub struct InviteResponse {
    pub user: UserResponse,
    pub invite_token: String,
}

/// GET /api/v1/users/me
pub async fn me(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::not_found("User", auth.user_id)))?;
    Ok(Json(DataResponse {
        data: UserResponse::from(&user),
    }))
}

/// POST /api/v1/users
///
/// Create a pending user and send their invite. Returns 409 when the email
/// is already taken.
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<InviteResponse>>)> {
    input.validate()?;
    validate_role(&input.role).map_err(|e| AppError::Core(CoreError::Validation(e)))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            email: input.email.trim().to_lowercase(),
            first_name: input.first_name,
            last_name: input.last_name,
            role: input.role,
            timezone: input.timezone,
            password_hash: None,
        },
    )
    .await?;
    tracing::info!(user_id = user.id, role = %user.role, "User created");

    let invite = invite(&state, user.id, admin.user_id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: invite })))
}

/// POST /api/v1/users/{id}/invite
///
/// Send (or resend) the invite of a pending user. Returns 409 once the user
/// has accepted.
pub async fn send_invite(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
) -> AppResult<Json<DataResponse<InviteResponse>>> {
    let invite = invite(&state, user_id, admin.user_id).await?;
    Ok(Json(DataResponse { data: invite }))
}

async fn invite(state: &AppState, user_id: DbId, admin_id: DbId) -> AppResult<InviteResponse> {
    NotificationManager::new(state.notifier.clone())
        .send_invite(user_id, Some(admin_id))
        .await?;
    let user = UserRepo::find_by_id(&state.pool, user_id)
        .await?
        .ok_or(AppError::Core(CoreError::not_found("User", user_id)))?;
    let invite_token = generate_invite_token(user.id, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;
    Ok(InviteResponse {
        user: UserResponse::from(&user),
        invite_token,
    })
}
