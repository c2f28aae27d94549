//! Handlers for the `/auth` resource (login, accepting an invite).

use axum::extract::State;
use axum::Json;
use schoolnet_core::error::CoreError;
use schoolnet_db::models::user::{User, UserResponse};
use schoolnet_db::repositories::UserRepo;
use schoolnet_managers::NotificationManager;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::jwt::{generate_access_token, validate_invite_token};
use crate::auth::password::{hash_password, validate_password_strength, verify_password, MIN_PASSWORD_LENGTH};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Request body for `POST /auth/accept-invite`.
#[derive(Debug, Deserialize, Validate)]
pub struct AcceptInviteRequest {
    #[validate(length(min = 1))]
    pub token: String,
    pub password: String,
}

/// Successful authentication response.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
///
/// Authenticate with email and password. Pending users (who have not
/// accepted their invite) have no password and cannot log in.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    input.validate()?;

    let invalid = || {
        AppError::Core(CoreError::Unauthorized(
            "Invalid email or password".into(),
        ))
    };

    let user = UserRepo::find_by_email(&state.pool, &input.email)
        .await?
        .ok_or_else(invalid)?;

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    let Some(hash) = user.password_hash.as_deref() else {
        return Err(invalid());
    };
    let password_valid = verify_password(&input.password, hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        tracing::info!(user_id = user.id, "Failed login attempt");
        return Err(invalid());
    }

    tracing::info!(user_id = user.id, role = %user.role, "User logged in");
    Ok(Json(auth_response(&state, &user)?))
}

/// POST /api/v1/auth/accept-invite
///
/// Set a password using the token from an invite, then log the user in.
pub async fn accept_invite(
    State(state): State<AppState>,
    Json(input): Json<AcceptInviteRequest>,
) -> AppResult<Json<AuthResponse>> {
    input.validate()?;

    let user_id = validate_invite_token(&input.token, &state.config.jwt).ok_or_else(|| {
        AppError::Core(CoreError::Unauthorized(
            "Invalid or expired invite token".into(),
        ))
    })?;

    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(|e| AppError::Core(CoreError::Validation(e)))?;
    let hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = NotificationManager::new(state.notifier.clone())
        .accept_invite(user_id, &hash)
        .await?;

    Ok(Json(auth_response(&state, &user)?))
}

fn auth_response(state: &AppState, user: &User) -> AppResult<AuthResponse> {
    let access_token = generate_access_token(user.id, &user.role, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    Ok(AuthResponse {
        access_token,
        expires_in: state.config.jwt.access_token_expiry_mins * 60,
        user: UserResponse::from(user),
    })
}
