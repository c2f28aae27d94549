//! Handlers for chat conversations. Only participants may post or read.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use schoolnet_core::error::CoreError;
use schoolnet_core::types::DbId;
use schoolnet_db::models::conversation::{ConversationParticipant, Message, PostMessage};
use schoolnet_db::repositories::UserRepo;
use schoolnet_managers::ConversationManager;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/conversations/{id}/messages
pub async fn post_message(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<DbId>,
    Json(input): Json<PostMessage>,
) -> AppResult<(StatusCode, Json<DataResponse<Message>>)> {
    let author = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::Unauthorized(
            "User no longer exists".into(),
        )))?;
    let message = ConversationManager::new(state.pool.clone())
        .post_message(conversation_id, &author, &input.body)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: message })))
}

/// POST /api/v1/conversations/{id}/read
///
/// Mark everything in the conversation read for the caller, which also
/// stops unread message emails about it.
pub async fn mark_read(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<DbId>,
) -> AppResult<Json<DataResponse<ConversationParticipant>>> {
    let participant = ConversationManager::new(state.pool.clone())
        .mark_read(conversation_id, auth.user_id)
        .await?;
    Ok(Json(DataResponse { data: participant }))
}
