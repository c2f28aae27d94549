//! Handlers for counselor and tutor time cards.
//!
//! Administrators create and list every card. Counselors and tutors see and
//! approve only their own; approval by the worker first, then the
//! administrator.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use schoolnet_core::error::CoreError;
use schoolnet_core::roles::{ROLE_COUNSELOR, ROLE_TUTOR};
use schoolnet_core::types::{DbId, Timestamp};
use schoolnet_db::models::counseling::CounselorTimeCard;
use schoolnet_db::models::tutoring::TutorTimeCard;
use schoolnet_db::repositories::{CounselorTimeCardRepo, TutorTimeCardRepo};
use schoolnet_managers::{CounselorTimeCardManager, TutorTimeCardManager};
use serde::Deserialize;

use super::access::{counselor_profile, forbidden, tutor_profile};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::query::CounselorFilter;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /counselor-time-cards`.
#[derive(Debug, Deserialize)]
pub struct CreateCounselorTimeCardRequest {
    pub counselor_id: DbId,
    pub start: Timestamp,
    pub end: Timestamp,
}

/// Request body for `POST /tutor-time-cards`.
#[derive(Debug, Deserialize)]
pub struct CreateTutorTimeCardRequest {
    pub tutor_id: DbId,
    pub start: Timestamp,
    pub end: Timestamp,
    /// Add line items for the tutor's sessions in the period (default: true).
    pub include_sessions: Option<bool>,
}

/// Request body for the approve endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ApproveRequest {
    pub note: Option<String>,
}

/// Optional `?tutor_id=` filter for administrators.
#[derive(Debug, Deserialize)]
pub struct TutorFilter {
    pub tutor_id: Option<DbId>,
}

fn check_period(start: Timestamp, end: Timestamp) -> AppResult<()> {
    if end <= start {
        return Err(AppError::Core(CoreError::Validation(
            "end must be after start".into(),
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Counselor time cards
// ---------------------------------------------------------------------------

/// POST /api/v1/counselor-time-cards
///
/// Create a card and attach the counselor's unassigned entries in the period.
pub async fn create_counselor_card(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateCounselorTimeCardRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<CounselorTimeCard>>)> {
    check_period(input.start, input.end)?;
    let card = CounselorTimeCardManager::new(state.pool.clone())
        .create(input.counselor_id, input.start, input.end)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: card })))
}

/// GET /api/v1/counselor-time-cards
///
/// Administrators may filter by `?counselor_id=`; counselors always get
/// their own cards.
pub async fn list_counselor_cards(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<CounselorFilter>,
) -> AppResult<Json<DataResponse<Vec<CounselorTimeCard>>>> {
    let counselor_id = if auth.is_admin() {
        filter.counselor_id
    } else if auth.role == ROLE_COUNSELOR {
        Some(counselor_profile(&state, &auth).await?.id)
    } else {
        return Err(forbidden());
    };
    let cards = CounselorTimeCardRepo::list(&state.pool, counselor_id).await?;
    Ok(Json(DataResponse { data: cards }))
}

/// POST /api/v1/counselor-time-cards/{id}/approve
pub async fn approve_counselor_card(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(card_id): Path<DbId>,
    body: Option<Json<ApproveRequest>>,
) -> AppResult<Json<DataResponse<CounselorTimeCard>>> {
    let note = body.map(|Json(b)| b).unwrap_or_default().note;
    let manager = CounselorTimeCardManager::new(state.pool.clone());

    let card = if auth.is_admin() {
        manager.approve_as_admin(card_id, note.as_deref()).await?
    } else if auth.role == ROLE_COUNSELOR {
        let counselor = counselor_profile(&state, &auth).await?;
        manager
            .approve_as_counselor(card_id, counselor.id, note.as_deref())
            .await?
    } else {
        return Err(forbidden());
    };
    Ok(Json(DataResponse { data: card }))
}

// ---------------------------------------------------------------------------
// Tutor time cards
// ---------------------------------------------------------------------------

/// POST /api/v1/tutor-time-cards
pub async fn create_tutor_card(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateTutorTimeCardRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<TutorTimeCard>>)> {
    check_period(input.start, input.end)?;
    let card = TutorTimeCardManager::new(state.pool.clone())
        .create_time_card(
            input.tutor_id,
            input.start,
            input.end,
            input.include_sessions.unwrap_or(true),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: card })))
}

/// GET /api/v1/tutor-time-cards
///
/// Administrators must name a `?tutor_id=`; tutors always get their own.
pub async fn list_tutor_cards(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<TutorFilter>,
) -> AppResult<Json<DataResponse<Vec<TutorTimeCard>>>> {
    let tutor_id = if auth.is_admin() {
        filter.tutor_id.ok_or_else(|| {
            AppError::BadRequest("tutor_id query parameter is required".into())
        })?
    } else if auth.role == ROLE_TUTOR {
        tutor_profile(&state, &auth).await?.id
    } else {
        return Err(forbidden());
    };
    let cards = TutorTimeCardRepo::list_for_tutor(&state.pool, tutor_id).await?;
    Ok(Json(DataResponse { data: cards }))
}

/// POST /api/v1/tutor-time-cards/{id}/approve
pub async fn approve_tutor_card(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(card_id): Path<DbId>,
    body: Option<Json<ApproveRequest>>,
) -> AppResult<Json<DataResponse<TutorTimeCard>>> {
    let note = body.map(|Json(b)| b).unwrap_or_default().note;
    let manager = TutorTimeCardManager::new(state.pool.clone());

    let card = if auth.is_admin() {
        manager
            .admin_approve(card_id, auth.user_id, note.as_deref())
            .await?
    } else if auth.role == ROLE_TUTOR {
        let tutor = tutor_profile(&state, &auth).await?;
        manager
            .tutor_approve(card_id, tutor.id, note.as_deref())
            .await?
    } else {
        return Err(forbidden());
    };
    Ok(Json(DataResponse { data: card }))
}
