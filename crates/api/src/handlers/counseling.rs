//! Handlers for a student's counseling hours bank.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use schoolnet_core::types::{Cents, DbId, Minutes};
use schoolnet_db::models::counseling::CounselingHoursGrant;
use schoolnet_managers::{CounselingHoursManager, CounselingHoursSummary};
use serde::Deserialize;
use validator::Validate;

use super::access::student_for;
use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /students/{id}/counseling-hours`.
#[derive(Debug, Deserialize, Validate)]
pub struct GrantHoursRequest {
    #[validate(range(min = 1))]
    pub minutes: Minutes,
    #[validate(range(min = 0))]
    pub amount_paid_cents: Option<Cents>,
    #[validate(length(max = 2000))]
    pub note: Option<String>,
    pub counseling_package_id: Option<DbId>,
}

/// GET /api/v1/students/{id}/counseling-hours
///
/// Granted, used and remaining minutes, plus the total paid.
pub async fn summary(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(student_id): Path<DbId>,
) -> AppResult<Json<DataResponse<CounselingHoursSummary>>> {
    let student = student_for(&state, &auth, student_id, false).await?;
    let summary = CounselingHoursManager::new(state.pool.clone())
        .summary(student.id)
        .await?;
    Ok(Json(DataResponse { data: summary }))
}

/// POST /api/v1/students/{id}/counseling-hours
pub async fn grant(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(student_id): Path<DbId>,
    Json(input): Json<GrantHoursRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<CounselingHoursGrant>>)> {
    input.validate()?;
    let grant = CounselingHoursManager::new(state.pool.clone())
        .add_hours(
            student_id,
            input.minutes,
            input.amount_paid_cents,
            input.note,
            input.counseling_package_id,
            Some(admin.user_id),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: grant })))
}
