//! Handlers for applying roadmaps to students.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use schoolnet_core::types::DbId;
use schoolnet_managers::{AppliedRoadmap, RoadmapManager, UnappliedRoadmap};
use serde::Deserialize;

use super::access::student_for;
use crate::error::AppResult;
use crate::middleware::rbac::RequireCounselor;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for apply and unapply.
#[derive(Debug, Deserialize)]
pub struct RoadmapStudentRequest {
    pub student_id: DbId,
}

/// POST /api/v1/roadmaps/{id}/apply
///
/// Create the roadmap's meetings and tasks for the student. Applying the
/// same roadmap twice is a 409.
pub async fn apply(
    RequireCounselor(user): RequireCounselor,
    State(state): State<AppState>,
    Path(roadmap_id): Path<DbId>,
    Json(input): Json<RoadmapStudentRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<AppliedRoadmap>>)> {
    let student = student_for(&state, &user, input.student_id, false).await?;
    let applied = RoadmapManager::new(state.notifier.clone())
        .apply(roadmap_id, student.id)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: applied })))
}

/// POST /api/v1/roadmaps/{id}/unapply
///
/// Remove the roadmap's unstarted meetings and incomplete tasks.
pub async fn unapply(
    RequireCounselor(user): RequireCounselor,
    State(state): State<AppState>,
    Path(roadmap_id): Path<DbId>,
    Json(input): Json<RoadmapStudentRequest>,
) -> AppResult<Json<DataResponse<UnappliedRoadmap>>> {
    let student = student_for(&state, &user, input.student_id, false).await?;
    let removed = RoadmapManager::new(state.notifier.clone())
        .unapply(roadmap_id, student.id)
        .await?;
    Ok(Json(DataResponse { data: removed }))
}
