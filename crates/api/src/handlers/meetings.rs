//! Handlers for counselor meetings.
//!
//! Administrators and the student's own counselor may create, schedule,
//! reschedule, cancel and send notes for a meeting.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use schoolnet_core::error::CoreError;
use schoolnet_core::types::DbId;
use schoolnet_db::models::counseling::{CounselorMeeting, MeetingTimes};
use schoolnet_db::repositories::CounselorMeetingRepo;
use schoolnet_managers::CounselorMeetingManager;
use serde::Deserialize;
use validator::Validate;

use super::access::student_for;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireCounselor;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /students/{id}/counselor-meetings`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMeetingRequest {
    pub counselor_meeting_template_id: Option<DbId>,
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
}

/// Request body for `POST /counselor-meetings/{id}/send-notes`.
#[derive(Debug, Deserialize, Validate)]
pub struct SendNotesRequest {
    #[validate(length(min = 1, max = 255))]
    pub subject: String,
    #[validate(length(min = 1))]
    pub note: String,
    #[serde(default)]
    pub send_to_student: bool,
    #[serde(default)]
    pub send_to_parent: bool,
}

/// POST /api/v1/students/{id}/counselor-meetings
pub async fn create(
    RequireCounselor(user): RequireCounselor,
    State(state): State<AppState>,
    Path(student_id): Path<DbId>,
    Json(input): Json<CreateMeetingRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<CounselorMeeting>>)> {
    input.validate()?;
    let student = student_for(&state, &user, student_id, false).await?;
    let meeting = manager(&state)
        .create_meeting(
            student.id,
            input.counselor_meeting_template_id,
            input.title.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: meeting })))
}

/// POST /api/v1/counselor-meetings/{id}/schedule
pub async fn schedule(
    RequireCounselor(user): RequireCounselor,
    State(state): State<AppState>,
    Path(meeting_id): Path<DbId>,
    Json(times): Json<MeetingTimes>,
) -> AppResult<Json<DataResponse<CounselorMeeting>>> {
    check_times(&times)?;
    let meeting = meeting_for(&state, &user, meeting_id).await?;
    let meeting = manager(&state)
        .schedule(meeting.id, times.starts_at, times.ends_at, Some(user.user_id))
        .await?;
    Ok(Json(DataResponse { data: meeting }))
}

/// POST /api/v1/counselor-meetings/{id}/reschedule
pub async fn reschedule(
    RequireCounselor(user): RequireCounselor,
    State(state): State<AppState>,
    Path(meeting_id): Path<DbId>,
    Json(times): Json<MeetingTimes>,
) -> AppResult<Json<DataResponse<CounselorMeeting>>> {
    check_times(&times)?;
    let meeting = meeting_for(&state, &user, meeting_id).await?;
    let meeting = manager(&state)
        .reschedule(meeting.id, times.starts_at, times.ends_at, Some(user.user_id))
        .await?;
    Ok(Json(DataResponse { data: meeting }))
}

/// POST /api/v1/counselor-meetings/{id}/cancel
pub async fn cancel(
    RequireCounselor(user): RequireCounselor,
    State(state): State<AppState>,
    Path(meeting_id): Path<DbId>,
) -> AppResult<Json<DataResponse<CounselorMeeting>>> {
    let meeting = meeting_for(&state, &user, meeting_id).await?;
    let meeting = manager(&state)
        .cancel(meeting.id, Some(user.user_id))
        .await?;
    Ok(Json(DataResponse { data: meeting }))
}

/// POST /api/v1/counselor-meetings/{id}/send-notes
pub async fn send_notes(
    RequireCounselor(user): RequireCounselor,
    State(state): State<AppState>,
    Path(meeting_id): Path<DbId>,
    Json(input): Json<SendNotesRequest>,
) -> AppResult<Json<DataResponse<CounselorMeeting>>> {
    input.validate()?;
    let meeting = meeting_for(&state, &user, meeting_id).await?;
    let meeting = manager(&state)
        .send_notes(
            meeting.id,
            &input.subject,
            &input.note,
            input.send_to_student,
            input.send_to_parent,
        )
        .await?;
    Ok(Json(DataResponse { data: meeting }))
}

async fn meeting_for(
    state: &AppState,
    user: &AuthUser,
    meeting_id: DbId,
) -> AppResult<CounselorMeeting> {
    let meeting = CounselorMeetingRepo::find_by_id(&state.pool, meeting_id)
        .await?
        .ok_or(AppError::Core(CoreError::not_found("CounselorMeeting", meeting_id)))?;
    student_for(state, user, meeting.student_id, false).await?;
    Ok(meeting)
}

fn check_times(times: &MeetingTimes) -> AppResult<()> {
    if times.ends_at <= times.starts_at {
        return Err(AppError::Core(CoreError::Validation(
            "ends_at must be after starts_at".into(),
        )));
    }
    Ok(())
}

fn manager(state: &AppState) -> CounselorMeetingManager {
    CounselorMeetingManager::new(state.notifier.clone())
}
