//! Handlers for the `/tasks` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use schoolnet_core::error::CoreError;
use schoolnet_core::types::{DbId, Timestamp};
use schoolnet_db::models::task::{CreateTask, Task};
use schoolnet_db::repositories::{StudentRepo, TaskRepo};
use schoolnet_managers::TaskManager;
use serde::Deserialize;
use validator::Validate;

use super::access::{forbidden, student_for};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireStaff;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /tasks`.
///
/// With a `task_template_id` the title, description and type come from the
/// template (or the counselor's override of it).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    pub for_user_id: DbId,
    pub task_template_id: Option<DbId>,
    #[validate(length(max = 255))]
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub due: Option<Timestamp>,
    pub visible_to_counseling_student: Option<bool>,
    /// Send the task-created notification (default: true).
    pub notify: Option<bool>,
}

/// Request body for `POST /tasks/{id}/complete`.
#[derive(Debug, Default, Deserialize)]
pub struct CompleteTaskRequest {
    /// Tell the counselor (default: true).
    pub notify: Option<bool>,
}

/// GET /api/v1/tasks
///
/// The caller's own tasks.
pub async fn list_mine(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Task>>>> {
    let tasks = TaskRepo::list_for_user(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse { data: tasks }))
}

/// POST /api/v1/tasks
pub async fn create(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Json(input): Json<CreateTaskRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Task>>)> {
    input.validate()?;
    check_owner(&state, &user, input.for_user_id).await?;

    let manager = TaskManager::new(state.notifier.clone());
    let task = manager
        .create_task(
            input.task_template_id,
            CreateTask {
                for_user_id: input.for_user_id,
                created_by_id: Some(user.user_id),
                title: input.title,
                description: input.description,
                due: input.due,
                visible_to_counseling_student: input.visible_to_counseling_student,
                ..Default::default()
            },
        )
        .await?;

    if input.notify.unwrap_or(true) {
        manager
            .send_task_created_notification(task.id, Some(user.user_id), false)
            .await?;
    }
    Ok((StatusCode::CREATED, Json(DataResponse { data: task })))
}

/// POST /api/v1/tasks/{id}/complete
///
/// The task's owner or anyone who can see the owning student may complete
/// it. Completing twice is a 409.
pub async fn complete(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(task_id): Path<DbId>,
    body: Option<Json<CompleteTaskRequest>>,
) -> AppResult<Json<DataResponse<Task>>> {
    let notify = body.map(|Json(b)| b).unwrap_or_default().notify;
    let task = TaskRepo::find_by_id(&state.pool, task_id)
        .await?
        .ok_or(AppError::Core(CoreError::not_found("Task", task_id)))?;
    if task.for_user_id != auth.user_id {
        check_owner(&state, &auth, task.for_user_id).await?;
    }

    let task = TaskManager::new(state.notifier.clone())
        .complete_task(task.id, Some(auth.user_id), notify.unwrap_or(true))
        .await?;
    Ok(Json(DataResponse { data: task }))
}

/// Tasks for students need access to that student; tasks for anyone else
/// are administrator business.
async fn check_owner(state: &AppState, user: &AuthUser, for_user_id: DbId) -> AppResult<()> {
    match StudentRepo::find_by_user_id(&state.pool, for_user_id).await? {
        Some(student) => {
            student_for(state, user, student.id, true).await?;
            Ok(())
        }
        None if user.is_admin() => Ok(()),
        None => Err(forbidden()),
    }
}
