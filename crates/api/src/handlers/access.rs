//! Who may see or act on a student's records.
//!
//! Administrators see everyone. A student sees themselves, a parent sees
//! their children, a counselor sees the students assigned to them. Tutors
//! see the students they have tutored, but only where a handler opts in.

use schoolnet_core::error::CoreError;
use schoolnet_core::roles::{ROLE_COUNSELOR, ROLE_PARENT, ROLE_TUTOR};
use schoolnet_core::types::DbId;
use schoolnet_db::models::user::{Counselor, Student, Tutor};
use schoolnet_db::repositories::{CounselorRepo, ParentRepo, StudentRepo, TutorRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Load a student and check the caller may see them.
pub async fn student_for(
    state: &AppState,
    auth: &AuthUser,
    student_id: DbId,
    allow_tutors: bool,
) -> AppResult<Student> {
    let student = StudentRepo::find_by_id(&state.pool, student_id)
        .await?
        .ok_or(AppError::Core(CoreError::not_found("Student", student_id)))?;

    if can_see(state, auth, &student, allow_tutors).await? {
        Ok(student)
    } else {
        Err(forbidden())
    }
}

async fn can_see(
    state: &AppState,
    auth: &AuthUser,
    student: &Student,
    allow_tutors: bool,
) -> AppResult<bool> {
    if auth.is_admin() || auth.user_id == student.user_id {
        return Ok(true);
    }
    let pool = &state.pool;
    let allowed = match auth.role.as_str() {
        ROLE_PARENT => ParentRepo::find_by_user_id(pool, auth.user_id)
            .await?
            .is_some_and(|p| student.parent_id == Some(p.id)),
        ROLE_COUNSELOR => CounselorRepo::find_by_user_id(pool, auth.user_id)
            .await?
            .is_some_and(|c| student.counselor_id == Some(c.id)),
        ROLE_TUTOR if allow_tutors => TutorRepo::list_for_student(pool, student.id)
            .await?
            .iter()
            .any(|t| t.user_id == auth.user_id),
        _ => false,
    };
    Ok(allowed)
}

/// The counselor profile of the caller, or 403.
pub async fn counselor_profile(state: &AppState, auth: &AuthUser) -> AppResult<Counselor> {
    CounselorRepo::find_by_user_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Forbidden("Not a counselor".into())))
}

/// The tutor profile of the caller, or 403.
pub async fn tutor_profile(state: &AppState, auth: &AuthUser) -> AppResult<Tutor> {
    TutorRepo::find_by_user_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Forbidden("Not a tutor".into())))
}

pub fn forbidden() -> AppError {
    AppError::Core(CoreError::Forbidden(
        "You do not have access to this resource".into(),
    ))
}
