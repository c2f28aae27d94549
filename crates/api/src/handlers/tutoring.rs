//! Handlers for tutoring hours and package purchases.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use schoolnet_core::error::CoreError;
use schoolnet_core::hours::TutoringHours;
use schoolnet_core::types::{Cents, DbId};
use schoolnet_db::models::tutoring::TutoringPackagePurchase;
use schoolnet_db::repositories::TutoringPackageRepo;
use schoolnet_managers::TutoringPackageManager;
use serde::Deserialize;
use validator::Validate;

use super::access::student_for;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /students/{id}/tutoring-purchases`.
#[derive(Debug, Deserialize, Validate)]
pub struct PurchaseRequest {
    pub tutoring_package_id: DbId,
    /// Defaults to the package price.
    #[validate(range(min = 0))]
    pub price_paid_cents: Option<Cents>,
    /// Notify the student and parent (default: true).
    pub notify: Option<bool>,
}

/// GET /api/v1/students/{id}/tutoring-hours
///
/// Remaining and purchased minutes per bucket. Tutors who have worked with
/// the student may read this too.
pub async fn available_hours(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(student_id): Path<DbId>,
) -> AppResult<Json<DataResponse<TutoringHours>>> {
    let student = student_for(&state, &auth, student_id, true).await?;
    let hours = manager(&state).available_hours(student.id).await?;
    Ok(Json(DataResponse { data: hours }))
}

/// POST /api/v1/students/{id}/tutoring-purchases
pub async fn purchase(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(student_id): Path<DbId>,
    Json(input): Json<PurchaseRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<TutoringPackagePurchase>>)> {
    input.validate()?;
    let purchase = manager(&state)
        .purchase_package(
            student_id,
            input.tutoring_package_id,
            input.price_paid_cents,
            Some(admin.user_id),
            input.notify.unwrap_or(true),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: purchase })))
}

/// POST /api/v1/tutoring-purchases/{id}/reverse
///
/// Reverse a purchase. Future group sessions from the package are
/// cancelled when no other purchase of it remains.
pub async fn reverse(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(purchase_id): Path<DbId>,
) -> AppResult<Json<DataResponse<TutoringPackagePurchase>>> {
    let purchase = TutoringPackageRepo::find_purchase(&state.pool, purchase_id)
        .await?
        .ok_or(AppError::Core(CoreError::not_found(
            "TutoringPackagePurchase",
            purchase_id,
        )))?;
    let reversed = manager(&state)
        .unpurchase_package(purchase.student_id, purchase.id, Some(admin.user_id))
        .await?;
    Ok(Json(DataResponse { data: reversed }))
}

fn manager(state: &AppState) -> TutoringPackageManager {
    TutoringPackageManager::new(state.notifier.clone())
}
