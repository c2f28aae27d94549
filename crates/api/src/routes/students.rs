use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{counseling, meetings, tutoring};
use crate::state::AppState;

/// Routes mounted at `/students`.
///
/// ```text
/// GET    /{id}/counseling-hours       -> counseling::summary
/// POST   /{id}/counseling-hours       -> counseling::grant (admin)
/// GET    /{id}/tutoring-hours         -> tutoring::available_hours
/// POST   /{id}/tutoring-purchases     -> tutoring::purchase (admin)
/// POST   /{id}/counselor-meetings     -> meetings::create
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}/counseling-hours",
            get(counseling::summary).post(counseling::grant),
        )
        .route("/{id}/tutoring-hours", get(tutoring::available_hours))
        .route("/{id}/tutoring-purchases", post(tutoring::purchase))
        .route("/{id}/counselor-meetings", post(meetings::create))
}
