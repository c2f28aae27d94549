use axum::routing::post;
use axum::Router;

use crate::handlers::meetings;
use crate::state::AppState;

/// Routes mounted at `/counselor-meetings`.
///
/// ```text
/// POST   /{id}/schedule      -> schedule
/// POST   /{id}/reschedule    -> reschedule
/// POST   /{id}/cancel        -> cancel
/// POST   /{id}/send-notes    -> send_notes
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/schedule", post(meetings::schedule))
        .route("/{id}/reschedule", post(meetings::reschedule))
        .route("/{id}/cancel", post(meetings::cancel))
        .route("/{id}/send-notes", post(meetings::send_notes))
}
