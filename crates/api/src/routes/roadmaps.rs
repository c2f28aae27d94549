use axum::routing::post;
use axum::Router;

use crate::handlers::roadmaps;
use crate::state::AppState;

/// Routes mounted at `/roadmaps`.
///
/// ```text
/// POST   /{id}/apply      -> apply
/// POST   /{id}/unapply    -> unapply
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/apply", post(roadmaps::apply))
        .route("/{id}/unapply", post(roadmaps::unapply))
}
