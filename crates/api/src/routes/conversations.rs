use axum::routing::post;
use axum::Router;

use crate::handlers::conversations;
use crate::state::AppState;

/// Routes mounted at `/conversations`.
///
/// ```text
/// POST   /{id}/messages    -> post_message
/// POST   /{id}/read        -> mark_read
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/messages", post(conversations::post_message))
        .route("/{id}/read", post(conversations::mark_read))
}
