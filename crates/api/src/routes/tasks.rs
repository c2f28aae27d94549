use axum::routing::{get, post};
use axum::Router;

use crate::handlers::tasks;
use crate::state::AppState;

/// Routes mounted at `/tasks`.
///
/// ```text
/// GET    /                 -> list_mine
/// POST   /                 -> create (staff)
/// POST   /{id}/complete    -> complete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(tasks::list_mine).post(tasks::create))
        .route("/{id}/complete", post(tasks::complete))
}
