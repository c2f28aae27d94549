use axum::routing::{get, post};
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// POST   /                 -> create (admin)
/// GET    /me               -> me
/// POST   /{id}/invite      -> send_invite (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(users::create))
        .route("/me", get(users::me))
        .route("/{id}/invite", post(users::send_invite))
}
