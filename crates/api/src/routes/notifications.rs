//! Route definitions for the `/notifications` resource.
//!
//! All endpoints require authentication.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::notifications;
use crate::state::AppState;

/// Routes mounted at `/notifications`.
///
/// ```text
/// GET    /                      -> list_notifications
/// POST   /read-all              -> mark_all_read
/// GET    /unread-count          -> unread_count
/// POST   /{id}/read             -> mark_read
///
/// GET    /recipient             -> get_recipient
/// PUT    /recipient             -> update_recipient
/// POST   /recipient/phone       -> set_phone
/// POST   /recipient/verify      -> send_verification
/// POST   /recipient/confirm     -> confirm_phone
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications::list_notifications))
        .route("/read-all", post(notifications::mark_all_read))
        .route("/unread-count", get(notifications::unread_count))
        .route("/{id}/read", post(notifications::mark_read))
        .route(
            "/recipient",
            get(notifications::get_recipient).put(notifications::update_recipient),
        )
        .route("/recipient/phone", post(notifications::set_phone))
        .route("/recipient/verify", post(notifications::send_verification))
        .route("/recipient/confirm", post(notifications::confirm_phone))
}
