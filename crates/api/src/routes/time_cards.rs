use axum::routing::{get, post};
use axum::Router;

use crate::handlers::time_cards;
use crate::state::AppState;

/// Routes mounted at `/counselor-time-cards`.
///
/// ```text
/// GET    /                -> list_counselor_cards
/// POST   /                -> create_counselor_card (admin)
/// POST   /{id}/approve    -> approve_counselor_card
/// ```
pub fn counselor_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(time_cards::list_counselor_cards).post(time_cards::create_counselor_card),
        )
        .route("/{id}/approve", post(time_cards::approve_counselor_card))
}

/// Routes mounted at `/tutor-time-cards`.
///
/// ```text
/// GET    /                -> list_tutor_cards
/// POST   /                -> create_tutor_card (admin)
/// POST   /{id}/approve    -> approve_tutor_card
/// ```
pub fn tutor_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(time_cards::list_tutor_cards).post(time_cards::create_tutor_card),
        )
        .route("/{id}/approve", post(time_cards::approve_tutor_card))
}
