pub mod auth;
pub mod conversations;
pub mod health;
pub mod meetings;
pub mod notifications;
pub mod roadmaps;
pub mod students;
pub mod tasks;
pub mod time_cards;
pub mod users;

use axum::routing::post;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /auth/login                                   login (public)
/// /auth/accept-invite                           set password from invite (public)
///
/// /users                                        create + invite (admin)
/// /users/me                                     current user
/// /users/{id}/invite                            resend invite (admin)
///
/// /notifications                                list, read, recipient settings
/// /students/{id}/...                            hours, purchases, meetings
/// /tutoring-purchases/{id}/reverse              reverse a purchase (admin)
/// /counselor-meetings/{id}/...                  schedule, reschedule, cancel, notes
/// /counselor-time-cards                         create (admin), list, approve
/// /tutor-time-cards                             create (admin), list, approve
/// /tasks                                        list own, create, complete
/// /roadmaps/{id}/apply|unapply                  roadmap application
/// /conversations/{id}/messages|read             chat
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/notifications", notifications::router())
        .nest("/students", students::router())
        .route(
            "/tutoring-purchases/{id}/reverse",
            post(handlers::tutoring::reverse),
        )
        .nest("/counselor-meetings", meetings::router())
        .nest("/counselor-time-cards", time_cards::counselor_router())
        .nest("/tutor-time-cards", time_cards::tutor_router())
        .nest("/tasks", tasks::router())
        .nest("/roadmaps", roadmaps::router())
        .nest("/conversations", conversations::router())
}
