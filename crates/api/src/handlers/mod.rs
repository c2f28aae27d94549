pub mod access;
pub mod auth;
pub mod conversations;
pub mod counseling;
pub mod meetings;
pub mod notifications;
pub mod roadmaps;
pub mod tasks;
pub mod time_cards;
pub mod tutoring;
pub mod users;
