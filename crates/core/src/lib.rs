//! Pure domain rules for the SchoolNet platform.
//!
//! Nothing in this crate touches the database or the network. The `db`,
//! `events`, `managers` and `worker` crates call into these functions so the
//! notification, reminder and reconciliation rules live in one place and can
//! be tested without a running PostgreSQL.

pub mod conversations;
pub mod error;
pub mod format;
pub mod hours;
pub mod notification_types;
pub mod reminders;
pub mod roles;
pub mod send_window;
pub mod tasks;
pub mod time_cards;
pub mod types;
pub mod verification;
