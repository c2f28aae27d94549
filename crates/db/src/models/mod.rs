//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - `FromRow` + `Serialize` entity structs matching database rows
//! - `Deserialize` create DTOs for inserts
//! - Joined row structs used by batch jobs

pub mod conversation;
pub mod counseling;
pub mod notification;
pub mod task;
pub mod tutoring;
pub mod user;
