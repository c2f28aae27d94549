//! User entity, role profiles and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use schoolnet_core::types::{Cents, DbId, Timestamp};

/// Full user row from the `users` table.
///
/// Contains the password hash -- NEVER serialize this to API responses directly.
/// Use [`UserResponse`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub timezone: String,
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub accepted_invite: Option<Timestamp>,
    pub last_invited: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Invited but has not yet set a password.
    pub fn is_pending(&self) -> bool {
        self.password_hash.is_none()
    }
}

/// Safe user representation for API responses (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: DbId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub timezone: String,
    pub is_active: bool,
    pub accepted_invite: Option<Timestamp>,
}

impl From<&User> for UserResponse {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            role: u.role.clone(),
            timezone: u.timezone.clone(),
            is_active: u.is_active,
            accepted_invite: u.accepted_invite,
        }
    }
}

/// DTO for creating a new user. A `None` password creates a pending user.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub timezone: Option<String>,
    pub password_hash: Option<String>,
}

/// DTO for updating an existing user. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub timezone: Option<String>,
    pub is_active: Option<bool>,
}

// ---------------------------------------------------------------------------
// Role profiles
// ---------------------------------------------------------------------------

/// A row from the `students` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Student {
    pub id: DbId,
    pub user_id: DbId,
    pub parent_id: Option<DbId>,
    pub counselor_id: Option<DbId>,
    pub graduation_year: Option<i32>,
    pub is_cap: bool,
    pub has_access_to_cap: bool,
    pub counselor_pay_rate_cents: Option<Cents>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateStudent {
    pub user_id: DbId,
    pub parent_id: Option<DbId>,
    pub counselor_id: Option<DbId>,
    pub graduation_year: Option<i32>,
    pub is_cap: Option<bool>,
    pub has_access_to_cap: Option<bool>,
    pub counselor_pay_rate_cents: Option<Cents>,
}

/// A row from the `parents` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Parent {
    pub id: DbId,
    pub user_id: DbId,
    pub cc_email: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `tutors` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Tutor {
    pub id: DbId,
    pub user_id: DbId,
    pub hourly_rate_cents: Cents,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `counselors` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Counselor {
    pub id: DbId,
    pub user_id: DbId,
    pub part_time: bool,
    pub hourly_rate_cents: Cents,
    pub cc_on_meeting_notes: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCounselor {
    pub user_id: DbId,
    pub part_time: Option<bool>,
    pub hourly_rate_cents: Option<Cents>,
    pub cc_on_meeting_notes: Option<bool>,
}
