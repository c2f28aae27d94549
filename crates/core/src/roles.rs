//! Well-known role name constants.
//!
//! These must match the `users_role_check` constraint in the initial
//! migration.

pub const ROLE_STUDENT: &str = "student";
pub const ROLE_PARENT: &str = "parent";
pub const ROLE_TUTOR: &str = "tutor";
pub const ROLE_COUNSELOR: &str = "counselor";
pub const ROLE_ADMIN: &str = "administrator";

/// All valid role names.
pub const VALID_ROLES: &[&str] = &[
    ROLE_STUDENT,
    ROLE_PARENT,
    ROLE_TUTOR,
    ROLE_COUNSELOR,
    ROLE_ADMIN,
];

/// Validate that a role string is known.
pub fn validate_role(role: &str) -> Result<(), String> {
    if VALID_ROLES.contains(&role) {
        Ok(())
    } else {
        Err(format!(
            "Invalid role '{role}'. Must be one of: {}",
            VALID_ROLES.join(", ")
        ))
    }
}
