//! Repository for the `users` table.

use sqlx::PgPool;
use schoolnet_core::notification_types::INVITE;
use schoolnet_core::roles::ROLE_ADMIN;
use schoolnet_core::types::{DbId, Timestamp};

use crate::models::user::{CreateUser, UpdateUser, User};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, email, first_name, last_name, role, timezone, password_hash, \
                        is_active, accepted_invite, last_invited, created_at, updated_at";

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, first_name, last_name, role, timezone, password_hash)
             VALUES ($1, $2, $3, $4, COALESCE($5, 'America/Los_Angeles'), $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.email)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.role)
            .bind(&input.timezone)
            .bind(&input.password_hash)
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by email (case-insensitive).
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Update a user. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateUser,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                timezone = COALESCE($4, timezone),
                is_active = COALESCE($5, is_active)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.timezone)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Set the password of a pending user and stamp `accepted_invite`.
    ///
    /// Returns `None` when the user does not exist or already has a password.
    pub async fn accept_invite(
        pool: &PgPool,
        id: DbId,
        password_hash: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET password_hash = $2, accepted_invite = NOW()
             WHERE id = $1 AND password_hash IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(password_hash)
            .fetch_optional(pool)
            .await
    }

    /// Record when the user was last sent an invite or invite reminder.
    pub async fn set_last_invited(
        pool: &PgPool,
        id: DbId,
        at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_invited = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Active administrators, oldest first.
    pub async fn list_admins(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users
             WHERE role = $1 AND is_active = true
             ORDER BY id"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(ROLE_ADMIN)
            .fetch_all(pool)
            .await
    }

    /// Active users that have been sent an invite but never set a password.
    pub async fn list_pending_invited(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users u
             WHERE u.password_hash IS NULL AND u.is_active = true
               AND EXISTS (
                   SELECT 1 FROM notifications n
                   JOIN notification_recipients r ON r.id = n.recipient_id
                   WHERE r.user_id = u.id AND n.notification_type = $1
               )
             ORDER BY u.id"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(INVITE)
            .fetch_all(pool)
            .await
    }
}
