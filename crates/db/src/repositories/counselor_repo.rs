//! Repository for the `counselors` table.

use sqlx::PgPool;
use schoolnet_core::types::DbId;

use crate::models::user::{Counselor, CreateCounselor};

const COLUMNS: &str = "id, user_id, part_time, hourly_rate_cents, cc_on_meeting_notes, \
                        created_at, updated_at";

/// Provides CRUD operations for counselor profiles.
pub struct CounselorRepo;

impl CounselorRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateCounselor,
    ) -> Result<Counselor, sqlx::Error> {
        let query = format!(
            "INSERT INTO counselors (user_id, part_time, hourly_rate_cents, cc_on_meeting_notes)
             VALUES ($1, COALESCE($2, false), COALESCE($3, 0), COALESCE($4, false))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Counselor>(&query)
            .bind(input.user_id)
            .bind(input.part_time)
            .bind(input.hourly_rate_cents)
            .bind(input.cc_on_meeting_notes)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Counselor>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM counselors WHERE id = $1");
        sqlx::query_as::<_, Counselor>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_user_id(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<Counselor>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM counselors WHERE user_id = $1");
        sqlx::query_as::<_, Counselor>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Counselors whose user account is active.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Counselor>, sqlx::Error> {
        sqlx::query_as::<_, Counselor>(
            "SELECT c.id, c.user_id, c.part_time, c.hourly_rate_cents, c.cc_on_meeting_notes,
                    c.created_at, c.updated_at
             FROM counselors c
             JOIN users u ON u.id = c.user_id
             WHERE u.is_active = true
             ORDER BY c.id",
        )
        .fetch_all(pool)
        .await
    }
}
