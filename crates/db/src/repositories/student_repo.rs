//! Repository for the `students` table.

use sqlx::PgPool;
use schoolnet_core::types::DbId;

use crate::models::user::{CreateStudent, Student};

const COLUMNS: &str = "id, user_id, parent_id, counselor_id, graduation_year, is_cap, \
                        has_access_to_cap, counselor_pay_rate_cents, created_at, updated_at";

/// Provides CRUD operations for student profiles.
pub struct StudentRepo;

impl StudentRepo {
    pub async fn create(pool: &PgPool, input: &CreateStudent) -> Result<Student, sqlx::Error> {
        let query = format!(
            "INSERT INTO students
                (user_id, parent_id, counselor_id, graduation_year, is_cap,
                 has_access_to_cap, counselor_pay_rate_cents)
             VALUES ($1, $2, $3, $4, COALESCE($5, false), COALESCE($6, true), $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Student>(&query)
            .bind(input.user_id)
            .bind(input.parent_id)
            .bind(input.counselor_id)
            .bind(input.graduation_year)
            .bind(input.is_cap)
            .bind(input.has_access_to_cap)
            .bind(input.counselor_pay_rate_cents)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Student>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM students WHERE id = $1");
        sqlx::query_as::<_, Student>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_user_id(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<Student>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM students WHERE user_id = $1");
        sqlx::query_as::<_, Student>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Students linked to a parent profile.
    pub async fn list_for_parent(
        pool: &PgPool,
        parent_id: DbId,
    ) -> Result<Vec<Student>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM students WHERE parent_id = $1 ORDER BY id");
        sqlx::query_as::<_, Student>(&query)
            .bind(parent_id)
            .fetch_all(pool)
            .await
    }

    /// Students whose user has one of the given ids.
    pub async fn list_by_user_ids(
        pool: &PgPool,
        user_ids: &[DbId],
    ) -> Result<Vec<Student>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM students WHERE user_id = ANY($1) ORDER BY id");
        sqlx::query_as::<_, Student>(&query)
            .bind(user_ids)
            .fetch_all(pool)
            .await
    }
}
