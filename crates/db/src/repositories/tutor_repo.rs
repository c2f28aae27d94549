//! Repository for the `tutors` table.

use sqlx::PgPool;
use schoolnet_core::types::{Cents, DbId};

use crate::models::user::Tutor;
use crate::repositories::qualify;

const COLUMNS: &str = "id, user_id, hourly_rate_cents, created_at, updated_at";

/// Provides CRUD operations for tutor profiles.
pub struct TutorRepo;

impl TutorRepo {
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        hourly_rate_cents: Cents,
    ) -> Result<Tutor, sqlx::Error> {
        let query = format!(
            "INSERT INTO tutors (user_id, hourly_rate_cents) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Tutor>(&query)
            .bind(user_id)
            .bind(hourly_rate_cents)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Tutor>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tutors WHERE id = $1");
        sqlx::query_as::<_, Tutor>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_user_id(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<Tutor>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tutors WHERE user_id = $1");
        sqlx::query_as::<_, Tutor>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Tutors whose user account is active.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Tutor>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM tutors t
             JOIN users u ON u.id = t.user_id
             WHERE u.is_active = true
             ORDER BY t.id",
            qualify(COLUMNS, "t")
        );
        sqlx::query_as::<_, Tutor>(&query).fetch_all(pool).await
    }

    /// Primary and support tutors of a group session.
    pub async fn list_for_group_session(
        pool: &PgPool,
        group_tutoring_session_id: DbId,
    ) -> Result<Vec<Tutor>, sqlx::Error> {
        let query = format!(
            "SELECT {cols} FROM tutors t
             JOIN group_tutoring_sessions g ON g.primary_tutor_id = t.id
             WHERE g.id = $1
             UNION
             SELECT {cols} FROM tutors t
             JOIN group_tutoring_session_support_tutors s ON s.tutor_id = t.id
             WHERE s.group_tutoring_session_id = $1",
            cols = qualify(COLUMNS, "t")
        );
        sqlx::query_as::<_, Tutor>(&query)
            .bind(group_tutoring_session_id)
            .fetch_all(pool)
            .await
    }

    /// Tutors who have run an individual session with the student.
    pub async fn list_for_student(
        pool: &PgPool,
        student_id: DbId,
    ) -> Result<Vec<Tutor>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM tutors t
             WHERE EXISTS (
                 SELECT 1 FROM student_tutoring_sessions s
                 WHERE s.individual_session_tutor_id = t.id AND s.student_id = $1
             )
             ORDER BY t.id",
            qualify(COLUMNS, "t")
        );
        sqlx::query_as::<_, Tutor>(&query)
            .bind(student_id)
            .fetch_all(pool)
            .await
    }

    pub async fn set_hourly_rate(
        pool: &PgPool,
        id: DbId,
        hourly_rate_cents: Cents,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE tutors SET hourly_rate_cents = $2 WHERE id = $1")
            .bind(id)
            .bind(hourly_rate_cents)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
