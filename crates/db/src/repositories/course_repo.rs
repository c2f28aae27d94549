//! Repository for `courses` and their group sessions.

use sqlx::PgPool;
use schoolnet_core::types::{DbId, Timestamp};

use crate::models::tutoring::{Course, CreateCourse, GroupTutoringSession};
use crate::repositories::qualify;
use crate::repositories::tutoring_session_repo::GROUP_COLUMNS;

const COLUMNS: &str = "id, name, description, primary_tutor_id, created_at, updated_at";

/// Provides CRUD operations for courses.
pub struct CourseRepo;

impl CourseRepo {
    pub async fn create(pool: &PgPool, input: &CreateCourse) -> Result<Course, sqlx::Error> {
        let query = format!(
            "INSERT INTO courses (name, description, primary_tutor_id)
             VALUES ($1, COALESCE($2, ''), $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Course>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.primary_tutor_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Course>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM courses WHERE id = $1");
        sqlx::query_as::<_, Course>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn add_group_session(
        pool: &PgPool,
        course_id: DbId,
        group_tutoring_session_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO course_group_tutoring_sessions (course_id, group_tutoring_session_id)
             VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(course_id)
        .bind(group_tutoring_session_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Courses that have not started yet but have a live session in
    /// `(now, until)`, leaving out `exclude`.
    pub async fn list_starting_before(
        pool: &PgPool,
        now: Timestamp,
        until: Timestamp,
        exclude: &[DbId],
    ) -> Result<Vec<Course>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM courses c
             WHERE NOT (c.id = ANY($3))
               AND EXISTS (
                   SELECT 1 FROM course_group_tutoring_sessions cg
                   JOIN group_tutoring_sessions g ON g.id = cg.group_tutoring_session_id
                   WHERE cg.course_id = c.id AND g.cancelled = false
                     AND g.starts_at > $1 AND g.starts_at < $2)
               AND NOT EXISTS (
                   SELECT 1 FROM course_group_tutoring_sessions cg
                   JOIN group_tutoring_sessions g ON g.id = cg.group_tutoring_session_id
                   WHERE cg.course_id = c.id AND g.cancelled = false AND g.starts_at < $1)
             ORDER BY c.id",
            qualify(COLUMNS, "c")
        );
        sqlx::query_as::<_, Course>(&query)
            .bind(now)
            .bind(until)
            .bind(exclude)
            .fetch_all(pool)
            .await
    }

    /// The course's earliest non-cancelled group session.
    pub async fn first_session(
        pool: &PgPool,
        course_id: DbId,
    ) -> Result<Option<GroupTutoringSession>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM group_tutoring_sessions g
             JOIN course_group_tutoring_sessions cg ON cg.group_tutoring_session_id = g.id
             WHERE cg.course_id = $1 AND g.cancelled = false
             ORDER BY g.starts_at, g.id
             LIMIT 1",
            qualify(GROUP_COLUMNS, "g")
        );
        sqlx::query_as::<_, GroupTutoringSession>(&query)
            .bind(course_id)
            .fetch_optional(pool)
            .await
    }
}
