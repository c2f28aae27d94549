//! Repository for `student_tutoring_sessions` and `group_tutoring_sessions`.

use sqlx::PgPool;
use schoolnet_core::hours::SESSION_TYPE_TEST_PREP;
use schoolnet_core::types::{DbId, Timestamp};

use crate::models::tutoring::{
    CreateGroupTutoringSession, CreateStudentTutoringSession, GroupTutoringSession,
    SessionUsageRow, StudentTutoringSession,
};
use crate::repositories::qualify;

const COLUMNS: &str = "id, student_id, individual_session_tutor_id, group_tutoring_session_id, \
                        session_type, starts_at, ends_at, duration_minutes, set_cancelled, \
                        late_cancel, missed, is_tentative, last_reminder_sent, created_at, \
                        updated_at";

pub(crate) const GROUP_COLUMNS: &str = "id, title, primary_tutor_id, starts_at, ends_at, \
                              charge_student_duration, cancelled, last_reminder_sent, \
                              created_at, updated_at";

/// Provides CRUD operations for tutoring sessions.
pub struct TutoringSessionRepo;

impl TutoringSessionRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateStudentTutoringSession,
    ) -> Result<StudentTutoringSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO student_tutoring_sessions
                (student_id, individual_session_tutor_id, group_tutoring_session_id,
                 session_type, starts_at, ends_at, duration_minutes, is_tentative)
             VALUES ($1, $2, $3, COALESCE($4, $9), $5, $6, $7, COALESCE($8, false))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StudentTutoringSession>(&query)
            .bind(input.student_id)
            .bind(input.individual_session_tutor_id)
            .bind(input.group_tutoring_session_id)
            .bind(&input.session_type)
            .bind(input.starts_at)
            .bind(input.ends_at)
            .bind(input.duration_minutes)
            .bind(input.is_tentative)
            .bind(SESSION_TYPE_TEST_PREP)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<StudentTutoringSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM student_tutoring_sessions WHERE id = $1");
        sqlx::query_as::<_, StudentTutoringSession>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_student(
        pool: &PgPool,
        student_id: DbId,
    ) -> Result<Vec<StudentTutoringSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM student_tutoring_sessions WHERE student_id = $1
             ORDER BY starts_at, id"
        );
        sqlx::query_as::<_, StudentTutoringSession>(&query)
            .bind(student_id)
            .fetch_all(pool)
            .await
    }

    /// Flags needed to decide which of a student's sessions use up hours.
    pub async fn usage_for_student(
        pool: &PgPool,
        student_id: DbId,
    ) -> Result<Vec<SessionUsageRow>, sqlx::Error> {
        sqlx::query_as::<_, SessionUsageRow>(
            "SELECT s.duration_minutes, s.session_type, s.set_cancelled, s.late_cancel,
                    s.is_tentative,
                    (s.group_tutoring_session_id IS NOT NULL) AS is_group,
                    COALESCE(g.cancelled, false) AS group_cancelled
             FROM student_tutoring_sessions s
             LEFT JOIN group_tutoring_sessions g ON g.id = s.group_tutoring_session_id
             WHERE s.student_id = $1",
        )
        .bind(student_id)
        .fetch_all(pool)
        .await
    }

    pub async fn set_last_reminder_sent(
        pool: &PgPool,
        id: DbId,
        at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE student_tutoring_sessions SET last_reminder_sent = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Enroll a student in every session of the package they are not already in.
    ///
    /// Returns the ids of the sessions created.
    pub async fn enroll_in_package_group_sessions(
        pool: &PgPool,
        student_id: DbId,
        tutoring_package_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO student_tutoring_sessions
                (student_id, group_tutoring_session_id, session_type, starts_at, ends_at,
                 duration_minutes)
             SELECT $1, g.id, $3, g.starts_at, g.ends_at, g.charge_student_duration
             FROM group_tutoring_sessions g
             JOIN group_tutoring_session_packages gp ON gp.group_tutoring_session_id = g.id
             WHERE gp.tutoring_package_id = $2
               AND NOT EXISTS (
                   SELECT 1 FROM student_tutoring_sessions s
                   WHERE s.group_tutoring_session_id = g.id AND s.student_id = $1
               )
             RETURNING id",
        )
        .bind(student_id)
        .bind(tutoring_package_id)
        .bind(SESSION_TYPE_TEST_PREP)
        .fetch_all(pool)
        .await
    }

    /// Cancel a student's future, non-missed sessions of a package's group sessions.
    pub async fn cancel_future_package_sessions(
        pool: &PgPool,
        student_id: DbId,
        tutoring_package_id: DbId,
        now: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE student_tutoring_sessions s SET set_cancelled = true
             FROM group_tutoring_session_packages gp
             WHERE gp.group_tutoring_session_id = s.group_tutoring_session_id
               AND gp.tutoring_package_id = $2
               AND s.student_id = $1 AND s.missed = false AND s.starts_at > $3",
        )
        .bind(student_id)
        .bind(tutoring_package_id)
        .bind(now)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    // -----------------------------------------------------------------------
    // Tutor queries
    // -----------------------------------------------------------------------

    /// A tutor's payable individual sessions in `[start, end)`: not
    /// tentative, and either not cancelled or cancelled late.
    pub async fn list_payable_individual(
        pool: &PgPool,
        tutor_id: DbId,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<StudentTutoringSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM student_tutoring_sessions
             WHERE individual_session_tutor_id = $1
               AND starts_at >= $2 AND starts_at < $3
               AND is_tentative = false
               AND (set_cancelled = false OR late_cancel = true)
             ORDER BY starts_at, id"
        );
        sqlx::query_as::<_, StudentTutoringSession>(&query)
            .bind(tutor_id)
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await
    }

    /// A tutor's upcoming individual sessions in `[start, end)`, not cancelled.
    pub async fn list_upcoming_for_tutor(
        pool: &PgPool,
        tutor_id: DbId,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<StudentTutoringSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM student_tutoring_sessions
             WHERE individual_session_tutor_id = $1 AND set_cancelled = false
               AND starts_at >= $2 AND starts_at < $3
             ORDER BY starts_at, id"
        );
        sqlx::query_as::<_, StudentTutoringSession>(&query)
            .bind(tutor_id)
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await
    }

    /// Non-cancelled, non-tentative student sessions starting in `(after, until]`.
    pub async fn list_starting_between(
        pool: &PgPool,
        after: Timestamp,
        until: Timestamp,
    ) -> Result<Vec<StudentTutoringSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM student_tutoring_sessions
             WHERE set_cancelled = false AND is_tentative = false AND student_id IS NOT NULL
               AND starts_at > $1 AND starts_at <= $2
             ORDER BY starts_at, id"
        );
        sqlx::query_as::<_, StudentTutoringSession>(&query)
            .bind(after)
            .bind(until)
            .fetch_all(pool)
            .await
    }

    /// Whether the student has a non-cancelled individual session after `after`.
    pub async fn has_later_individual(
        pool: &PgPool,
        student_id: DbId,
        after: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM student_tutoring_sessions
                WHERE student_id = $1 AND set_cancelled = false
                  AND individual_session_tutor_id IS NOT NULL AND starts_at > $2
             )",
        )
        .bind(student_id)
        .bind(after)
        .fetch_one(pool)
        .await
    }

    /// Individual sessions held in `[start, end]` that were the student's
    /// first: no earlier individual session that was neither cancelled nor
    /// missed.
    pub async fn list_first_individual_between(
        pool: &PgPool,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<StudentTutoringSession>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM student_tutoring_sessions s
             WHERE s.individual_session_tutor_id IS NOT NULL AND s.student_id IS NOT NULL
               AND s.starts_at >= $1 AND s.starts_at <= $2
               AND s.set_cancelled = false AND s.missed = false AND s.is_tentative = false
               AND NOT EXISTS (
                   SELECT 1 FROM student_tutoring_sessions e
                   WHERE e.student_id = s.student_id AND e.starts_at < s.starts_at
                     AND e.individual_session_tutor_id IS NOT NULL
                     AND e.set_cancelled = false AND e.missed = false)
             ORDER BY s.starts_at, s.id",
            qualify(COLUMNS, "s")
        );
        sqlx::query_as::<_, StudentTutoringSession>(&query)
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Group sessions
    // -----------------------------------------------------------------------

    pub async fn create_group(
        pool: &PgPool,
        input: &CreateGroupTutoringSession,
    ) -> Result<GroupTutoringSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO group_tutoring_sessions
                (title, primary_tutor_id, starts_at, ends_at, charge_student_duration)
             VALUES ($1, $2, $3, $4, COALESCE($5, 0))
             RETURNING {GROUP_COLUMNS}"
        );
        sqlx::query_as::<_, GroupTutoringSession>(&query)
            .bind(&input.title)
            .bind(input.primary_tutor_id)
            .bind(input.starts_at)
            .bind(input.ends_at)
            .bind(input.charge_student_duration)
            .fetch_one(pool)
            .await
    }

    pub async fn find_group(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<GroupTutoringSession>, sqlx::Error> {
        let query = format!("SELECT {GROUP_COLUMNS} FROM group_tutoring_sessions WHERE id = $1");
        sqlx::query_as::<_, GroupTutoringSession>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn add_support_tutor(
        pool: &PgPool,
        group_tutoring_session_id: DbId,
        tutor_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO group_tutoring_session_support_tutors
                (group_tutoring_session_id, tutor_id)
             VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(group_tutoring_session_id)
        .bind(tutor_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Non-cancelled group sessions in `[start, end)` where the tutor is
    /// primary or support.
    pub async fn list_group_for_tutor(
        pool: &PgPool,
        tutor_id: DbId,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<GroupTutoringSession>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM group_tutoring_sessions g
             WHERE g.cancelled = false AND g.starts_at >= $2 AND g.starts_at < $3
               AND (g.primary_tutor_id = $1 OR EXISTS (
                   SELECT 1 FROM group_tutoring_session_support_tutors st
                   WHERE st.group_tutoring_session_id = g.id AND st.tutor_id = $1
               ))
             ORDER BY g.starts_at, g.id",
            qualify(GROUP_COLUMNS, "g")
        );
        sqlx::query_as::<_, GroupTutoringSession>(&query)
            .bind(tutor_id)
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await
    }

    /// Non-cancelled group sessions starting in `(after, until]`.
    pub async fn list_group_starting_between(
        pool: &PgPool,
        after: Timestamp,
        until: Timestamp,
    ) -> Result<Vec<GroupTutoringSession>, sqlx::Error> {
        let query = format!(
            "SELECT {GROUP_COLUMNS} FROM group_tutoring_sessions
             WHERE cancelled = false AND starts_at > $1 AND starts_at <= $2
             ORDER BY starts_at, id"
        );
        sqlx::query_as::<_, GroupTutoringSession>(&query)
            .bind(after)
            .bind(until)
            .fetch_all(pool)
            .await
    }

    pub async fn set_group_last_reminder_sent(
        pool: &PgPool,
        id: DbId,
        at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE group_tutoring_sessions SET last_reminder_sent = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn cancel_group(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE group_tutoring_sessions SET cancelled = true WHERE id = $1 AND cancelled = false",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
