//! Repository for the `tasks` table.

use sqlx::PgPool;
use schoolnet_core::types::{DbId, Timestamp};

use crate::models::task::{CreateTask, StudentTaskRow, Task};
use crate::repositories::qualify;

const COLUMNS: &str = "id, for_user_id, task_template_id, created_by_id, title, description, \
                        task_type, due, assigned_time, completed, archived, \
                        visible_to_counseling_student, last_reminder_sent, diagnostic_id, \
                        counselor_meeting_template_id, created_at, updated_at";

/// SQL predicate (over alias `t`) matching tasks a student can see: tutoring
/// tasks always, counseling tasks only once made visible.
const VISIBLE_TO_STUDENT: &str = "(t.visible_to_counseling_student OR \
     (t.task_template_id IS NULL AND NOT EXISTS \
        (SELECT 1 FROM counselors c WHERE c.user_id = t.created_by_id)))";

const STUDENT_TASK_COLUMNS: &str = "t.id AS task_id, t.title, t.due, t.completed, \
                                    t.assigned_time, t.last_reminder_sent, t.for_user_id, \
                                    s.id AS student_id";

/// Provides CRUD operations for tasks.
pub struct TaskRepo;

impl TaskRepo {
    /// Insert a task. `assigned_time` is decided by the caller.
    pub async fn create(
        pool: &PgPool,
        input: &CreateTask,
        assigned_time: Option<Timestamp>,
    ) -> Result<Task, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks
                (for_user_id, task_template_id, created_by_id, title, description, task_type,
                 due, visible_to_counseling_student, diagnostic_id,
                 counselor_meeting_template_id, assigned_time)
             VALUES ($1, $2, $3, $4, COALESCE($5, ''), COALESCE($6, ''), $7,
                     COALESCE($8, false), $9, $10, $11)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(input.for_user_id)
            .bind(input.task_template_id)
            .bind(input.created_by_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.task_type)
            .bind(input.due)
            .bind(input.visible_to_counseling_student)
            .bind(input.diagnostic_id)
            .bind(input.counselor_meeting_template_id)
            .bind(assigned_time)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Task>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<Task>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tasks WHERE for_user_id = $1 AND archived IS NULL
             ORDER BY due NULLS LAST, id"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Whether the user already has a task created from this template.
    pub async fn user_has_template(
        pool: &PgPool,
        user_id: DbId,
        task_template_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM tasks WHERE for_user_id = $1 AND task_template_id = $2)",
        )
        .bind(user_id)
        .bind(task_template_id)
        .fetch_one(pool)
        .await
    }

    /// Stamp `completed`. Returns `None` if the task is missing or already complete.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        at: Timestamp,
    ) -> Result<Option<Task>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks SET completed = $2 WHERE id = $1 AND completed IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(at)
            .fetch_optional(pool)
            .await
    }

    pub async fn set_counselor_meeting_template(
        pool: &PgPool,
        id: DbId,
        counselor_meeting_template_id: Option<DbId>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tasks SET counselor_meeting_template_id = $2 WHERE id = $1")
            .bind(id)
            .bind(counselor_meeting_template_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_last_reminder_sent(
        pool: &PgPool,
        ids: &[DbId],
        at: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE tasks SET last_reminder_sent = $2 WHERE id = ANY($1)")
            .bind(ids)
            .bind(at)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    // -----------------------------------------------------------------------
    // Meeting tasks
    // -----------------------------------------------------------------------

    /// Tasks linked to a counselor meeting.
    pub async fn list_for_meeting(
        pool: &PgPool,
        counselor_meeting_id: DbId,
    ) -> Result<Vec<Task>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM tasks t
             JOIN counselor_meeting_tasks cmt ON cmt.task_id = t.id
             WHERE cmt.counselor_meeting_id = $1
             ORDER BY t.id",
            qualify(COLUMNS, "t")
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(counselor_meeting_id)
            .fetch_all(pool)
            .await
    }

    /// A student scheduled a meeting: undated tasks become due at the meeting
    /// start and visible.
    pub async fn schedule_meeting_tasks(
        pool: &PgPool,
        counselor_meeting_id: DbId,
        start: Timestamp,
        now: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tasks t SET
                due = $2,
                visible_to_counseling_student = true,
                assigned_time = COALESCE(t.assigned_time, $3)
             FROM counselor_meeting_tasks cmt
             WHERE cmt.task_id = t.id AND cmt.counselor_meeting_id = $1 AND t.due IS NULL",
        )
        .bind(counselor_meeting_id)
        .bind(start)
        .bind(now)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Meeting moved: tasks that were undated or due at the old start follow it.
    pub async fn reschedule_meeting_tasks(
        pool: &PgPool,
        counselor_meeting_id: DbId,
        old_start: Option<Timestamp>,
        new_start: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tasks t SET due = $3
             FROM counselor_meeting_tasks cmt
             WHERE cmt.task_id = t.id AND cmt.counselor_meeting_id = $1
               AND (t.due IS NULL OR t.due = $2)",
        )
        .bind(counselor_meeting_id)
        .bind(old_start)
        .bind(new_start)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    // -----------------------------------------------------------------------
    // Batch job queries
    // -----------------------------------------------------------------------

    /// Open, visible tasks of students and parents assigned at or after `since`.
    pub async fn list_assigned_since(
        pool: &PgPool,
        since: Timestamp,
    ) -> Result<Vec<StudentTaskRow>, sqlx::Error> {
        let query = format!(
            "SELECT {STUDENT_TASK_COLUMNS} FROM tasks t
             LEFT JOIN students s ON s.user_id = t.for_user_id
             LEFT JOIN parents p ON p.user_id = t.for_user_id
             WHERE t.assigned_time >= $1 AND t.completed IS NULL AND t.archived IS NULL
               AND (s.id IS NOT NULL OR p.id IS NOT NULL)
               AND {VISIBLE_TO_STUDENT}
             ORDER BY t.for_user_id, t.due NULLS LAST, t.id"
        );
        sqlx::query_as::<_, StudentTaskRow>(&query)
            .bind(since)
            .fetch_all(pool)
            .await
    }

    /// Open, visible tasks of any assignee due before `due_before`, excluding
    /// parent-only templates and students without platform access.
    pub async fn list_reminder_candidates(
        pool: &PgPool,
        due_before: Timestamp,
    ) -> Result<Vec<StudentTaskRow>, sqlx::Error> {
        let query = format!(
            "SELECT {STUDENT_TASK_COLUMNS} FROM tasks t
             LEFT JOIN students s ON s.user_id = t.for_user_id
             LEFT JOIN task_templates tt ON tt.id = t.task_template_id
             WHERE t.due IS NOT NULL AND t.due < $1
               AND t.completed IS NULL AND t.archived IS NULL
               AND COALESCE(tt.counseling_parent_task, false) = false
               AND COALESCE(s.has_access_to_cap, true)
               AND {VISIBLE_TO_STUDENT}
             ORDER BY t.for_user_id, t.due, t.id"
        );
        sqlx::query_as::<_, StudentTaskRow>(&query)
            .bind(due_before)
            .fetch_all(pool)
            .await
    }

    /// Tasks of a counselor's students completed in `[start, end)`.
    pub async fn list_completed_for_counselor(
        pool: &PgPool,
        counselor_id: DbId,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<StudentTaskRow>, sqlx::Error> {
        let query = format!(
            "SELECT {STUDENT_TASK_COLUMNS} FROM tasks t
             JOIN students s ON s.user_id = t.for_user_id
             WHERE s.counselor_id = $1 AND t.completed >= $2 AND t.completed < $3
               AND t.archived IS NULL
             ORDER BY s.id, t.completed, t.id"
        );
        sqlx::query_as::<_, StudentTaskRow>(&query)
            .bind(counselor_id)
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await
    }

    /// Open, visible tasks for a student due before `before`.
    pub async fn list_overdue_for_student(
        pool: &PgPool,
        student_id: DbId,
        before: Timestamp,
    ) -> Result<Vec<StudentTaskRow>, sqlx::Error> {
        let query = format!(
            "SELECT {STUDENT_TASK_COLUMNS} FROM tasks t
             JOIN students s ON s.user_id = t.for_user_id
             WHERE s.id = $1 AND t.due < $2 AND t.completed IS NULL AND t.archived IS NULL
               AND {VISIBLE_TO_STUDENT}
             ORDER BY t.due, t.id"
        );
        sqlx::query_as::<_, StudentTaskRow>(&query)
            .bind(student_id)
            .bind(before)
            .fetch_all(pool)
            .await
    }
}
