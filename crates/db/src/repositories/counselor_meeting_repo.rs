//! Repository for the `counselor_meetings` and `agenda_items` tables.

use sqlx::PgPool;
use schoolnet_core::types::{DbId, Timestamp};

use crate::models::counseling::{AgendaItem, CounselorMeeting};
use crate::repositories::qualify;

const COLUMNS: &str = "id, student_id, counselor_meeting_template_id, title, starts_at, ends_at, \
                        cancelled, last_reminder_sent, notes_message_note, \
                        notes_message_subject, notes_message_last_sent, notes_finalized, \
                        created_at, updated_at";

const AGENDA_COLUMNS: &str = "id, counselor_meeting_id, agenda_item_template_id, \
                               counselor_title, student_title, sort_order, created_at";

/// Provides CRUD operations for counselor meetings.
pub struct CounselorMeetingRepo;

impl CounselorMeetingRepo {
    /// Create a meeting and copy the active agenda item templates of its
    /// meeting template into agenda items, in one transaction.
    pub async fn create(
        pool: &PgPool,
        student_id: DbId,
        counselor_meeting_template_id: Option<DbId>,
        title: &str,
    ) -> Result<CounselorMeeting, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO counselor_meetings (student_id, counselor_meeting_template_id, title)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        let meeting = sqlx::query_as::<_, CounselorMeeting>(&query)
            .bind(student_id)
            .bind(counselor_meeting_template_id)
            .bind(title)
            .fetch_one(&mut *tx)
            .await?;

        if let Some(template_id) = counselor_meeting_template_id {
            sqlx::query(
                "INSERT INTO agenda_items
                    (counselor_meeting_id, agenda_item_template_id, counselor_title,
                     student_title, sort_order)
                 SELECT $1, id, counselor_title, student_title, sort_order
                 FROM agenda_item_templates
                 WHERE counselor_meeting_template_id = $2 AND active = true
                 ORDER BY sort_order, id",
            )
            .bind(meeting.id)
            .bind(template_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(meeting)
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<CounselorMeeting>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM counselor_meetings WHERE id = $1");
        sqlx::query_as::<_, CounselorMeeting>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_student(
        pool: &PgPool,
        student_id: DbId,
    ) -> Result<Vec<CounselorMeeting>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM counselor_meetings WHERE student_id = $1
             ORDER BY starts_at NULLS LAST, id"
        );
        sqlx::query_as::<_, CounselorMeeting>(&query)
            .bind(student_id)
            .fetch_all(pool)
            .await
    }

    pub async fn agenda_items(
        pool: &PgPool,
        counselor_meeting_id: DbId,
    ) -> Result<Vec<AgendaItem>, sqlx::Error> {
        let query = format!(
            "SELECT {AGENDA_COLUMNS} FROM agenda_items WHERE counselor_meeting_id = $1
             ORDER BY sort_order, id"
        );
        sqlx::query_as::<_, AgendaItem>(&query)
            .bind(counselor_meeting_id)
            .fetch_all(pool)
            .await
    }

    /// Set the meeting span. Returns `None` if the meeting does not exist.
    pub async fn set_times(
        pool: &PgPool,
        id: DbId,
        starts_at: Timestamp,
        ends_at: Timestamp,
    ) -> Result<Option<CounselorMeeting>, sqlx::Error> {
        let query = format!(
            "UPDATE counselor_meetings SET starts_at = $2, ends_at = $3 WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CounselorMeeting>(&query)
            .bind(id)
            .bind(starts_at)
            .bind(ends_at)
            .fetch_optional(pool)
            .await
    }

    /// Stamp `cancelled` unless the meeting is already cancelled.
    pub async fn cancel(
        pool: &PgPool,
        id: DbId,
        at: Timestamp,
    ) -> Result<Option<CounselorMeeting>, sqlx::Error> {
        let query = format!(
            "UPDATE counselor_meetings SET cancelled = $2 WHERE id = $1 AND cancelled IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CounselorMeeting>(&query)
            .bind(id)
            .bind(at)
            .fetch_optional(pool)
            .await
    }

    pub async fn set_last_reminder_sent(
        pool: &PgPool,
        id: DbId,
        at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE counselor_meetings SET last_reminder_sent = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Save the notes message that was just sent and finalize the notes.
    pub async fn record_notes_sent(
        pool: &PgPool,
        id: DbId,
        subject: &str,
        note: &str,
        at: Timestamp,
    ) -> Result<Option<CounselorMeeting>, sqlx::Error> {
        let query = format!(
            "UPDATE counselor_meetings SET
                notes_message_subject = $2,
                notes_message_note = $3,
                notes_message_last_sent = $4,
                notes_finalized = true
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CounselorMeeting>(&query)
            .bind(id)
            .bind(subject)
            .bind(note)
            .bind(at)
            .fetch_optional(pool)
            .await
    }

    pub async fn link_task(
        pool: &PgPool,
        counselor_meeting_id: DbId,
        task_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO counselor_meeting_tasks (counselor_meeting_id, task_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(counselor_meeting_id)
        .bind(task_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// A student's meetings whose agenda items carry a task template with this roadmap key.
    pub async fn ids_for_roadmap_key(
        pool: &PgPool,
        student_id: DbId,
        roadmap_key: &str,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT DISTINCT m.id FROM counselor_meetings m
             JOIN agenda_items ai ON ai.counselor_meeting_id = m.id
             JOIN agenda_item_template_tasks ait
                  ON ait.agenda_item_template_id = ai.agenda_item_template_id
             JOIN task_templates tt ON tt.id = ait.task_template_id
             WHERE m.student_id = $1 AND tt.roadmap_key = $2
             ORDER BY m.id",
        )
        .bind(student_id)
        .bind(roadmap_key)
        .fetch_all(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Batch job queries
    // -----------------------------------------------------------------------

    /// Non-cancelled meetings starting in `(after, until]`.
    pub async fn list_starting_between(
        pool: &PgPool,
        after: Timestamp,
        until: Timestamp,
    ) -> Result<Vec<CounselorMeeting>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM counselor_meetings
             WHERE cancelled IS NULL AND starts_at > $1 AND starts_at <= $2
             ORDER BY starts_at, id"
        );
        sqlx::query_as::<_, CounselorMeeting>(&query)
            .bind(after)
            .bind(until)
            .fetch_all(pool)
            .await
    }

    /// A counselor's non-cancelled meetings starting in `[start, end)`.
    pub async fn list_for_counselor_between(
        pool: &PgPool,
        counselor_id: DbId,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<CounselorMeeting>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM counselor_meetings m
             JOIN students s ON s.id = m.student_id
             WHERE s.counselor_id = $1 AND m.cancelled IS NULL
               AND m.starts_at >= $2 AND m.starts_at < $3
             ORDER BY m.starts_at, m.id",
            qualify(COLUMNS, "m")
        );
        sqlx::query_as::<_, CounselorMeeting>(&query)
            .bind(counselor_id)
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await
    }
}
