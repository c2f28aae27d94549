//! Repository for roadmaps, their meeting templates and agenda item templates.

use sqlx::PgPool;
use schoolnet_core::types::{DbId, Timestamp};

use crate::models::counseling::{AgendaItemTemplate, CounselorMeetingTemplate, Roadmap};

const COLUMNS: &str = "id, title, description, active, created_at, updated_at";

const MEETING_TEMPLATE_COLUMNS: &str =
    "id, roadmap_id, title, description, sort_order, created_at, updated_at";

const AGENDA_TEMPLATE_COLUMNS: &str = "id, counselor_meeting_template_id, counselor_title, \
                                        student_title, sort_order, active, created_at, updated_at";

/// Provides CRUD operations for roadmaps and application bookkeeping.
pub struct RoadmapRepo;

impl RoadmapRepo {
    pub async fn create(
        pool: &PgPool,
        title: &str,
        description: &str,
    ) -> Result<Roadmap, sqlx::Error> {
        let query = format!(
            "INSERT INTO roadmaps (title, description) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Roadmap>(&query)
            .bind(title)
            .bind(description)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Roadmap>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM roadmaps WHERE id = $1");
        sqlx::query_as::<_, Roadmap>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Templates
    // -----------------------------------------------------------------------

    pub async fn create_meeting_template(
        pool: &PgPool,
        roadmap_id: Option<DbId>,
        title: &str,
        sort_order: i16,
    ) -> Result<CounselorMeetingTemplate, sqlx::Error> {
        let query = format!(
            "INSERT INTO counselor_meeting_templates (roadmap_id, title, sort_order)
             VALUES ($1, $2, $3)
             RETURNING {MEETING_TEMPLATE_COLUMNS}"
        );
        sqlx::query_as::<_, CounselorMeetingTemplate>(&query)
            .bind(roadmap_id)
            .bind(title)
            .bind(sort_order)
            .fetch_one(pool)
            .await
    }

    pub async fn find_meeting_template(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<CounselorMeetingTemplate>, sqlx::Error> {
        let query =
            format!("SELECT {MEETING_TEMPLATE_COLUMNS} FROM counselor_meeting_templates WHERE id = $1");
        sqlx::query_as::<_, CounselorMeetingTemplate>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Meeting templates of a roadmap in display order.
    pub async fn meeting_templates(
        pool: &PgPool,
        roadmap_id: DbId,
    ) -> Result<Vec<CounselorMeetingTemplate>, sqlx::Error> {
        let query = format!(
            "SELECT {MEETING_TEMPLATE_COLUMNS} FROM counselor_meeting_templates
             WHERE roadmap_id = $1
             ORDER BY sort_order, id"
        );
        sqlx::query_as::<_, CounselorMeetingTemplate>(&query)
            .bind(roadmap_id)
            .fetch_all(pool)
            .await
    }

    pub async fn create_agenda_item_template(
        pool: &PgPool,
        counselor_meeting_template_id: DbId,
        counselor_title: &str,
        student_title: &str,
        sort_order: i32,
    ) -> Result<AgendaItemTemplate, sqlx::Error> {
        let query = format!(
            "INSERT INTO agenda_item_templates
                (counselor_meeting_template_id, counselor_title, student_title, sort_order)
             VALUES ($1, $2, $3, $4)
             RETURNING {AGENDA_TEMPLATE_COLUMNS}"
        );
        sqlx::query_as::<_, AgendaItemTemplate>(&query)
            .bind(counselor_meeting_template_id)
            .bind(counselor_title)
            .bind(student_title)
            .bind(sort_order)
            .fetch_one(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Application to students
    // -----------------------------------------------------------------------

    pub async fn is_applied(
        pool: &PgPool,
        student_id: DbId,
        roadmap_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM student_roadmaps WHERE student_id = $1 AND roadmap_id = $2
             )",
        )
        .bind(student_id)
        .bind(roadmap_id)
        .fetch_one(pool)
        .await
    }

    pub async fn record_application(
        pool: &PgPool,
        student_id: DbId,
        roadmap_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO student_roadmaps (student_id, roadmap_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(student_id)
        .bind(roadmap_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Remove what a roadmap left behind for a student: meetings that are
    /// unscheduled or end after `now`, incomplete tasks whose template hangs
    /// off the roadmap's agenda, and the application record.
    ///
    /// Returns `(meetings_deleted, tasks_deleted)`.
    pub async fn unapply(
        pool: &PgPool,
        student_id: DbId,
        student_user_id: DbId,
        roadmap_id: DbId,
        now: Timestamp,
    ) -> Result<(u64, u64), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let meetings = sqlx::query(
            "DELETE FROM counselor_meetings m
             USING counselor_meeting_templates cmt
             WHERE m.counselor_meeting_template_id = cmt.id AND cmt.roadmap_id = $2
               AND m.student_id = $1
               AND (m.ends_at IS NULL OR m.ends_at > $3)",
        )
        .bind(student_id)
        .bind(roadmap_id)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let tasks = sqlx::query(
            "DELETE FROM tasks t
             WHERE t.for_user_id = $1 AND t.completed IS NULL
               AND t.task_template_id IN (
                   SELECT ait.task_template_id FROM agenda_item_template_tasks ait
                   JOIN agenda_item_templates itpl ON itpl.id = ait.agenda_item_template_id
                   JOIN counselor_meeting_templates cmt
                        ON cmt.id = itpl.counselor_meeting_template_id
                   WHERE cmt.roadmap_id = $2
               )",
        )
        .bind(student_user_id)
        .bind(roadmap_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query("DELETE FROM student_roadmaps WHERE student_id = $1 AND roadmap_id = $2")
            .bind(student_id)
            .bind(roadmap_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((meetings, tasks))
    }
}
