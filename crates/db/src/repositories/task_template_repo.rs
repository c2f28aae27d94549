//! Repository for the `task_templates` and `diagnostics` tables.

use sqlx::PgPool;
use schoolnet_core::types::DbId;

use crate::models::task::{CreateTaskTemplate, Diagnostic, TaskTemplate};
use crate::repositories::qualify;

const COLUMNS: &str = "id, title, description, roadmap_key, task_type, counseling_parent_task, \
                        created_by_id, diagnostic_id, archived, created_at, updated_at";

/// Provides CRUD operations for task templates.
pub struct TaskTemplateRepo;

impl TaskTemplateRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateTaskTemplate,
    ) -> Result<TaskTemplate, sqlx::Error> {
        let query = format!(
            "INSERT INTO task_templates
                (title, description, roadmap_key, task_type, counseling_parent_task,
                 created_by_id, diagnostic_id)
             VALUES ($1, COALESCE($2, ''), COALESCE($3, ''), COALESCE($4, ''),
                     COALESCE($5, false), $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TaskTemplate>(&query)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.roadmap_key)
            .bind(&input.task_type)
            .bind(input.counseling_parent_task)
            .bind(input.created_by_id)
            .bind(input.diagnostic_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<TaskTemplate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM task_templates WHERE id = $1");
        sqlx::query_as::<_, TaskTemplate>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// A counselor's own unarchived version of a roadmap template.
    pub async fn find_counselor_override(
        pool: &PgPool,
        roadmap_key: &str,
        counselor_user_id: DbId,
    ) -> Result<Option<TaskTemplate>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM task_templates
             WHERE roadmap_key = $1 AND created_by_id = $2 AND archived IS NULL
             ORDER BY id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, TaskTemplate>(&query)
            .bind(roadmap_key)
            .bind(counselor_user_id)
            .fetch_optional(pool)
            .await
    }

    /// Templates attached (pre or post) to the agenda items of the given
    /// meetings, skipping templates the user already has a task for.
    pub async fn list_for_meetings(
        pool: &PgPool,
        counselor_meeting_ids: &[DbId],
        exclude_user_id: DbId,
    ) -> Result<Vec<TaskTemplate>, sqlx::Error> {
        let query = format!(
            "SELECT DISTINCT {} FROM task_templates tt
             JOIN agenda_item_template_tasks ait ON ait.task_template_id = tt.id
             JOIN agenda_items ai ON ai.agenda_item_template_id = ait.agenda_item_template_id
             WHERE ai.counselor_meeting_id = ANY($1)
               AND NOT EXISTS (
                   SELECT 1 FROM tasks t
                   WHERE t.task_template_id = tt.id AND t.for_user_id = $2
               )
             ORDER BY tt.id",
            qualify(COLUMNS, "tt")
        );
        sqlx::query_as::<_, TaskTemplate>(&query)
            .bind(counselor_meeting_ids)
            .bind(exclude_user_id)
            .fetch_all(pool)
            .await
    }

    /// Templates attached to any agenda item template of a roadmap.
    pub async fn list_for_roadmap(
        pool: &PgPool,
        roadmap_id: DbId,
    ) -> Result<Vec<TaskTemplate>, sqlx::Error> {
        let query = format!(
            "SELECT DISTINCT {} FROM task_templates tt
             JOIN agenda_item_template_tasks ait ON ait.task_template_id = tt.id
             JOIN agenda_item_templates itpl ON itpl.id = ait.agenda_item_template_id
             JOIN counselor_meeting_templates cmt ON cmt.id = itpl.counselor_meeting_template_id
             WHERE cmt.roadmap_id = $1
             ORDER BY tt.id",
            qualify(COLUMNS, "tt")
        );
        sqlx::query_as::<_, TaskTemplate>(&query)
            .bind(roadmap_id)
            .fetch_all(pool)
            .await
    }

    /// Attach a template to an agenda item template as a pre- or post-meeting task.
    pub async fn link_to_agenda_item_template(
        pool: &PgPool,
        agenda_item_template_id: DbId,
        task_template_id: DbId,
        kind: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO agenda_item_template_tasks (agenda_item_template_id, task_template_id, kind)
             VALUES ($1, $2, $3)
             ON CONFLICT DO NOTHING",
        )
        .bind(agenda_item_template_id)
        .bind(task_template_id)
        .bind(kind)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// First meeting template whose agenda references the task template.
    pub async fn meeting_template_for(
        pool: &PgPool,
        task_template_id: DbId,
    ) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT itpl.counselor_meeting_template_id FROM agenda_item_template_tasks ait
             JOIN agenda_item_templates itpl ON itpl.id = ait.agenda_item_template_id
             WHERE ait.task_template_id = $1 AND itpl.counselor_meeting_template_id IS NOT NULL
             ORDER BY itpl.counselor_meeting_template_id
             LIMIT 1",
        )
        .bind(task_template_id)
        .fetch_optional(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Diagnostics
    // -----------------------------------------------------------------------

    pub async fn create_diagnostic(
        pool: &PgPool,
        title: &str,
        description: &str,
    ) -> Result<Diagnostic, sqlx::Error> {
        sqlx::query_as::<_, Diagnostic>(
            "INSERT INTO diagnostics (title, description) VALUES ($1, $2)
             RETURNING id, title, description, created_at, updated_at",
        )
        .bind(title)
        .bind(description)
        .fetch_one(pool)
        .await
    }
}
