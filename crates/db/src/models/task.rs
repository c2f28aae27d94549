//! Task, task template and diagnostic models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use schoolnet_core::types::{DbId, Timestamp};

/// A row from the `diagnostics` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Diagnostic {
    pub id: DbId,
    pub title: String,
    pub description: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `task_templates` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TaskTemplate {
    pub id: DbId,
    pub title: String,
    pub description: String,
    pub roadmap_key: String,
    pub task_type: String,
    pub counseling_parent_task: bool,
    pub created_by_id: Option<DbId>,
    pub diagnostic_id: Option<DbId>,
    pub archived: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTaskTemplate {
    pub title: String,
    pub description: Option<String>,
    pub roadmap_key: Option<String>,
    pub task_type: Option<String>,
    pub counseling_parent_task: Option<bool>,
    pub created_by_id: Option<DbId>,
    pub diagnostic_id: Option<DbId>,
}

/// A row from the `tasks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Task {
    pub id: DbId,
    pub for_user_id: DbId,
    pub task_template_id: Option<DbId>,
    pub created_by_id: Option<DbId>,
    pub title: String,
    pub description: String,
    pub task_type: String,
    pub due: Option<Timestamp>,
    pub assigned_time: Option<Timestamp>,
    pub completed: Option<Timestamp>,
    pub archived: Option<Timestamp>,
    pub visible_to_counseling_student: bool,
    pub last_reminder_sent: Option<Timestamp>,
    pub diagnostic_id: Option<DbId>,
    pub counselor_meeting_template_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Insert DTO. The managers layer fills it from a template when one is used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTask {
    pub for_user_id: DbId,
    pub task_template_id: Option<DbId>,
    pub created_by_id: Option<DbId>,
    pub title: String,
    pub description: Option<String>,
    pub task_type: Option<String>,
    pub due: Option<Timestamp>,
    pub visible_to_counseling_student: Option<bool>,
    pub diagnostic_id: Option<DbId>,
    pub counselor_meeting_template_id: Option<DbId>,
}

/// A task joined with its assignee's student profile, for reminder and
/// digest jobs. `student_id` is empty when the assignee is not a student.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StudentTaskRow {
    pub task_id: DbId,
    pub title: String,
    pub due: Option<Timestamp>,
    pub completed: Option<Timestamp>,
    pub assigned_time: Option<Timestamp>,
    pub last_reminder_sent: Option<Timestamp>,
    pub for_user_id: DbId,
    pub student_id: Option<DbId>,
}
