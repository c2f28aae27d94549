//! Applying a roadmap to a student, and taking it back off.

use chrono::Utc;
use schoolnet_core::types::DbId;
use schoolnet_db::models::counseling::CounselorMeeting;
use schoolnet_db::models::task::{CreateTask, Task};
use schoolnet_db::repositories::{
    CounselorMeetingRepo, RoadmapRepo, StudentRepo, TaskRepo, TaskTemplateRepo,
};
use schoolnet_db::DbPool;
use schoolnet_events::Notifier;
use serde::Serialize;

use crate::counselor_meetings::CounselorMeetingManager;
use crate::error::{ManagerError, ManagerResult};
use crate::tasks::TaskManager;

/// What applying a roadmap created.
#[derive(Debug, Serialize)]
pub struct AppliedRoadmap {
    pub meetings: Vec<CounselorMeeting>,
    pub tasks: Vec<Task>,
}

/// What unapplying a roadmap removed.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct UnappliedRoadmap {
    pub meetings_deleted: u64,
    pub tasks_deleted: u64,
}

pub struct RoadmapManager {
    pool: DbPool,
    meetings: CounselorMeetingManager,
    tasks: TaskManager,
}

impl RoadmapManager {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            pool: notifier.pool().clone(),
            meetings: CounselorMeetingManager::new(notifier.clone()),
            tasks: TaskManager::new(notifier),
        }
    }

    /// Create the roadmap's meetings and tasks for a student.
    ///
    /// Tasks for templates on the new meetings' agenda items are linked to
    /// the meetings carrying their roadmap key. Every other template on the
    /// roadmap still becomes a task, tagged with the meeting template it
    /// belongs to, so the student's task bank is complete.
    pub async fn apply(&self, roadmap_id: DbId, student_id: DbId) -> ManagerResult<AppliedRoadmap> {
        RoadmapRepo::find_by_id(&self.pool, roadmap_id)
            .await?
            .ok_or_else(|| ManagerError::not_found("Roadmap", roadmap_id))?;
        let student = StudentRepo::find_by_id(&self.pool, student_id)
            .await?
            .ok_or_else(|| ManagerError::not_found("Student", student_id))?;
        if RoadmapRepo::is_applied(&self.pool, student_id, roadmap_id).await? {
            return Err(ManagerError::conflict("Roadmap already applied to student"));
        }

        let mut meetings = Vec::new();
        for template in RoadmapRepo::meeting_templates(&self.pool, roadmap_id).await? {
            meetings.push(
                self.meetings
                    .create_meeting(student_id, Some(template.id), None)
                    .await?,
            );
        }
        let meeting_ids: Vec<DbId> = meetings.iter().map(|m| m.id).collect();

        let mut tasks = Vec::new();
        let meeting_templates =
            TaskTemplateRepo::list_for_meetings(&self.pool, &meeting_ids, student.user_id).await?;
        for template in &meeting_templates {
            let task = self.create_from_template(student.user_id, template.id).await?;
            if !template.roadmap_key.is_empty() {
                let linked = CounselorMeetingRepo::ids_for_roadmap_key(
                    &self.pool,
                    student_id,
                    &template.roadmap_key,
                )
                .await?;
                for meeting_id in linked {
                    CounselorMeetingRepo::link_task(&self.pool, meeting_id, task.id).await?;
                }
            }
            tasks.push(task);
        }

        for template in TaskTemplateRepo::list_for_roadmap(&self.pool, roadmap_id).await? {
            if meeting_templates.iter().any(|t| t.id == template.id)
                || TaskRepo::user_has_template(&self.pool, student.user_id, template.id).await?
            {
                continue;
            }
            let task = self.create_from_template(student.user_id, template.id).await?;
            let meeting_template = TaskTemplateRepo::meeting_template_for(&self.pool, template.id).await?;
            TaskRepo::set_counselor_meeting_template(
                &self.pool,
                task.id,
                meeting_template,
            )
            .await?;
            tasks.push(Task {
                counselor_meeting_template_id: meeting_template,
                ..task
            });
        }

        RoadmapRepo::record_application(&self.pool, student_id, roadmap_id).await?;
        tracing::info!(
            roadmap_id,
            student_id,
            meetings = meetings.len(),
            tasks = tasks.len(),
            "Roadmap applied"
        );
        Ok(AppliedRoadmap { meetings, tasks })
    }

    async fn create_from_template(&self, user_id: DbId, template_id: DbId) -> ManagerResult<Task> {
        self.tasks
            .create_task(
                Some(template_id),
                CreateTask {
                    for_user_id: user_id,
                    ..Default::default()
                },
            )
            .await
    }

    /// Delete the roadmap's unscheduled and future meetings and its
    /// incomplete tasks for the student.
    pub async fn unapply(&self, roadmap_id: DbId, student_id: DbId) -> ManagerResult<UnappliedRoadmap> {
        let student = StudentRepo::find_by_id(&self.pool, student_id)
            .await?
            .ok_or_else(|| ManagerError::not_found("Student", student_id))?;
        if !RoadmapRepo::is_applied(&self.pool, student_id, roadmap_id).await? {
            return Err(ManagerError::validation(format!(
                "Roadmap {roadmap_id} has not been applied to student {student_id}"
            )));
        }

        let (meetings_deleted, tasks_deleted) =
            RoadmapRepo::unapply(&self.pool, student_id, student.user_id, roadmap_id, Utc::now())
                .await?;
        tracing::info!(roadmap_id, student_id, meetings_deleted, tasks_deleted, "Roadmap unapplied");
        Ok(UnappliedRoadmap {
            meetings_deleted,
            tasks_deleted,
        })
    }
}
