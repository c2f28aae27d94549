//! Task creation from templates, and the created/completed notifications.

use chrono::Utc;
use schoolnet_core::notification_types as types;
use schoolnet_core::roles::{ROLE_COUNSELOR, ROLE_STUDENT};
use schoolnet_core::tasks::{
    completion_recipient, is_cap_task, should_set_assigned_time, suppress_task_notification,
    task_notification_type, use_counselor_override,
};
use schoolnet_core::types::DbId;
use schoolnet_db::models::task::{CreateTask, Task, TaskTemplate};
use schoolnet_db::repositories::{
    CounselorRepo, StudentRepo, TaskRepo, TaskTemplateRepo, UserRepo,
};
use schoolnet_db::DbPool;
use schoolnet_events::{NewNotification, Notifier};
use serde_json::json;

use crate::error::{ManagerError, ManagerResult};

const RELATED_TYPE: &str = "task";

pub struct TaskManager {
    pool: DbPool,
    notifier: Notifier,
}

impl TaskManager {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            pool: notifier.pool().clone(),
            notifier,
        }
    }

    async fn load(&self, task_id: DbId) -> ManagerResult<Task> {
        TaskRepo::find_by_id(&self.pool, task_id)
            .await?
            .ok_or_else(|| ManagerError::not_found("Task", task_id))
    }

    /// User id of the counselor assigned to the student behind `user_id`.
    async fn student_counselor_user(&self, user_id: DbId) -> ManagerResult<Option<DbId>> {
        let Some(student) = StudentRepo::find_by_user_id(&self.pool, user_id).await? else {
            return Ok(None);
        };
        let Some(counselor_id) = student.counselor_id else {
            return Ok(None);
        };
        Ok(CounselorRepo::find_by_id(&self.pool, counselor_id)
            .await?
            .map(|c| c.user_id))
    }

    async fn is_counselor(&self, user_id: Option<DbId>) -> ManagerResult<bool> {
        match user_id {
            Some(id) => Ok(UserRepo::find_by_id(&self.pool, id)
                .await?
                .is_some_and(|u| u.role == ROLE_COUNSELOR)),
            None => Ok(false),
        }
    }

    /// Create a task for `fields.for_user_id`. With a template, the
    /// template's content replaces the given fields, and roadmap templates
    /// give way to the student's counselor's own version when one exists.
    pub async fn create_task(
        &self,
        template_id: Option<DbId>,
        mut fields: CreateTask,
    ) -> ManagerResult<Task> {
        let template = match template_id {
            Some(id) => Some(self.resolve_template(fields.for_user_id, id).await?),
            None => None,
        };

        if let Some(template) = &template {
            fields.task_template_id = Some(template.id);
            fields.title = template.title.clone();
            fields.description = Some(template.description.clone());
            fields.created_by_id = template.created_by_id;
            fields.diagnostic_id = template.diagnostic_id;
            fields.task_type = Some(template.task_type.clone());
        }
        if fields.title.trim().is_empty() {
            return Err(ManagerError::validation("Task title is required"));
        }

        let is_cap = is_cap_task(
            fields.task_template_id.is_some(),
            self.is_counselor(fields.created_by_id).await?,
        );
        let visible = fields.visible_to_counseling_student.unwrap_or(false);
        let assigned_time = should_set_assigned_time(is_cap, visible).then(Utc::now);

        let task = TaskRepo::create(&self.pool, &fields, assigned_time).await?;
        tracing::debug!(task_id = task.id, for_user_id = task.for_user_id, is_cap, "Task created");
        Ok(task)
    }

    async fn resolve_template(&self, for_user_id: DbId, template_id: DbId) -> ManagerResult<TaskTemplate> {
        let template = TaskTemplateRepo::find_by_id(&self.pool, template_id)
            .await?
            .ok_or_else(|| ManagerError::not_found("TaskTemplate", template_id))?;

        let counselor_user = self.student_counselor_user(for_user_id).await?;
        if !use_counselor_override(
            Some(template.roadmap_key.as_str()),
            counselor_user,
            template.created_by_id,
        ) {
            return Ok(template);
        }
        let Some(counselor_user) = counselor_user else {
            return Ok(template);
        };
        Ok(
            TaskTemplateRepo::find_counselor_override(&self.pool, &template.roadmap_key, counselor_user)
                .await?
                .unwrap_or(template),
        )
    }

    /// Tell the task's owner it was assigned. Skipped for CAP students
    /// without platform access, and when already sent unless
    /// `allow_duplicate`.
    pub async fn send_task_created_notification(
        &self,
        task_id: DbId,
        actor_user_id: Option<DbId>,
        allow_duplicate: bool,
    ) -> ManagerResult<bool> {
        let task = self.load(task_id).await?;
        let owner = UserRepo::find_by_id(&self.pool, task.for_user_id)
            .await?
            .ok_or_else(|| ManagerError::not_found("User", task.for_user_id))?;

        let is_student = owner.role == ROLE_STUDENT;
        let has_access = if is_student {
            StudentRepo::find_by_user_id(&self.pool, owner.id)
                .await?
                .is_some_and(|s| s.has_access_to_cap)
        } else {
            true
        };
        let is_cap = is_cap_task(
            task.task_template_id.is_some(),
            self.is_counselor(task.created_by_id).await?,
        );
        if suppress_task_notification(is_student, has_access, is_cap) {
            return Ok(false);
        }

        let notification_type = task_notification_type(task.diagnostic_id.is_some());
        if !allow_duplicate
            && self
                .notifier
                .exists(owner.id, notification_type, RELATED_TYPE, task.id)
                .await?
        {
            return Ok(false);
        }

        self.notifier
            .create(
                NewNotification::new(notification_type)
                    .to_user(owner.id)
                    .actor(actor_user_id.or(task.created_by_id))
                    .related(RELATED_TYPE, task.id)
                    .args(json!({ "title": task.title })),
            )
            .await?;
        Ok(true)
    }

    /// Mark the task complete and tell its creator, or failing that the
    /// student's counselor.
    pub async fn complete_task(
        &self,
        task_id: DbId,
        actor_user_id: Option<DbId>,
        notify: bool,
    ) -> ManagerResult<Task> {
        let task = self.load(task_id).await?;
        if task.completed.is_some() {
            return Err(ManagerError::conflict("Task is already complete"));
        }
        let task = TaskRepo::complete(&self.pool, task_id, Utc::now())
            .await?
            .ok_or_else(|| ManagerError::conflict("Task is already complete"))?;

        if notify {
            self.send_task_completed_notification(&task, actor_user_id).await?;
        }
        Ok(task)
    }

    async fn send_task_completed_notification(
        &self,
        task: &Task,
        actor_user_id: Option<DbId>,
    ) -> ManagerResult<()> {
        let counselor_user = self.student_counselor_user(task.for_user_id).await?;
        let Some(recipient) = completion_recipient(task.created_by_id, counselor_user) else {
            return Ok(());
        };
        if self
            .notifier
            .exists(recipient, types::TASK_COMPLETE, RELATED_TYPE, task.id)
            .await?
        {
            return Ok(());
        }

        let owner_name = UserRepo::find_by_id(&self.pool, task.for_user_id)
            .await?
            .map(|u| u.full_name())
            .unwrap_or_default();
        self.notifier
            .create(
                NewNotification::new(types::TASK_COMPLETE)
                    .to_user(recipient)
                    .actor(actor_user_id)
                    .related(RELATED_TYPE, task.id)
                    .args(json!({ "name": owner_name, "title": task.title })),
            )
            .await?;
        Ok(())
    }
}
