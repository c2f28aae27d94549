//! Counselor meeting lifecycle: create, schedule, reschedule, cancel and
//! send notes. Every transition keeps the meeting's time entry and task due
//! dates in step and notifies the people involved.

use chrono::Utc;
use schoolnet_core::format::{format_datetime, format_day};
use schoolnet_core::notification_types as types;
use schoolnet_core::roles::{ROLE_PARENT, ROLE_STUDENT};
use schoolnet_core::time_cards::MEETING_CATEGORY;
use schoolnet_core::types::{DbId, Timestamp};
use schoolnet_db::models::counseling::{CounselorMeeting, CreateCounselorTimeEntry};
use schoolnet_db::models::user::{Counselor, Student, User};
use schoolnet_db::repositories::{
    CounselorMeetingRepo, CounselorRepo, CounselorTimeEntryRepo, ParentRepo, RoadmapRepo,
    StudentRepo, TaskRepo, UserRepo,
};
use schoolnet_db::DbPool;
use schoolnet_events::{NewNotification, Notifier};
use serde_json::json;

use crate::error::{ManagerError, ManagerResult};

const RELATED_TYPE: &str = "counselor_meeting";

/// Student and counselor on a meeting, with their user rows.
struct Parties {
    student: Student,
    student_user: User,
    counselor: Counselor,
    counselor_user: User,
}

pub struct CounselorMeetingManager {
    pool: DbPool,
    notifier: Notifier,
}

impl CounselorMeetingManager {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            pool: notifier.pool().clone(),
            notifier,
        }
    }

    async fn load(&self, meeting_id: DbId) -> ManagerResult<CounselorMeeting> {
        CounselorMeetingRepo::find_by_id(&self.pool, meeting_id)
            .await?
            .ok_or_else(|| ManagerError::not_found("CounselorMeeting", meeting_id))
    }

    async fn user(&self, user_id: DbId) -> ManagerResult<User> {
        UserRepo::find_by_id(&self.pool, user_id)
            .await?
            .ok_or_else(|| ManagerError::not_found("User", user_id))
    }

    async fn parties(&self, meeting: &CounselorMeeting) -> ManagerResult<Parties> {
        let student = StudentRepo::find_by_id(&self.pool, meeting.student_id)
            .await?
            .ok_or_else(|| ManagerError::not_found("Student", meeting.student_id))?;
        let counselor_id = student
            .counselor_id
            .ok_or_else(|| ManagerError::validation("Student has no counselor"))?;
        let counselor = CounselorRepo::find_by_id(&self.pool, counselor_id)
            .await?
            .ok_or_else(|| ManagerError::not_found("Counselor", counselor_id))?;
        Ok(Parties {
            student_user: self.user(student.user_id).await?,
            counselor_user: self.user(counselor.user_id).await?,
            student,
            counselor,
        })
    }

    /// Create an unscheduled meeting. With a template, its title is the
    /// default and its active agenda item templates become agenda items.
    pub async fn create_meeting(
        &self,
        student_id: DbId,
        template_id: Option<DbId>,
        title: Option<&str>,
    ) -> ManagerResult<CounselorMeeting> {
        let template_title = match template_id {
            Some(id) => Some(
                RoadmapRepo::find_meeting_template(&self.pool, id)
                    .await?
                    .ok_or_else(|| ManagerError::not_found("CounselorMeetingTemplate", id))?
                    .title,
            ),
            None => None,
        };
        let title = title.map(str::to_string).or(template_title).unwrap_or_default();
        Ok(CounselorMeetingRepo::create(&self.pool, student_id, template_id, &title).await?)
    }

    /// Arguments for meeting notifications, with times shown in the
    /// recipient's timezone.
    fn meeting_args(
        meeting: &CounselorMeeting,
        parties: &Parties,
        recipient: &User,
        start: Timestamp,
    ) -> serde_json::Value {
        json!({
            "meeting_title": meeting.title,
            "counselor": parties.counselor_user.full_name(),
            "student": parties.student_user.full_name(),
            "date": format_datetime(start, &recipient.timezone),
            "day": format_day(start, &recipient.timezone),
        })
    }

    async fn notify(
        &self,
        notification_type: &str,
        meeting: &CounselorMeeting,
        parties: &Parties,
        recipient: &User,
        actor: Option<&User>,
        start: Timestamp,
    ) -> ManagerResult<()> {
        self.notifier
            .create(
                NewNotification::new(notification_type)
                    .to_user(recipient.id)
                    .actor(actor.map(|a| a.id))
                    .related(RELATED_TYPE, meeting.id)
                    .args(Self::meeting_args(meeting, parties, recipient, start)),
            )
            .await?;
        Ok(())
    }

    async fn actor(&self, actor_user_id: Option<DbId>) -> ManagerResult<Option<User>> {
        match actor_user_id {
            Some(id) => Ok(Some(self.user(id).await?)),
            None => Ok(None),
        }
    }

    pub async fn schedule(
        &self,
        meeting_id: DbId,
        start: Timestamp,
        end: Timestamp,
        actor_user_id: Option<DbId>,
    ) -> ManagerResult<CounselorMeeting> {
        if start >= end {
            return Err(ManagerError::validation("Meeting start must be before end"));
        }
        let meeting = self.load(meeting_id).await?;
        if meeting.starts_at.is_some() {
            return Err(ManagerError::conflict(
                "Cannot schedule meeting that is already scheduled",
            ));
        }
        if meeting.cancelled.is_some() {
            return Err(ManagerError::conflict("Cannot schedule a cancelled meeting"));
        }
        let parties = self.parties(&meeting).await?;
        let actor = self.actor(actor_user_id).await?;

        let meeting = CounselorMeetingRepo::set_times(&self.pool, meeting_id, start, end)
            .await?
            .ok_or_else(|| ManagerError::not_found("CounselorMeeting", meeting_id))?;

        if actor.as_ref().is_some_and(|a| a.role == ROLE_STUDENT) {
            TaskRepo::schedule_meeting_tasks(&self.pool, meeting_id, start, Utc::now()).await?;
        }

        CounselorTimeEntryRepo::create(
            &self.pool,
            &CreateCounselorTimeEntry {
                counselor_id: parties.counselor.id,
                student_id: Some(parties.student.id),
                counselor_meeting_id: Some(meeting_id),
                date: Some(start),
                minutes: (end - start).num_minutes(),
                category: MEETING_CATEGORY.to_string(),
                ..Default::default()
            },
        )
        .await?;

        self.notify(
            types::STUDENT_COUNSELOR_MEETING_CONFIRMED,
            &meeting,
            &parties,
            &parties.student_user,
            actor.as_ref(),
            start,
        )
        .await?;
        if actor.as_ref().is_some_and(|a| a.id != parties.counselor_user.id) {
            self.notify(
                types::COUNSELOR_COUNSELOR_MEETING_CONFIRMED,
                &meeting,
                &parties,
                &parties.counselor_user,
                actor.as_ref(),
                start,
            )
            .await?;
        }

        tracing::info!(meeting_id, %start, "Counselor meeting scheduled");
        Ok(meeting)
    }

    pub async fn reschedule(
        &self,
        meeting_id: DbId,
        start: Timestamp,
        end: Timestamp,
        actor_user_id: Option<DbId>,
    ) -> ManagerResult<CounselorMeeting> {
        if start >= end {
            return Err(ManagerError::validation("Meeting start must be before end"));
        }
        let meeting = self.load(meeting_id).await?;
        let Some(old_start) = meeting.starts_at else {
            return Err(ManagerError::conflict("Cannot reschedule unscheduled meeting"));
        };
        if meeting.cancelled.is_some() {
            return Err(ManagerError::conflict("Cannot reschedule a cancelled meeting"));
        }
        let parties = self.parties(&meeting).await?;
        let actor = self.actor(actor_user_id).await?;
        let actor_role = actor.as_ref().map(|a| a.role.as_str());

        let meeting = CounselorMeetingRepo::set_times(&self.pool, meeting_id, start, end)
            .await?
            .ok_or_else(|| ManagerError::not_found("CounselorMeeting", meeting_id))?;

        if actor_role == Some(ROLE_STUDENT) {
            TaskRepo::reschedule_meeting_tasks(&self.pool, meeting_id, Some(old_start), start)
                .await?;
        }

        CounselorTimeEntryRepo::update_for_meeting(
            &self.pool,
            meeting_id,
            start,
            (end - start).num_minutes(),
        )
        .await?;

        self.notify(
            types::STUDENT_COUNSELOR_MEETING_RESCHEDULED,
            &meeting,
            &parties,
            &parties.student_user,
            actor.as_ref(),
            start,
        )
        .await?;
        if matches!(actor_role, Some(ROLE_STUDENT) | Some(ROLE_PARENT)) {
            self.notify(
                types::COUNSELOR_COUNSELOR_MEETING_RESCHEDULED,
                &meeting,
                &parties,
                &parties.counselor_user,
                actor.as_ref(),
                start,
            )
            .await?;
        }

        // The reschedule notice stands in for the next reminder.
        let now = Utc::now();
        CounselorMeetingRepo::set_last_reminder_sent(&self.pool, meeting_id, now).await?;
        tracing::info!(meeting_id, %old_start, %start, "Counselor meeting rescheduled");
        Ok(CounselorMeeting {
            last_reminder_sent: Some(now),
            ..meeting
        })
    }

    /// Cancel a scheduled meeting and drop its time entry.
    pub async fn cancel(
        &self,
        meeting_id: DbId,
        actor_user_id: Option<DbId>,
    ) -> ManagerResult<CounselorMeeting> {
        let meeting = self.load(meeting_id).await?;
        if meeting.cancelled.is_some() {
            return Err(ManagerError::conflict(
                "Cannot cancel meeting that is already cancelled",
            ));
        }
        let Some(start) = meeting.starts_at else {
            return Err(ManagerError::conflict("Cannot cancel unscheduled meeting"));
        };
        let parties = self.parties(&meeting).await?;
        let actor = self.actor(actor_user_id).await?;

        let meeting = CounselorMeetingRepo::cancel(&self.pool, meeting_id, Utc::now())
            .await?
            .ok_or_else(|| ManagerError::conflict("Meeting was cancelled concurrently"))?;
        CounselorTimeEntryRepo::delete_for_meeting(&self.pool, meeting_id).await?;

        self.notify(
            types::STUDENT_COUNSELOR_MEETING_CANCELLED,
            &meeting,
            &parties,
            &parties.student_user,
            actor.as_ref(),
            start,
        )
        .await?;

        tracing::info!(meeting_id, "Counselor meeting cancelled");
        Ok(meeting)
    }

    /// Send meeting notes to the student and/or the parent, then finalize
    /// them. The parent copy cc's the counselor when they asked for it.
    pub async fn send_notes(
        &self,
        meeting_id: DbId,
        subject: &str,
        note: &str,
        to_student: bool,
        to_parent: bool,
    ) -> ManagerResult<CounselorMeeting> {
        if !to_student && !to_parent {
            return Err(ManagerError::validation(
                "Must send notes to either student or parent",
            ));
        }
        let meeting = self.load(meeting_id).await?;
        let parties = self.parties(&meeting).await?;

        let args = json!({
            "first_name": parties.counselor_user.first_name,
            "meeting_title": meeting.title,
            "subject": subject,
            "note": note,
        });
        let notes = |user_id: DbId| {
            NewNotification::new(types::COUNSELOR_MEETING_MESSAGE)
                .to_user(user_id)
                .actor(Some(parties.counselor_user.id))
                .related(RELATED_TYPE, meeting.id)
                .args(args.clone())
        };

        if to_student {
            self.notifier.create(notes(parties.student_user.id)).await?;
        }
        if to_parent {
            let parent = match parties.student.parent_id {
                Some(id) => ParentRepo::find_by_id(&self.pool, id).await?,
                None => None,
            };
            if let Some(parent) = parent {
                let cc = parties
                    .counselor
                    .cc_on_meeting_notes
                    .then(|| parties.counselor_user.email.clone());
                self.notifier.create(notes(parent.user_id).cc_email(cc)).await?;
            }
        }

        CounselorMeetingRepo::record_notes_sent(&self.pool, meeting_id, subject, note, Utc::now())
            .await?
            .ok_or_else(|| ManagerError::not_found("CounselorMeeting", meeting_id))
    }
}
