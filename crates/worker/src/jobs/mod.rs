//! Periodic jobs.
//!
//! Every job is an async function `(ctx, now) -> JobResult<...>` returning
//! the ids it acted on. A failure on one item is logged and the job moves on
//! to the next; only failures of the job's own queries abort a run.

pub mod admins;
pub mod counselors;
pub mod invites;
pub mod messages;
pub mod sessions;
pub mod tasks;
pub mod tutors;

use std::time::Duration;

use schoolnet_core::types::{DbId, Timestamp};
use schoolnet_db::models::user::{Student, User};
use schoolnet_db::repositories::{StudentRepo, UserRepo};
use schoolnet_db::DbPool;
use schoolnet_events::{NotifyError, Notifier};
use schoolnet_managers::ManagerError;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error(transparent)]
    Manager(#[from] ManagerError),
}

pub type JobResult<T> = Result<T, JobError>;

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// What every job needs: the notifier (which carries the pool) and the
/// weekend switch.
#[derive(Clone)]
pub struct JobContext {
    pub notifier: Notifier,
    pub skip_weekends: bool,
}

impl JobContext {
    pub fn new(notifier: Notifier, skip_weekends: bool) -> Self {
        Self {
            notifier,
            skip_weekends,
        }
    }

    pub fn pool(&self) -> &DbPool {
        self.notifier.pool()
    }
}

pub(crate) async fn load_user(pool: &DbPool, user_id: DbId) -> JobResult<Option<User>> {
    Ok(UserRepo::find_by_id(pool, user_id).await?)
}

/// A student with their user row.
pub(crate) async fn load_student(
    pool: &DbPool,
    student_id: DbId,
) -> JobResult<Option<(Student, User)>> {
    let Some(student) = StudentRepo::find_by_id(pool, student_id).await? else {
        return Ok(None);
    };
    Ok(load_user(pool, student.user_id).await?.map(|u| (student, u)))
}

// ---------------------------------------------------------------------------
// Job catalogue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Job {
    UpcomingTutoringSessions,
    UpcomingCounselorMeetings,
    InviteReminders,
    DailyTaskDigest,
    StudentTaskReminders,
    CounselorTaskDigest,
    CounselorCompletedTasks,
    CounselorWeeklyDigest,
    TutorDailyDigest,
    UnreadMessages,
    TutorTimeCards,
    LastMeetings,
    UpcomingCourses,
    FirstSessionDigest,
}

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

impl Job {
    pub const ALL: [Job; 14] = [
        Job::UpcomingTutoringSessions,
        Job::UpcomingCounselorMeetings,
        Job::InviteReminders,
        Job::DailyTaskDigest,
        Job::StudentTaskReminders,
        Job::CounselorTaskDigest,
        Job::CounselorCompletedTasks,
        Job::CounselorWeeklyDigest,
        Job::TutorDailyDigest,
        Job::UnreadMessages,
        Job::TutorTimeCards,
        Job::LastMeetings,
        Job::UpcomingCourses,
        Job::FirstSessionDigest,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Job::UpcomingTutoringSessions => "upcoming_tutoring_sessions",
            Job::UpcomingCounselorMeetings => "upcoming_counselor_meetings",
            Job::InviteReminders => "invite_reminders",
            Job::DailyTaskDigest => "daily_task_digest",
            Job::StudentTaskReminders => "student_task_reminders",
            Job::CounselorTaskDigest => "counselor_task_digest",
            Job::CounselorCompletedTasks => "counselor_completed_tasks",
            Job::CounselorWeeklyDigest => "counselor_weekly_digest",
            Job::TutorDailyDigest => "tutor_daily_digest",
            Job::UnreadMessages => "unread_messages",
            Job::TutorTimeCards => "tutor_time_cards",
            Job::LastMeetings => "last_meetings",
            Job::UpcomingCourses => "upcoming_courses",
            Job::FirstSessionDigest => "first_session_digest",
        }
    }

    pub fn from_name(name: &str) -> Option<Job> {
        Job::ALL.into_iter().find(|job| job.name() == name)
    }

    pub fn default_interval(self) -> Duration {
        Duration::from_secs(match self {
            Job::UpcomingTutoringSessions | Job::UpcomingCounselorMeetings => 5 * MINUTE,
            Job::InviteReminders
            | Job::StudentTaskReminders
            | Job::CounselorTaskDigest
            | Job::CounselorCompletedTasks => HOUR,
            Job::DailyTaskDigest
            | Job::TutorDailyDigest
            | Job::TutorTimeCards
            | Job::LastMeetings
            | Job::UpcomingCourses
            | Job::FirstSessionDigest => DAY,
            Job::CounselorWeeklyDigest => 7 * DAY,
            Job::UnreadMessages => MINUTE,
        })
    }

    /// Run the job once at `now`. Returns how many items it acted on.
    pub async fn run(self, ctx: &JobContext, now: Timestamp) -> JobResult<usize> {
        Ok(match self {
            Job::UpcomingTutoringSessions => sessions::upcoming_tutoring_sessions(ctx, now).await?.len(),
            Job::UpcomingCounselorMeetings => sessions::upcoming_counselor_meetings(ctx, now).await?.len(),
            Job::InviteReminders => invites::invite_reminders(ctx, now).await?.len(),
            Job::DailyTaskDigest => tasks::daily_task_digest(ctx, now).await?.len(),
            Job::StudentTaskReminders => tasks::student_task_reminders(ctx, now).await?.len(),
            Job::CounselorTaskDigest => counselors::counselor_task_digest(ctx, now).await?.len(),
            Job::CounselorCompletedTasks => {
                counselors::counselor_completed_tasks(ctx, now).await?.len()
            }
            Job::CounselorWeeklyDigest => counselors::counselor_weekly_digest(ctx, now).await?.len(),
            Job::TutorDailyDigest => tutors::tutor_daily_digest(ctx, now).await?.len(),
            Job::UnreadMessages => messages::unread_messages(ctx, now).await?.len(),
            Job::TutorTimeCards => tutors::tutor_time_cards(ctx, now).await?.len(),
            Job::LastMeetings => sessions::last_meetings(ctx, now).await?.len(),
            Job::UpcomingCourses => admins::upcoming_courses(ctx, now).await?.len(),
            Job::FirstSessionDigest => admins::first_session_digest(ctx, now).await?.len(),
        })
    }
}
