//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod conversation_repo;
pub mod course_repo;
pub mod counseling_hours_repo;
pub mod counselor_meeting_repo;
pub mod counselor_repo;
pub mod counselor_time_card_repo;
pub mod counselor_time_entry_repo;
pub mod notification_recipient_repo;
pub mod notification_repo;
pub mod parent_repo;
pub mod roadmap_repo;
pub mod student_repo;
pub mod task_repo;
pub mod task_template_repo;
pub mod tutor_repo;
pub mod tutor_time_card_repo;
pub mod tutoring_package_repo;
pub mod tutoring_session_repo;
pub mod user_repo;

pub use conversation_repo::ConversationRepo;
pub use course_repo::CourseRepo;
pub use counseling_hours_repo::CounselingHoursRepo;
pub use counselor_meeting_repo::CounselorMeetingRepo;
pub use counselor_repo::CounselorRepo;
pub use counselor_time_card_repo::CounselorTimeCardRepo;
pub use counselor_time_entry_repo::CounselorTimeEntryRepo;
pub use notification_recipient_repo::NotificationRecipientRepo;
pub use notification_repo::NotificationRepo;
pub use parent_repo::ParentRepo;
pub use roadmap_repo::RoadmapRepo;
pub use student_repo::StudentRepo;
pub use task_repo::TaskRepo;
pub use task_template_repo::TaskTemplateRepo;
pub use tutor_repo::TutorRepo;
pub use tutor_time_card_repo::TutorTimeCardRepo;
pub use tutoring_package_repo::TutoringPackageRepo;
pub use tutoring_session_repo::TutoringSessionRepo;
pub use user_repo::UserRepo;

/// Prefix every column in a comma-separated list with `alias.`.
pub(crate) fn qualify(columns: &str, alias: &str) -> String {
    columns
        .split(',')
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
