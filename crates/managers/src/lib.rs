//! Business operations that span several tables and send notifications.
//!
//! Each manager owns a pool (and a [`Notifier`](schoolnet_events::Notifier)
//! when it notifies anyone) and is cheap to build per request. The API
//! handlers and worker jobs call these rather than the repositories when an
//! operation has side effects beyond a single row.

pub mod conversations;
pub mod counseling_hours;
pub mod counselor_meetings;
pub mod counselor_time_cards;
pub mod error;
pub mod notifications;
pub mod roadmaps;
pub mod tasks;
pub mod tutor_time_cards;
pub mod tutoring_packages;

pub use conversations::ConversationManager;
pub use counseling_hours::{CounselingHoursManager, CounselingHoursSummary};
pub use counselor_meetings::CounselorMeetingManager;
pub use counselor_time_cards::CounselorTimeCardManager;
pub use error::{ManagerError, ManagerResult};
pub use notifications::{NotificationManager, SubscriptionUpdate};
pub use roadmaps::{AppliedRoadmap, RoadmapManager, UnappliedRoadmap};
pub use tasks::TaskManager;
pub use tutor_time_cards::{CreatedTimeCards, TutorTimeCardManager};
pub use tutoring_packages::TutoringPackageManager;
