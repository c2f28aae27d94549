//! Tutoring package, session and tutor time card models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use schoolnet_core::hours::{PurchasedMinutes, SessionUsage};
use schoolnet_core::types::{Cents, DbId, Minutes, Timestamp};

/// A row from the `tutoring_packages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TutoringPackage {
    pub id: DbId,
    pub title: String,
    pub individual_test_prep_minutes: Minutes,
    pub group_test_prep_minutes: Minutes,
    pub individual_curriculum_minutes: Minutes,
    pub price_cents: Cents,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTutoringPackage {
    pub title: String,
    pub individual_test_prep_minutes: Option<Minutes>,
    pub group_test_prep_minutes: Option<Minutes>,
    pub individual_curriculum_minutes: Option<Minutes>,
    pub price_cents: Option<Cents>,
}

/// A row from the `tutoring_package_purchases` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TutoringPackagePurchase {
    pub id: DbId,
    pub student_id: DbId,
    pub tutoring_package_id: DbId,
    pub purchased_by_id: Option<DbId>,
    pub price_paid_cents: Cents,
    pub purchase_reversed: Option<Timestamp>,
    pub purchase_reversed_by_id: Option<DbId>,
    pub created_at: Timestamp,
}

/// Sum of package minutes across a student's unreversed purchases.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct PurchasedMinutesRow {
    pub individual_test_prep: Minutes,
    pub group_test_prep: Minutes,
    pub individual_curriculum: Minutes,
}

impl From<PurchasedMinutesRow> for PurchasedMinutes {
    fn from(r: PurchasedMinutesRow) -> Self {
        Self {
            individual_test_prep: r.individual_test_prep,
            group_test_prep: r.group_test_prep,
            individual_curriculum: r.individual_curriculum,
        }
    }
}

/// A row from the `group_tutoring_sessions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GroupTutoringSession {
    pub id: DbId,
    pub title: String,
    pub primary_tutor_id: Option<DbId>,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub charge_student_duration: Minutes,
    pub cancelled: bool,
    pub last_reminder_sent: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl GroupTutoringSession {
    /// Tutors are paid for the scheduled span even when students are not charged.
    pub fn pay_tutor_minutes(&self) -> Minutes {
        (self.ends_at - self.starts_at).num_minutes()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGroupTutoringSession {
    pub title: String,
    pub primary_tutor_id: Option<DbId>,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub charge_student_duration: Option<Minutes>,
}

/// A row from the `courses` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Course {
    pub id: DbId,
    pub name: String,
    pub description: String,
    pub primary_tutor_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCourse {
    pub name: String,
    pub description: Option<String>,
    pub primary_tutor_id: Option<DbId>,
}

/// A row from the `student_tutoring_sessions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StudentTutoringSession {
    pub id: DbId,
    pub student_id: Option<DbId>,
    pub individual_session_tutor_id: Option<DbId>,
    pub group_tutoring_session_id: Option<DbId>,
    pub session_type: String,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub duration_minutes: Minutes,
    pub set_cancelled: bool,
    pub late_cancel: bool,
    pub missed: bool,
    pub is_tentative: bool,
    pub last_reminder_sent: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStudentTutoringSession {
    pub student_id: Option<DbId>,
    pub individual_session_tutor_id: Option<DbId>,
    pub group_tutoring_session_id: Option<DbId>,
    pub session_type: Option<String>,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub duration_minutes: Minutes,
    pub is_tentative: Option<bool>,
}

/// Session joined with its group session's cancelled flag.
#[derive(Debug, Clone, FromRow)]
pub struct SessionUsageRow {
    pub duration_minutes: Minutes,
    pub session_type: String,
    pub set_cancelled: bool,
    pub late_cancel: bool,
    pub is_tentative: bool,
    pub is_group: bool,
    pub group_cancelled: bool,
}

impl From<SessionUsageRow> for SessionUsage {
    fn from(r: SessionUsageRow) -> Self {
        Self {
            duration_minutes: r.duration_minutes,
            session_type: r.session_type,
            set_cancelled: r.set_cancelled,
            late_cancel: r.late_cancel,
            is_tentative: r.is_tentative,
            is_group: r.is_group,
            group_cancelled: r.group_cancelled,
        }
    }
}

// ---------------------------------------------------------------------------
// Tutor time cards
// ---------------------------------------------------------------------------

/// A row from the `tutor_time_cards` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TutorTimeCard {
    pub id: DbId,
    pub tutor_id: DbId,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub hourly_rate_cents: Cents,
    pub total_cents: Cents,
    pub tutor_approval_time: Option<Timestamp>,
    pub tutor_note: String,
    pub admin_approver_id: Option<DbId>,
    pub admin_approval_time: Option<Timestamp>,
    pub admin_note: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `tutor_time_card_line_items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TutorTimeCardLineItem {
    pub id: DbId,
    pub time_card_id: DbId,
    pub title: String,
    pub date: Option<Timestamp>,
    pub minutes: Minutes,
    pub hourly_rate_cents: Option<Cents>,
    pub individual_tutoring_session_id: Option<DbId>,
    pub group_tutoring_session_id: Option<DbId>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Default)]
pub struct CreateLineItem {
    pub title: String,
    pub date: Option<Timestamp>,
    pub minutes: Minutes,
    pub hourly_rate_cents: Option<Cents>,
    pub individual_tutoring_session_id: Option<DbId>,
    pub group_tutoring_session_id: Option<DbId>,
}
