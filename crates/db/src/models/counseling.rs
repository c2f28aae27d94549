//! Roadmap, counselor meeting, time card and counseling hours models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use schoolnet_core::types::{Cents, DbId, Minutes, Timestamp};

// ---------------------------------------------------------------------------
// Roadmaps and templates
// ---------------------------------------------------------------------------

/// A row from the `roadmaps` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Roadmap {
    pub id: DbId,
    pub title: String,
    pub description: String,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `counselor_meeting_templates` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CounselorMeetingTemplate {
    pub id: DbId,
    pub roadmap_id: Option<DbId>,
    pub title: String,
    pub description: String,
    pub sort_order: i16,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `agenda_item_templates` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AgendaItemTemplate {
    pub id: DbId,
    pub counselor_meeting_template_id: Option<DbId>,
    pub counselor_title: String,
    pub student_title: String,
    pub sort_order: i32,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Meetings
// ---------------------------------------------------------------------------

/// A row from the `counselor_meetings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CounselorMeeting {
    pub id: DbId,
    pub student_id: DbId,
    pub counselor_meeting_template_id: Option<DbId>,
    pub title: String,
    pub starts_at: Option<Timestamp>,
    pub ends_at: Option<Timestamp>,
    pub cancelled: Option<Timestamp>,
    pub last_reminder_sent: Option<Timestamp>,
    pub notes_message_note: String,
    pub notes_message_subject: String,
    pub notes_message_last_sent: Option<Timestamp>,
    pub notes_finalized: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `agenda_items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AgendaItem {
    pub id: DbId,
    pub counselor_meeting_id: DbId,
    pub agenda_item_template_id: Option<DbId>,
    pub counselor_title: String,
    pub student_title: String,
    pub sort_order: i32,
    pub created_at: Timestamp,
}

/// Request body for schedule/reschedule.
#[derive(Debug, Clone, Deserialize)]
pub struct MeetingTimes {
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Counselor time cards
// ---------------------------------------------------------------------------

/// A row from the `counselor_time_cards` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CounselorTimeCard {
    pub id: DbId,
    pub counselor_id: DbId,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub hourly_rate_cents: Cents,
    pub total_cents: Cents,
    pub counselor_approval_time: Option<Timestamp>,
    pub counselor_note: String,
    pub admin_approval_time: Option<Timestamp>,
    pub admin_note: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `counselor_time_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CounselorTimeEntry {
    pub id: DbId,
    pub counselor_id: DbId,
    pub student_id: Option<DbId>,
    pub counselor_meeting_id: Option<DbId>,
    pub counselor_time_card_id: Option<DbId>,
    pub date: Option<Timestamp>,
    pub minutes: Minutes,
    pub category: String,
    pub note: String,
    pub pay_rate_cents: Option<Cents>,
    pub include_in_hours_bank: bool,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCounselorTimeEntry {
    pub counselor_id: DbId,
    pub student_id: Option<DbId>,
    pub counselor_meeting_id: Option<DbId>,
    pub date: Option<Timestamp>,
    pub minutes: Minutes,
    pub category: String,
    pub note: Option<String>,
    pub pay_rate_cents: Option<Cents>,
    pub include_in_hours_bank: Option<bool>,
}

/// Time entry joined with its student's counselor pay rate, for totals.
#[derive(Debug, Clone, FromRow)]
pub struct TimeEntryRate {
    pub minutes: Minutes,
    pub pay_rate_cents: Option<Cents>,
    pub student_pay_rate_cents: Option<Cents>,
}

// ---------------------------------------------------------------------------
// Counseling hours
// ---------------------------------------------------------------------------

/// A row from the `counseling_packages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CounselingPackage {
    pub id: DbId,
    pub package_name: String,
    pub minutes: Minutes,
    pub grade: Option<i32>,
    pub semester: Option<i32>,
    pub created_at: Timestamp,
}

/// A row from the `counseling_hours_grants` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CounselingHoursGrant {
    pub id: DbId,
    pub student_id: DbId,
    pub counseling_package_id: Option<DbId>,
    pub created_by_id: Option<DbId>,
    pub minutes: Minutes,
    pub amount_paid_cents: Option<Cents>,
    pub note: String,
    pub include_in_hours_bank: bool,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCounselingHoursGrant {
    pub student_id: DbId,
    pub counseling_package_id: Option<DbId>,
    pub created_by_id: Option<DbId>,
    pub minutes: Minutes,
    pub amount_paid_cents: Option<Cents>,
    pub note: Option<String>,
}
