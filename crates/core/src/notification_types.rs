//! Notification type catalogue and per-type delivery configuration.
//!
//! Every notification carries a `notification_type` string. This module is
//! the single source of truth for what each type does by default: whether it
//! is emailed, texted, copied to a parent, and whether a recipient may opt
//! out of it on each channel.

// ---------------------------------------------------------------------------
// Type names
// ---------------------------------------------------------------------------

pub const INVITE: &str = "invite";
pub const INVITE_REMINDER: &str = "invite_reminder";
pub const USER_ACCEPTED_INVITE: &str = "user_accepted_invite";

pub const TASK: &str = "task";
pub const TASK_DIAGNOSTIC: &str = "task_diagnostic";
pub const TASK_COMPLETE: &str = "task_complete";
pub const TASK_DIGEST: &str = "task_digest";
pub const STUDENT_TASK_REMINDER: &str = "student_task_reminder";
pub const INDIVIDUAL_TASK_REMINDER: &str = "individual_task_reminder";

pub const STUDENT_TUTORING_SESSION_REMINDER: &str = "student_tutoring_session_reminder";
pub const TUTOR_TUTORING_SESSION_REMINDER: &str = "tutor_tutoring_session_reminder";
pub const TUTOR_GTS_REMINDER: &str = "tutor_gts_reminder";
pub const TUTOR_DAILY_DIGEST: &str = "tutor_daily_digest";
pub const TUTOR_TIME_CARD: &str = "tutor_time_card";
pub const PACKAGE_PURCHASE_CONFIRMATION: &str = "package_purchase_confirmation";
pub const LAST_MEETING: &str = "last_meeting";
pub const OPS_UPCOMING_COURSE: &str = "ops_upcoming_course";
pub const FIRST_INDIVIDUAL_TUTORING_SESSION_DAILY_DIGEST: &str =
    "first_individual_tutoring_session_daily_digest";

pub const STUDENT_COUNSELOR_MEETING_CONFIRMED: &str = "student_counselor_meeting_confirmed";
pub const COUNSELOR_COUNSELOR_MEETING_CONFIRMED: &str = "counselor_counselor_meeting_confirmed";
pub const STUDENT_COUNSELOR_MEETING_RESCHEDULED: &str = "student_counselor_meeting_rescheduled";
pub const COUNSELOR_COUNSELOR_MEETING_RESCHEDULED: &str =
    "counselor_counselor_meeting_rescheduled";
pub const STUDENT_COUNSELOR_MEETING_CANCELLED: &str = "student_counselor_meeting_cancelled";
pub const STUDENT_COUNSELOR_SESSION_REMINDER: &str = "student_counselor_session_reminder";
pub const COUNSELOR_MEETING_MESSAGE: &str = "counselor_meeting_message";
pub const COUNSELOR_WEEKLY_DIGEST: &str = "counselor_weekly_digest";
pub const COUNSELOR_TASK_DIGEST: &str = "counselor_task_digest";
pub const COUNSELOR_COMPLETED_TASKS: &str = "counselor_completed_tasks";

pub const UNREAD_MESSAGES: &str = "unread_messages";

pub const OPS_PAYGO_PAYMENT_SUCCESS: &str = "ops_paygo_payment_success";
pub const OPS_PAYGO_PAYMENT_FAILURE: &str = "ops_paygo_payment_failure";
pub const OPS_MAGENTO_WEBHOOK: &str = "ops_magento_webhook";
pub const OPS_MAGENTO_WEBHOOK_FAILURE: &str = "ops_magento_webhook_failure";

/// Notifications that may be created without a recipient.
pub const SYSTEM_NOTIFICATIONS: &[&str] = &[
    OPS_PAYGO_PAYMENT_SUCCESS,
    OPS_PAYGO_PAYMENT_FAILURE,
    OPS_MAGENTO_WEBHOOK,
    OPS_MAGENTO_WEBHOOK_FAILURE,
];

/// The only notifications emailed to users that have not accepted their invite.
pub const NOTIFICATIONS_FOR_PENDING_USERS: &[&str] = &[
    INVITE,
    INVITE_REMINDER,
    "student_tutoring_session_confirmation",
    "student_tutoring_session_cancelled",
    "student_tutoring_session_rescheduled",
    "tutoring_session_notes",
    STUDENT_TUTORING_SESSION_REMINDER,
    "student_diagnostic_registration",
    "student_diagnostic_result",
    "diagnostic_invite",
    TASK_DIAGNOSTIC,
    COUNSELOR_MEETING_MESSAGE,
];

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

/// External delivery channel a recipient can opt out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Text,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Email => f.write_str("email"),
            Channel::Text => f.write_str("text"),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-type configuration
// ---------------------------------------------------------------------------

/// Delivery defaults for one notification type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationConfig {
    /// Emailed unless the recipient explicitly unsubscribes.
    pub default_email: bool,
    pub can_unsubscribe_email: bool,
    /// Texted unless the recipient explicitly unsubscribes.
    pub default_text: bool,
    pub can_unsubscribe_text: bool,
    /// A parent receives a copy of student notifications of this type.
    pub cc_parent: bool,
}

/// Configuration for any type without an explicit override.
pub const DEFAULT_CONFIG: NotificationConfig = NotificationConfig {
    default_email: true,
    can_unsubscribe_email: true,
    default_text: false,
    can_unsubscribe_text: true,
    cc_parent: true,
};

const fn config(
    default_email: bool,
    can_unsubscribe_email: bool,
    default_text: bool,
    can_unsubscribe_text: bool,
    cc_parent: bool,
) -> NotificationConfig {
    NotificationConfig {
        default_email,
        can_unsubscribe_email,
        default_text,
        can_unsubscribe_text,
        cc_parent,
    }
}

/// Email and text, both unsubscribable, parent copied.
const STUDENT_EVENT: NotificationConfig = config(true, true, true, true, true);

/// Look up the delivery configuration for a notification type.
pub fn notification_config(notification_type: &str) -> NotificationConfig {
    match notification_type {
        INVITE => config(true, false, false, false, false),
        TASK_DIAGNOSTIC => config(true, false, false, false, true),
        TASK => config(false, false, false, false, false),
        STUDENT_TASK_REMINDER => config(true, true, true, false, true),
        "student_diagnostic_result"
        | "student_tutoring_session_confirmed"
        | STUDENT_TUTORING_SESSION_REMINDER
        | "student_tutoring_session_cancelled"
        | "student_tutoring_session_rescheduled"
        | STUDENT_COUNSELOR_MEETING_CONFIRMED
        | STUDENT_COUNSELOR_SESSION_REMINDER
        | STUDENT_COUNSELOR_MEETING_CANCELLED
        | STUDENT_COUNSELOR_MEETING_RESCHEDULED => STUDENT_EVENT,
        "tutoring_session_notes" => config(true, true, true, true, false),
        UNREAD_MESSAGES => config(true, true, false, true, false),
        COUNSELOR_MEETING_MESSAGE => config(true, false, false, true, false),
        "counselor_forward_student_message" => config(false, false, true, true, false),
        INDIVIDUAL_TASK_REMINDER => config(true, false, true, false, false),
        LAST_MEETING => config(true, true, false, false, false),
        _ => DEFAULT_CONFIG,
    }
}

/// Whether a notification of this type may be created without a recipient.
pub fn is_system_notification(notification_type: &str) -> bool {
    SYSTEM_NOTIFICATIONS.contains(&notification_type)
}

/// Whether a user who has not yet accepted their invite may be emailed this type.
pub fn allowed_for_pending_user(notification_type: &str) -> bool {
    NOTIFICATIONS_FOR_PENDING_USERS.contains(&notification_type)
}

// ---------------------------------------------------------------------------
// Unsubscribable types per audience
// ---------------------------------------------------------------------------

/// Who a recipient is, for the purposes of deciding what they may opt out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Tutor,
    /// Tutoring-only student.
    CasStudent,
    /// Counseling student.
    CapStudent,
    Parent,
    Counselor,
    Administrator,
}

const TUTOR_UNSUBSCRIBABLE: &[&str] = &[
    TASK_COMPLETE,
    "individual_tutoring_session_tutor",
    "tutor_tutoring_session_cancelled",
    "tutor_tutoring_session_rescheduled",
    TUTOR_TUTORING_SESSION_REMINDER,
    "group_tutoring_session_cancelled",
    TUTOR_DAILY_DIGEST,
];

const CAS_STUDENT_UNSUBSCRIBABLE: &[&str] = &[
    "tutoring_session_notes",
    STUDENT_TASK_REMINDER,
    TASK_DIGEST,
    "student_diagnostic_result",
    STUDENT_TUTORING_SESSION_REMINDER,
    "student_tutoring_session_cancelled",
    "student_tutoring_session_rescheduled",
    "group_tutoring_session_cancelled",
];

const CAP_STUDENT_UNSUBSCRIBABLE: &[&str] = &[
    STUDENT_TASK_REMINDER,
    TASK_DIGEST,
    STUDENT_COUNSELOR_MEETING_CONFIRMED,
    STUDENT_COUNSELOR_MEETING_RESCHEDULED,
    STUDENT_COUNSELOR_MEETING_CANCELLED,
    STUDENT_COUNSELOR_SESSION_REMINDER,
    "student_diagnostic_result",
];

const PARENT_UNSUBSCRIBABLE: &[&str] = &[
    "tutoring_session_notes",
    STUDENT_TASK_REMINDER,
    TASK_DIGEST,
    "student_diagnostic_result",
    STUDENT_TUTORING_SESSION_REMINDER,
    "student_tutoring_session_cancelled",
    "student_tutoring_session_rescheduled",
    "group_tutoring_session_cancelled",
    STUDENT_COUNSELOR_MEETING_CONFIRMED,
    STUDENT_COUNSELOR_MEETING_RESCHEDULED,
    STUDENT_COUNSELOR_MEETING_CANCELLED,
    STUDENT_COUNSELOR_SESSION_REMINDER,
];

const ADMINISTRATOR_UNSUBSCRIBABLE: &[&str] = &[
    "diagnostic_result",
    "diagnostic_score_required",
    "diagnostic_recommendation_required",
    "tutor_altered_availability",
    FIRST_INDIVIDUAL_TUTORING_SESSION_DAILY_DIGEST,
    "student_self_assigned_diagnostic",
    "ops_student_diagnostic_registration",
    "ops_failed_charge",
    OPS_MAGENTO_WEBHOOK,
    OPS_MAGENTO_WEBHOOK_FAILURE,
    OPS_PAYGO_PAYMENT_SUCCESS,
    OPS_PAYGO_PAYMENT_FAILURE,
    LAST_MEETING,
    OPS_UPCOMING_COURSE,
    "cas_magento_student_created",
    "cap_magento_student_created",
];

const COUNSELOR_UNSUBSCRIBABLE: &[&str] = &[
    "counselor_diagnostic_result",
    TASK_COMPLETE,
    "counselor_file_upload",
    COUNSELOR_WEEKLY_DIGEST,
    COUNSELOR_TASK_DIGEST,
    COUNSELOR_COMPLETED_TASKS,
];

/// Notification types the given audience is allowed to opt out of.
pub fn unsubscribable_types(audience: Audience) -> &'static [&'static str] {
    match audience {
        Audience::Tutor => TUTOR_UNSUBSCRIBABLE,
        Audience::CasStudent => CAS_STUDENT_UNSUBSCRIBABLE,
        Audience::CapStudent => CAP_STUDENT_UNSUBSCRIBABLE,
        Audience::Parent => PARENT_UNSUBSCRIBABLE,
        Audience::Counselor => COUNSELOR_UNSUBSCRIBABLE,
        Audience::Administrator => ADMINISTRATOR_UNSUBSCRIBABLE,
    }
}

/// Check that `audience` may unsubscribe from `notification_type` on `channel`.
pub fn validate_unsubscribe(
    audience: Audience,
    notification_type: &str,
    channel: Channel,
) -> Result<(), String> {
    if !unsubscribable_types(audience).contains(&notification_type) {
        return Err(format!(
            "Notification type '{notification_type}' cannot be unsubscribed from"
        ));
    }
    let cfg = notification_config(notification_type);
    let allowed = match channel {
        Channel::Email => cfg.can_unsubscribe_email,
        Channel::Text => cfg.can_unsubscribe_text,
    };
    if allowed {
        Ok(())
    } else {
        Err(format!(
            "Notification type '{notification_type}' cannot be unsubscribed from by {channel}"
        ))
    }
}
