//! Conversation types, display names and unread-notice eligibility.

use crate::reminders::unread_message_cutoff;
use crate::roles::{ROLE_ADMIN, ROLE_COUNSELOR, ROLE_TUTOR};
use crate::types::Timestamp;

pub const CONVERSATION_TYPE_COUNSELOR: &str = "co";
pub const CONVERSATION_TYPE_TUTOR: &str = "tu";
pub const CONVERSATION_TYPE_OPERATIONS: &str = "op";
pub const CONVERSATION_TYPE_OTHER: &str = "ot";
pub const CONVERSATION_TYPE_COUNSELOR_TUTOR: &str = "ct";

pub const CONVERSATION_TYPES: &[&str] = &[
    CONVERSATION_TYPE_COUNSELOR,
    CONVERSATION_TYPE_TUTOR,
    CONVERSATION_TYPE_OPERATIONS,
    CONVERSATION_TYPE_OTHER,
    CONVERSATION_TYPE_COUNSELOR_TUTOR,
];

pub const FALLBACK_COUNSELOR_NAME: &str = "Collegewise Counselor";
pub const FALLBACK_TUTORS_NAME: &str = "Collegewise Tutors";
pub const FALLBACK_TUTOR_NAME: &str = "Collegewise Tutor";

/// Names of the people attached to a conversation, resolved by the caller.
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
    pub conversation_type: String,
    pub student_name: Option<String>,
    pub parent_name: Option<String>,
    /// The student's counselor (for `co`) or the conversation's counselor (for `ct`).
    pub counselor_name: Option<String>,
    /// The conversation's tutor (for `ct`).
    pub tutor_name: Option<String>,
    /// All tutors the student works with (for `tu`).
    pub student_tutor_names: Vec<String>,
}

/// Who `viewer_role` sees at the other end of the conversation.
pub fn conversation_with_name(viewer_role: &str, ctx: &ConversationContext) -> String {
    let kind = ctx.conversation_type.as_str();
    let staff_viewing_family = (viewer_role == ROLE_TUTOR && kind == CONVERSATION_TYPE_TUTOR)
        || (viewer_role == ROLE_COUNSELOR && kind == CONVERSATION_TYPE_COUNSELOR);

    if staff_viewing_family {
        return match (&ctx.student_name, &ctx.parent_name) {
            (Some(student), _) => format!("student {student}"),
            (None, Some(parent)) => format!("parent {parent}"),
            (None, None) => String::new(),
        };
    }

    match kind {
        CONVERSATION_TYPE_COUNSELOR => ctx
            .counselor_name
            .clone()
            .unwrap_or_else(|| FALLBACK_COUNSELOR_NAME.to_string()),
        CONVERSATION_TYPE_TUTOR => match ctx.student_tutor_names.as_slice() {
            [only] => only.clone(),
            _ => FALLBACK_TUTORS_NAME.to_string(),
        },
        CONVERSATION_TYPE_COUNSELOR_TUTOR if viewer_role == ROLE_TUTOR => ctx
            .counselor_name
            .clone()
            .unwrap_or_else(|| FALLBACK_COUNSELOR_NAME.to_string()),
        CONVERSATION_TYPE_COUNSELOR_TUTOR => ctx
            .tutor_name
            .clone()
            .unwrap_or_else(|| FALLBACK_TUTOR_NAME.to_string()),
        _ => String::new(),
    }
}

/// State needed to decide whether a participant gets an unread notice.
#[derive(Debug, Clone)]
pub struct ParticipantState {
    pub active: bool,
    /// SMS participants already received the messages by text.
    pub phone_number: Option<String>,
    pub last_unread_message_notification: Option<Timestamp>,
    pub viewer_role: String,
}

pub fn participant_needs_unread_notice(
    participant: &ParticipantState,
    conversation_type: &str,
    last_message: Option<Timestamp>,
    now: Timestamp,
) -> bool {
    let Some(last_message) = last_message else {
        return false;
    };
    if last_message >= unread_message_cutoff(now) || !participant.active {
        return false;
    }
    if participant.phone_number.as_deref().is_some_and(|p| !p.is_empty()) {
        return false;
    }
    if participant.viewer_role == ROLE_ADMIN && conversation_type != CONVERSATION_TYPE_OPERATIONS {
        return false;
    }
    participant
        .last_unread_message_notification
        .map_or(true, |sent| last_message > sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::{ROLE_PARENT, ROLE_STUDENT};
    use chrono::{Duration, TimeZone, Utc};

    fn ctx(kind: &str) -> ConversationContext {
        ConversationContext {
            conversation_type: kind.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn counselor_sees_student_name() {
        let mut c = ctx(CONVERSATION_TYPE_COUNSELOR);
        c.student_name = Some("Ada Park".into());
        assert_eq!(conversation_with_name(ROLE_COUNSELOR, &c), "student Ada Park");
        c.student_name = None;
        c.parent_name = Some("Lee Park".into());
        assert_eq!(conversation_with_name(ROLE_COUNSELOR, &c), "parent Lee Park");
    }

    #[test]
    fn student_sees_counselor_or_fallback() {
        let mut c = ctx(CONVERSATION_TYPE_COUNSELOR);
        assert_eq!(conversation_with_name(ROLE_STUDENT, &c), FALLBACK_COUNSELOR_NAME);
        c.counselor_name = Some("Sam Reyes".into());
        assert_eq!(conversation_with_name(ROLE_PARENT, &c), "Sam Reyes");
    }

    #[test]
    fn tutor_conversation_names_single_tutor() {
        let mut c = ctx(CONVERSATION_TYPE_TUTOR);
        c.student_tutor_names = vec!["Kim Ito".into()];
        assert_eq!(conversation_with_name(ROLE_STUDENT, &c), "Kim Ito");
        c.student_tutor_names.push("Jo Ng".into());
        assert_eq!(conversation_with_name(ROLE_STUDENT, &c), FALLBACK_TUTORS_NAME);
    }

    #[test]
    fn counselor_tutor_conversation_names_other_side() {
        let mut c = ctx(CONVERSATION_TYPE_COUNSELOR_TUTOR);
        assert_eq!(conversation_with_name(ROLE_TUTOR, &c), FALLBACK_COUNSELOR_NAME);
        assert_eq!(conversation_with_name(ROLE_COUNSELOR, &c), FALLBACK_TUTOR_NAME);
        c.tutor_name = Some("Kim Ito".into());
        assert_eq!(conversation_with_name(ROLE_COUNSELOR, &c), "Kim Ito");
    }

    fn participant(role: &str) -> ParticipantState {
        ParticipantState {
            active: true,
            phone_number: None,
            last_unread_message_notification: None,
            viewer_role: role.to_string(),
        }
    }

    #[test]
    fn unread_notice_rules() {
        let now = Utc.with_ymd_and_hms(2024, 3, 6, 12, 0, 0).unwrap();
        let old = now - Duration::minutes(10);
        let fresh = now - Duration::minutes(1);
        let p = participant(ROLE_STUDENT);

        assert!(participant_needs_unread_notice(&p, CONVERSATION_TYPE_COUNSELOR, Some(old), now));
        assert!(!participant_needs_unread_notice(&p, CONVERSATION_TYPE_COUNSELOR, Some(fresh), now));
        assert!(!participant_needs_unread_notice(&p, CONVERSATION_TYPE_COUNSELOR, None, now));

        let mut sms = participant(ROLE_STUDENT);
        sms.phone_number = Some("+15555550100".into());
        assert!(!participant_needs_unread_notice(&sms, CONVERSATION_TYPE_COUNSELOR, Some(old), now));

        let mut notified = participant(ROLE_STUDENT);
        notified.last_unread_message_notification = Some(old + Duration::seconds(1));
        assert!(!participant_needs_unread_notice(&notified, CONVERSATION_TYPE_COUNSELOR, Some(old), now));
    }

    #[test]
    fn admins_only_hear_about_operations() {
        let now = Utc.with_ymd_and_hms(2024, 3, 6, 12, 0, 0).unwrap();
        let old = now - Duration::minutes(10);
        let admin = participant(ROLE_ADMIN);
        assert!(!participant_needs_unread_notice(&admin, CONVERSATION_TYPE_COUNSELOR, Some(old), now));
        assert!(participant_needs_unread_notice(&admin, CONVERSATION_TYPE_OPERATIONS, Some(old), now));
    }
}
