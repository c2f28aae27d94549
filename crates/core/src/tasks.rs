//! Task visibility and notification rules.

use crate::notification_types::{TASK, TASK_DIAGNOSTIC};
use crate::types::DbId;

/// A counseling task is one created from a template or by a counselor.
pub fn is_cap_task(has_template: bool, creator_is_counselor: bool) -> bool {
    has_template || creator_is_counselor
}

/// Counseling tasks stay hidden from the student until a counselor makes
/// them visible. Tutoring tasks are always visible.
pub fn is_visible_to_student(
    visible_to_counseling_student: bool,
    has_template: bool,
    creator_is_counselor: bool,
) -> bool {
    !is_cap_task(has_template, creator_is_counselor) || visible_to_counseling_student
}

/// `assigned_time` marks when a task became visible, so it is only set for
/// tasks the student can see.
pub fn should_set_assigned_time(is_cap: bool, visible_to_counseling_student: bool) -> bool {
    !is_cap || visible_to_counseling_student
}

pub fn task_notification_type(has_diagnostic: bool) -> &'static str {
    if has_diagnostic {
        TASK_DIAGNOSTIC
    } else {
        TASK
    }
}

/// Roadmap templates are swapped for the counselor's own version when the
/// student has a counselor and the template is not already someone's
/// custom template.
pub fn use_counselor_override(
    template_roadmap_key: Option<&str>,
    student_counselor_id: Option<DbId>,
    template_created_by: Option<DbId>,
) -> bool {
    template_roadmap_key.is_some_and(|k| !k.is_empty())
        && student_counselor_id.is_some()
        && template_created_by.is_none()
}

/// CAP students without platform access get no task notifications.
pub fn suppress_task_notification(is_student: bool, has_access_to_cap: bool, is_cap: bool) -> bool {
    is_student && !has_access_to_cap && is_cap
}

/// Who hears about a completed task: its creator, else the student's
/// counselor (as a user id).
pub fn completion_recipient(
    created_by: Option<DbId>,
    student_counselor_user_id: Option<DbId>,
) -> Option<DbId> {
    created_by.or(student_counselor_user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tutoring_tasks_always_visible() {
        assert!(is_visible_to_student(false, false, false));
        assert!(!is_visible_to_student(false, true, false));
        assert!(!is_visible_to_student(false, false, true));
        assert!(is_visible_to_student(true, true, true));
    }

    #[test]
    fn assigned_time_only_for_visible() {
        assert!(should_set_assigned_time(false, false));
        assert!(!should_set_assigned_time(true, false));
        assert!(should_set_assigned_time(true, true));
    }

    #[test]
    fn diagnostic_tasks_use_their_own_type() {
        assert_eq!(task_notification_type(true), TASK_DIAGNOSTIC);
        assert_eq!(task_notification_type(false), TASK);
    }

    #[test]
    fn override_requires_key_counselor_and_stock_template() {
        assert!(use_counselor_override(Some("essay"), Some(1), None));
        assert!(!use_counselor_override(Some(""), Some(1), None));
        assert!(!use_counselor_override(None, Some(1), None));
        assert!(!use_counselor_override(Some("essay"), None, None));
        assert!(!use_counselor_override(Some("essay"), Some(1), Some(9)));
    }

    #[test]
    fn cap_students_without_access_get_nothing() {
        assert!(suppress_task_notification(true, false, true));
        assert!(!suppress_task_notification(true, true, true));
        assert!(!suppress_task_notification(true, false, false));
        assert!(!suppress_task_notification(false, false, true));
    }

    #[test]
    fn completion_goes_to_creator_first() {
        assert_eq!(completion_recipient(Some(3), Some(7)), Some(3));
        assert_eq!(completion_recipient(None, Some(7)), Some(7));
        assert_eq!(completion_recipient(None, None), None);
    }
}
