//! Rendering for notification titles, activity-log lines, SMS bodies and
//! plain-text email bodies.
//!
//! Everything is rendered from the notification's `additional_args`. Callers
//! put display-ready values there (names, dates already formatted in the
//! recipient's timezone) so rendering never needs the database.

use schoolnet_core::notification_types as types;
use serde_json::Value;

/// String argument, or `""` when absent.
fn arg<'a>(args: &'a Value, key: &str) -> &'a str {
    args.get(key).and_then(Value::as_str).unwrap_or("")
}

fn count(args: &Value) -> i64 {
    args.get("count").and_then(Value::as_i64).unwrap_or(0)
}

/// Display line for one list entry: a string, or an object with `title`
/// and optional `student` / `due`.
fn item_line(item: &Value) -> Option<String> {
    if let Some(s) = item.as_str() {
        return Some(s.to_string());
    }
    let title = item.get("title").and_then(Value::as_str)?;
    let mut line = title.to_string();
    if let Some(student) = item.get("student").and_then(Value::as_str) {
        line.push_str(&format!(" ({student})"));
    }
    if let Some(due) = item.get("due").and_then(Value::as_str) {
        line.push_str(&format!(" - due {due}"));
    }
    Some(line)
}

fn list(args: &Value, key: &str) -> Vec<String> {
    args.get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(item_line).collect())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Titles
// ---------------------------------------------------------------------------

/// Title for a notification, or `None` when the type has no renderer.
pub fn title(notification_type: &str, args: &Value, site_name: &str) -> Option<String> {
    let rendered = match notification_type {
        types::INVITE => format!("Create your account on {site_name}!"),
        types::INVITE_REMINDER => format!("Reminder: Create your account on {site_name}!"),
        types::USER_ACCEPTED_INVITE => format!(
            "{} has accepted their invite to {site_name}",
            arg(args, "name")
        ),
        types::TASK => format!("Task: {}", arg(args, "title")),
        types::TASK_DIAGNOSTIC => format!("Task: Complete {} diagnostic", arg(args, "title")),
        types::TASK_COMPLETE => format!(
            "{}'s {} is now Complete",
            arg(args, "name"),
            arg(args, "title")
        ),
        types::TASK_DIGEST => format!(
            "New Task(s): {} new task(s) has been assigned to you in {site_name}",
            count(args)
        ),
        types::STUDENT_TASK_REMINDER => format!("Overdue and Upcoming tasks in {site_name}"),
        types::INDIVIDUAL_TASK_REMINDER => format!("Task Reminder: {}", arg(args, "title")),
        types::STUDENT_TUTORING_SESSION_REMINDER => {
            format!("Reminder: Tutoring session - {}", arg(args, "date"))
        }
        types::TUTOR_TUTORING_SESSION_REMINDER => format!(
            "Reminder: Tutoring session with {} - {}",
            arg(args, "student"),
            arg(args, "date")
        ),
        types::TUTOR_GTS_REMINDER => format!(
            "Reminder: Group tutoring session ({}) - {}",
            arg(args, "title"),
            arg(args, "date")
        ),
        types::TUTOR_DAILY_DIGEST => "Daily Tutoring Digest".to_string(),
        types::TUTOR_TIME_CARD => format!(
            "New time card created ({} - {})",
            arg(args, "start"),
            arg(args, "end")
        ),
        types::PACKAGE_PURCHASE_CONFIRMATION => {
            format!("Confirmed: tutoring package {}", arg(args, "title"))
        }
        types::LAST_MEETING => {
            if count(args) == 1 {
                format!("1 student has their last session on {}", arg(args, "date"))
            } else {
                format!(
                    "{} students have their last session in the next week",
                    count(args)
                )
            }
        }
        types::OPS_UPCOMING_COURSE => format!("Upcoming Course: {}", arg(args, "course")),
        types::FIRST_INDIVIDUAL_TUTORING_SESSION_DAILY_DIGEST => {
            "Individual Tutoring Session Report".to_string()
        }
        types::STUDENT_COUNSELOR_MEETING_CONFIRMED => format!(
            "Meeting scheduled with {} on {}",
            arg(args, "counselor"),
            arg(args, "date")
        ),
        types::COUNSELOR_COUNSELOR_MEETING_CONFIRMED => format!(
            "Meeting scheduled with {} on {}",
            arg(args, "student"),
            arg(args, "date")
        ),
        types::STUDENT_COUNSELOR_MEETING_RESCHEDULED => format!(
            "Meeting with {} rescheduled to {}",
            arg(args, "counselor"),
            arg(args, "date")
        ),
        types::COUNSELOR_COUNSELOR_MEETING_RESCHEDULED => format!(
            "Meeting with {} rescheduled to {}",
            arg(args, "student"),
            arg(args, "date")
        ),
        types::STUDENT_COUNSELOR_MEETING_CANCELLED => format!(
            "Cancelled: Meeting with {} on {}",
            arg(args, "counselor"),
            arg(args, "date")
        ),
        types::STUDENT_COUNSELOR_SESSION_REMINDER => format!(
            "Reminder: Meeting scheduled with {} on {}",
            arg(args, "counselor"),
            arg(args, "date")
        ),
        types::COUNSELOR_MEETING_MESSAGE => match arg(args, "subject") {
            "" => format!(
                "{} has added notes from your meeting ({})",
                arg(args, "first_name"),
                arg(args, "meeting_title")
            ),
            subject => subject.to_string(),
        },
        types::COUNSELOR_WEEKLY_DIGEST => "Counselor Weekly Digest".to_string(),
        types::COUNSELOR_TASK_DIGEST => format!(
            "{site_name} Digest: Upcoming and Overdue Student Tasks ({})",
            count(args)
        ),
        types::COUNSELOR_COMPLETED_TASKS => format!(
            "{site_name} Digest: Recently completed tasks ({})",
            count(args)
        ),
        types::UNREAD_MESSAGES => format!(
            "[{site_name}] New messages in your conversation with {}",
            arg(args, "name")
        ),
        types::OPS_PAYGO_PAYMENT_SUCCESS => format!(
            "Automatic paygo payment successful for {}'s session",
            arg(args, "student")
        ),
        types::OPS_PAYGO_PAYMENT_FAILURE => format!(
            "Automatic paygo payment failed for {}'s session",
            arg(args, "student")
        ),
        types::OPS_MAGENTO_WEBHOOK => "Incoming webhook from Magento".to_string(),
        types::OPS_MAGENTO_WEBHOOK_FAILURE => "Incoming webhook from Magento FAILED".to_string(),
        _ => return None,
    };
    Some(rendered)
}

// ---------------------------------------------------------------------------
// Activity log
// ---------------------------------------------------------------------------

/// Activity-log title, frozen at creation time. Empty for types that do not
/// appear in the activity log.
pub fn activity_log_title(notification_type: &str, title: &str, args: &Value) -> String {
    match notification_type {
        types::INVITE => "Initial invitation sent".to_string(),
        types::INVITE_REMINDER => "Invitation reminder sent".to_string(),
        types::TASK => format!("Task ({}) created", arg(args, "title")),
        types::TASK_COMPLETE => format!("Task ({}) is now Complete", arg(args, "title")),
        types::STUDENT_TUTORING_SESSION_REMINDER => {
            format!("Reminder for tutoring session {}", arg(args, "date"))
        }
        types::OPS_PAYGO_PAYMENT_SUCCESS => format!(
            "Automatic paygo payment successful for {}'s session: {}",
            arg(args, "student"),
            arg(args, "session")
        ),
        types::OPS_PAYGO_PAYMENT_FAILURE => format!(
            "Automatic paygo payment failed for {}'s session: {}",
            arg(args, "student"),
            arg(args, "session")
        ),
        types::OPS_MAGENTO_WEBHOOK
        | types::OPS_MAGENTO_WEBHOOK_FAILURE
        | types::UNREAD_MESSAGES
        | types::STUDENT_COUNSELOR_MEETING_CONFIRMED
        | types::STUDENT_COUNSELOR_MEETING_RESCHEDULED
        | types::STUDENT_COUNSELOR_MEETING_CANCELLED
        | types::STUDENT_COUNSELOR_SESSION_REMINDER
        | types::COUNSELOR_MEETING_MESSAGE => title.to_string(),
        _ => String::new(),
    }
}

pub fn activity_log_description(notification_type: &str, args: &Value) -> String {
    match notification_type {
        types::OPS_MAGENTO_WEBHOOK | types::OPS_MAGENTO_WEBHOOK_FAILURE => {
            let order_ids: Vec<String> = args
                .get("items")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .map(|item| match item.get("order_id") {
                            Some(Value::String(s)) => s.clone(),
                            Some(Value::Null) | None => String::new(),
                            Some(other) => other.to_string(),
                        })
                        .collect()
                })
                .unwrap_or_default();
            let mut description = format!("Order IDs: {}\n", order_ids.join(", "));
            if let Some(attributes) = args.get("extension_attributes").and_then(Value::as_object) {
                for (key, value) in attributes {
                    let value = value.as_str().map_or_else(|| value.to_string(), str::to_string);
                    description.push_str(&format!("{key}: {value}\n"));
                }
            }
            description
        }
        _ => String::new(),
    }
}

// ---------------------------------------------------------------------------
// SMS
// ---------------------------------------------------------------------------

fn student_task_reminder_text(args: &Value, site_name: &str) -> String {
    let overdue = list(args, "overdue");
    let coming_due = list(args, "coming_due");
    let mut text = String::new();
    if !overdue.is_empty() {
        text.push_str("The following tasks are overdue:\n-");
        text.push_str(&overdue.join("\n\n-"));
    }
    if !coming_due.is_empty() {
        text.push_str("\n\nThe following tasks are coming due:\n-");
        text.push_str(&coming_due.join("\n\n-"));
    }
    text.push_str(&format!("\nYou can find all of your tasks in {site_name}"));
    text
}

/// Body of the text message for a notification. Types without a dedicated
/// template are texted their title.
pub fn text_body(notification_type: &str, title: &str, args: &Value, site_name: &str) -> String {
    match notification_type {
        types::TASK => format!(
            "A new task has been assigned in {site_name}: {}",
            arg(args, "title")
        ),
        types::STUDENT_COUNSELOR_MEETING_CONFIRMED => format!(
            "Meeting ({}) scheduled with {} on {}",
            arg(args, "meeting_title"),
            arg(args, "counselor"),
            arg(args, "date")
        ),
        types::STUDENT_COUNSELOR_MEETING_RESCHEDULED => format!(
            "Your meeting ({}) with {} has been rescheduled to {}",
            arg(args, "meeting_title"),
            arg(args, "counselor"),
            arg(args, "date")
        ),
        types::STUDENT_COUNSELOR_MEETING_CANCELLED => format!(
            "Your meeting ({}) with {} on {} has been cancelled",
            arg(args, "meeting_title"),
            arg(args, "counselor"),
            arg(args, "day")
        ),
        types::STUDENT_COUNSELOR_SESSION_REMINDER => format!(
            "Reminder: You have a meeting ({}) scheduled with {} on {}",
            arg(args, "meeting_title"),
            arg(args, "counselor"),
            arg(args, "date")
        ),
        "counselor_forward_student_message" => format!(
            "New message from {}:\n{}",
            arg(args, "author"),
            arg(args, "message")
        ),
        types::STUDENT_TASK_REMINDER => student_task_reminder_text(args, site_name),
        types::INDIVIDUAL_TASK_REMINDER => {
            let overdue = args.get("overdue").and_then(Value::as_bool).unwrap_or(false);
            format!(
                "Reminder: Your task \"{}\" {} due on {}.\nComplete it in {site_name}.",
                arg(args, "title"),
                if overdue { "was" } else { "is" },
                arg(args, "due_day")
            )
        }
        _ => title.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Email
// ---------------------------------------------------------------------------

const EMAIL_SECTIONS: &[(&str, &str)] = &[
    ("messages", "Messages"),
    ("overdue", "Overdue"),
    ("coming_due", "Coming due"),
    ("tasks", "Tasks"),
    ("meetings", "Meetings"),
    ("sessions", "Sessions"),
    ("students", "Students"),
];

/// Plain-text email body: title, optional description, then any list
/// content carried in `additional_args`.
pub fn email_body(
    title: &str,
    description: &str,
    args: &Value,
    site_name: &str,
    site_url: &str,
) -> String {
    let mut body = format!("{title}\n");
    if !description.is_empty() {
        body.push_str(&format!("\n{description}\n"));
    }
    if let Some(note) = args.get("note").and_then(Value::as_str).filter(|n| !n.is_empty()) {
        body.push_str(&format!("\n{note}\n"));
    }
    for (key, label) in EMAIL_SECTIONS {
        let lines = list(args, key);
        if lines.is_empty() {
            continue;
        }
        body.push_str(&format!("\n{label}:\n"));
        for line in lines {
            body.push_str(&format!("- {line}\n"));
        }
    }
    body.push_str(&format!("\n{site_name}: {site_url}\n"));
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_created_type_has_a_title() {
        let created = [
            types::INVITE,
            types::INVITE_REMINDER,
            types::TASK,
            types::TASK_DIAGNOSTIC,
            types::TASK_COMPLETE,
            types::TASK_DIGEST,
            types::STUDENT_TASK_REMINDER,
            types::INDIVIDUAL_TASK_REMINDER,
            types::STUDENT_TUTORING_SESSION_REMINDER,
            types::TUTOR_TUTORING_SESSION_REMINDER,
            types::TUTOR_GTS_REMINDER,
            types::TUTOR_DAILY_DIGEST,
            types::TUTOR_TIME_CARD,
            types::PACKAGE_PURCHASE_CONFIRMATION,
            types::LAST_MEETING,
            types::OPS_UPCOMING_COURSE,
            types::FIRST_INDIVIDUAL_TUTORING_SESSION_DAILY_DIGEST,
            types::STUDENT_COUNSELOR_MEETING_CONFIRMED,
            types::COUNSELOR_COUNSELOR_MEETING_CONFIRMED,
            types::STUDENT_COUNSELOR_MEETING_RESCHEDULED,
            types::COUNSELOR_COUNSELOR_MEETING_RESCHEDULED,
            types::STUDENT_COUNSELOR_MEETING_CANCELLED,
            types::STUDENT_COUNSELOR_SESSION_REMINDER,
            types::COUNSELOR_MEETING_MESSAGE,
            types::COUNSELOR_WEEKLY_DIGEST,
            types::COUNSELOR_TASK_DIGEST,
            types::COUNSELOR_COMPLETED_TASKS,
            types::UNREAD_MESSAGES,
        ];
        for t in created {
            assert!(title(t, &json!({}), "SchoolNet").is_some(), "{t}");
        }
        assert!(title("no_such_type", &json!({}), "SchoolNet").is_none());
    }

    #[test]
    fn titles_use_args() {
        let args = json!({"counselor": "Sam Reyes", "date": "Mar 04 at 3:30PM PT"});
        assert_eq!(
            title(types::STUDENT_COUNSELOR_MEETING_CONFIRMED, &args, "SchoolNet").unwrap(),
            "Meeting scheduled with Sam Reyes on Mar 04 at 3:30PM PT"
        );
        assert_eq!(
            title(types::UNREAD_MESSAGES, &json!({"name": "Kim Ito"}), "SchoolNet").unwrap(),
            "[SchoolNet] New messages in your conversation with Kim Ito"
        );
        let course = json!({"course": "SAT Bootcamp starting on 03/04/2024 with Tia Test"});
        assert_eq!(
            title(types::OPS_UPCOMING_COURSE, &course, "SchoolNet").unwrap(),
            "Upcoming Course: SAT Bootcamp starting on 03/04/2024 with Tia Test"
        );
    }

    #[test]
    fn last_meeting_title_depends_on_count() {
        let one = json!({"count": 1, "date": "Mar 04"});
        let many = json!({"count": 3});
        assert_eq!(
            title(types::LAST_MEETING, &one, "S").unwrap(),
            "1 student has their last session on Mar 04"
        );
        assert_eq!(
            title(types::LAST_MEETING, &many, "S").unwrap(),
            "3 students have their last session in the next week"
        );
    }

    #[test]
    fn meeting_message_prefers_subject() {
        let with_subject = json!({"subject": "Next steps", "first_name": "Sam"});
        let without = json!({"first_name": "Sam", "meeting_title": "Kickoff"});
        assert_eq!(
            title(types::COUNSELOR_MEETING_MESSAGE, &with_subject, "S").unwrap(),
            "Next steps"
        );
        assert_eq!(
            title(types::COUNSELOR_MEETING_MESSAGE, &without, "S").unwrap(),
            "Sam has added notes from your meeting (Kickoff)"
        );
    }

    #[test]
    fn activity_log_only_for_listed_types() {
        let args = json!({"title": "Essay"});
        assert_eq!(activity_log_title(types::TASK, "Task: Essay", &args), "Task (Essay) created");
        assert_eq!(
            activity_log_title(types::UNREAD_MESSAGES, "New messages", &args),
            "New messages"
        );
        assert_eq!(activity_log_title(types::TASK_DIGEST, "Digest", &args), "");
    }

    #[test]
    fn magento_description_lists_orders_and_attributes() {
        let args = json!({
            "items": [{"order_id": 100}, {"order_id": "A-7"}],
            "extension_attributes": {"student_email": "s@example.com"}
        });
        assert_eq!(
            activity_log_description(types::OPS_MAGENTO_WEBHOOK, &args),
            "Order IDs: 100, A-7\nstudent_email: s@example.com\n"
        );
    }

    #[test]
    fn task_reminder_text_lists_both_groups() {
        let args = json!({
            "overdue": [{"id": 1, "title": "Essay"}],
            "coming_due": [{"id": 2, "title": "FAFSA"}, {"id": 3, "title": "SAT"}]
        });
        let text = text_body(types::STUDENT_TASK_REMINDER, "", &args, "SchoolNet");
        assert_eq!(
            text,
            "The following tasks are overdue:\n-Essay\n\nThe following tasks are coming due:\n-FAFSA\n\n-SAT\nYou can find all of your tasks in SchoolNet"
        );
    }

    #[test]
    fn individual_task_text_tense() {
        let args = json!({"title": "Essay", "overdue": true, "due_day": "Monday Mar 04"});
        assert_eq!(
            text_body(types::INDIVIDUAL_TASK_REMINDER, "", &args, "SchoolNet"),
            "Reminder: Your task \"Essay\" was due on Monday Mar 04.\nComplete it in SchoolNet."
        );
    }

    #[test]
    fn untemplated_text_falls_back_to_title() {
        assert_eq!(
            text_body(types::UNREAD_MESSAGES, "New messages", &json!({}), "S"),
            "New messages"
        );
    }

    #[test]
    fn email_body_renders_sections() {
        let args = json!({
            "messages": ["Kim: hello", "Kim: are you there?"],
            "tasks": [{"title": "Essay", "student": "Ada Park", "due": "Mar 04"}]
        });
        let body = email_body("Title", "", &args, "SchoolNet", "https://schoolnet.test");
        assert!(body.starts_with("Title\n"));
        assert!(body.contains("Messages:\n- Kim: hello\n- Kim: are you there?\n"));
        assert!(body.contains("Tasks:\n- Essay (Ada Park) - due Mar 04\n"));
        assert!(body.ends_with("SchoolNet: https://schoolnet.test\n"));
    }
}
