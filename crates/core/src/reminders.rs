//! Reminder windows, backoff and de-duplication rules.
//!
//! Batch jobs run every few minutes, so each rule here is phrased as a
//! predicate over "now" and the persisted last-sent timestamp. A reminder is
//! only due once per threshold because the job records `last_reminder_sent`
//! after sending and the predicate compares against it.

use chrono::Duration;

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Minutes before a tutoring session at which reminders go out.
pub const TUTORING_SESSION_REMINDER_MINUTES: &[i64] = &[48 * 60];

/// Minutes before a counselor meeting at which reminders go out.
pub const COUNSELOR_MEETING_REMINDER_MINUTES: &[i64] = &[48 * 60];

/// A task due within this many hours counts as "coming due".
pub const TASK_DUE_WINDOW_HOURS: i64 = 48;

/// A user is reminded about the same task at most once per this many hours.
pub const TASK_REMINDER_BACKOFF_HOURS: i64 = 23;

/// The daily digest lists tasks assigned within this many hours.
pub const TASK_DIGEST_LOOKBACK_HOURS: i64 = 24;

/// Minimum gap between two task digests for one user. Slightly less than a
/// day so a job that runs a few minutes late still sends.
pub const TASK_DIGEST_MIN_GAP_HOURS: i64 = 23;

/// Minimum gap between two of any other daily digest for one recipient.
pub const DAILY_DIGEST_MIN_GAP_HOURS: i64 = 23;

/// Minimum gap between two weekly digests for one recipient.
pub const WEEKLY_DIGEST_MIN_GAP_DAYS: i64 = 6;

/// Minutes after invite creation before the first reminder.
pub const INVITE_FIRST_REMINDER_MINUTES: i64 = 48 * 60;

/// Minutes between subsequent invite reminders.
pub const INVITE_PERIODIC_REMINDER_MINUTES: i64 = 7 * 24 * 60;

/// Minutes after the last message in a conversation before unread notices go out.
pub const UNREAD_MESSAGE_DELAY_MINUTES: i64 = 3;

/// At most this many unread messages are quoted in one notice.
pub const MAX_UNREAD_MESSAGES: usize = 10;

// ---------------------------------------------------------------------------
// Upcoming-event windows
// ---------------------------------------------------------------------------

/// The start-time range an event must fall in to get the reminder for one
/// threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderWindow {
    pub threshold_minutes: i64,
    /// Events must start strictly after this instant.
    pub after: Timestamp,
    /// Events must start at or after this instant. Equals `after` for the
    /// smallest threshold.
    pub not_before: Timestamp,
    /// Events must start at or before this instant.
    pub until: Timestamp,
}

impl ReminderWindow {
    /// Whether an event starting at `start` falls in this window.
    pub fn contains(&self, start: Timestamp) -> bool {
        start > self.after && start >= self.not_before && start <= self.until
    }

    /// Latest `last_reminder_sent` value that still counts as "not yet
    /// reminded" for an event starting at `start`.
    pub fn reminded_cutoff(&self, start: Timestamp) -> Timestamp {
        start - Duration::minutes(self.threshold_minutes)
    }
}

/// Sort reminder thresholds from the furthest out to the nearest.
pub fn sorted_thresholds(thresholds: &[i64]) -> Vec<i64> {
    let mut sorted = thresholds.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    sorted.dedup();
    sorted
}

/// Build one window per threshold.
///
/// Windows do not overlap: an event inside the 24h window is not also
/// picked up by a 48h window, so each threshold fires once.
pub fn reminder_windows(now: Timestamp, thresholds: &[i64]) -> Vec<ReminderWindow> {
    let sorted = sorted_thresholds(thresholds);
    sorted
        .iter()
        .enumerate()
        .map(|(idx, &minutes)| {
            let not_before = match sorted.get(idx + 1) {
                Some(&next) => now + Duration::minutes(next),
                None => now,
            };
            ReminderWindow {
                threshold_minutes: minutes,
                after: now,
                not_before,
                until: now + Duration::minutes(minutes),
            }
        })
        .collect()
}

/// An event starting at `start` still needs its reminder for `threshold_minutes`.
pub fn reminder_due(
    start: Timestamp,
    last_reminder_sent: Option<Timestamp>,
    threshold_minutes: i64,
) -> bool {
    match last_reminder_sent {
        None => true,
        Some(sent) => sent < start - Duration::minutes(threshold_minutes),
    }
}

// ---------------------------------------------------------------------------
// Backoff
// ---------------------------------------------------------------------------

/// True when nothing was sent yet or the last send is older than `hours`.
pub fn backoff_elapsed(last_sent: Option<Timestamp>, now: Timestamp, hours: i64) -> bool {
    match last_sent {
        None => true,
        Some(sent) => sent < now - Duration::hours(hours),
    }
}

/// Whether a pending user is due an invite reminder.
///
/// The first reminder goes out two days after the invite unless one was
/// already sent. After that a reminder goes out weekly, keyed off
/// `last_invited`.
pub fn invite_reminder_due(
    now: Timestamp,
    invited_at: Timestamp,
    last_invited: Option<Timestamp>,
    reminder_already_sent: bool,
) -> bool {
    let first_due = invited_at <= now - Duration::minutes(INVITE_FIRST_REMINDER_MINUTES)
        && !reminder_already_sent;
    let periodic_due = last_invited
        .map(|t| t < now - Duration::minutes(INVITE_PERIODIC_REMINDER_MINUTES))
        .unwrap_or(false);
    first_due || periodic_due
}

// ---------------------------------------------------------------------------
// Task due buckets
// ---------------------------------------------------------------------------

/// Which list a task appears in on a student task reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueBucket {
    Overdue,
    ComingDue,
}

/// Classify a task's due date relative to `now`.
pub fn task_due_bucket(due: Option<Timestamp>, now: Timestamp) -> Option<DueBucket> {
    let due = due?;
    if due < now {
        Some(DueBucket::Overdue)
    } else if due > now && due < now + Duration::hours(TASK_DUE_WINDOW_HOURS) {
        Some(DueBucket::ComingDue)
    } else {
        None
    }
}

/// Conversations whose last message is older than this are eligible for
/// unread notices.
pub fn unread_message_cutoff(now: Timestamp) -> Timestamp {
    now - Duration::minutes(UNREAD_MESSAGE_DELAY_MINUTES)
}
