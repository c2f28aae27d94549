//! Hours reconciliation for tutoring packages and counseling hour banks.

use chrono::Datelike;
use serde::Serialize;

use crate::types::{Minutes, Timestamp};

/// Last month (inclusive) of the spring semester.
pub const SPRING_END_MONTH: u32 = 5;

pub const SEMESTER_ONE: i32 = 1;
pub const SEMESTER_TWO: i32 = 2;

/// A session needs at least this many minutes left for it not to be the
/// student's last paid session.
pub const LAST_SESSION_THRESHOLD_MINUTES: Minutes = 60;

pub const SESSION_TYPE_TEST_PREP: &str = "t";
pub const SESSION_TYPE_CURRICULUM: &str = "c";

// ---------------------------------------------------------------------------
// Tutoring hours
// ---------------------------------------------------------------------------

/// Minutes purchased across all unreversed package purchases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurchasedMinutes {
    pub individual_test_prep: Minutes,
    pub group_test_prep: Minutes,
    pub individual_curriculum: Minutes,
}

impl PurchasedMinutes {
    pub fn add(&mut self, other: &PurchasedMinutes) {
        self.individual_test_prep += other.individual_test_prep;
        self.group_test_prep += other.group_test_prep;
        self.individual_curriculum += other.individual_curriculum;
    }
}

/// The fields of a student tutoring session that decide whether and where
/// it is deducted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUsage {
    pub duration_minutes: Minutes,
    pub session_type: String,
    pub set_cancelled: bool,
    pub late_cancel: bool,
    pub is_tentative: bool,
    pub is_group: bool,
    pub group_cancelled: bool,
}

impl SessionUsage {
    /// Missed sessions still count; any kind of cancellation does not.
    pub fn is_deducted(&self) -> bool {
        !self.set_cancelled && !self.late_cancel && !self.is_tentative && !self.group_cancelled
    }
}

/// Remaining and purchased minutes per hour bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TutoringHours {
    pub individual_test_prep: Minutes,
    pub group_test_prep: Minutes,
    pub individual_curriculum: Minutes,
    pub total_individual_test_prep: Minutes,
    pub total_group_test_prep: Minutes,
    pub total_individual_curriculum: Minutes,
}

impl TutoringHours {
    /// Minutes left in the bucket a session of `session_type` draws from.
    pub fn remaining_for(&self, session_type: &str) -> Minutes {
        if session_type == SESSION_TYPE_CURRICULUM {
            self.individual_curriculum
        } else {
            self.individual_test_prep
        }
    }
}

pub fn available_tutoring_hours(purchased: PurchasedMinutes, sessions: &[SessionUsage]) -> TutoringHours {
    let mut used = PurchasedMinutes::default();
    for session in sessions.iter().filter(|s| s.is_deducted()) {
        if session.is_group {
            used.group_test_prep += session.duration_minutes;
        } else if session.session_type == SESSION_TYPE_TEST_PREP {
            used.individual_test_prep += session.duration_minutes;
        } else {
            used.individual_curriculum += session.duration_minutes;
        }
    }
    TutoringHours {
        individual_test_prep: purchased.individual_test_prep - used.individual_test_prep,
        group_test_prep: purchased.group_test_prep - used.group_test_prep,
        individual_curriculum: purchased.individual_curriculum - used.individual_curriculum,
        total_individual_test_prep: purchased.individual_test_prep,
        total_group_test_prep: purchased.group_test_prep,
        total_individual_curriculum: purchased.individual_curriculum,
    }
}

/// Fewer than an hour left in the bucket this session uses.
pub fn is_last_session(remaining_minutes: Minutes) -> bool {
    remaining_minutes < LAST_SESSION_THRESHOLD_MINUTES
}

// ---------------------------------------------------------------------------
// Counseling hours
// ---------------------------------------------------------------------------

/// One grant or time entry row, with its hours-bank flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankRow {
    pub minutes: Minutes,
    pub include_in_hours_bank: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounselingBalance {
    pub total_minutes: Minutes,
    pub used_minutes: Minutes,
    pub remaining_minutes: Minutes,
}

pub fn counseling_balance(grants: &[BankRow], entries: &[BankRow]) -> CounselingBalance {
    let sum = |rows: &[BankRow]| -> Minutes {
        rows.iter()
            .filter(|r| r.include_in_hours_bank)
            .map(|r| r.minutes)
            .sum()
    };
    let total = sum(grants);
    let used = sum(entries);
    CounselingBalance {
        total_minutes: total,
        used_minutes: used,
        remaining_minutes: total - used,
    }
}

// ---------------------------------------------------------------------------
// Grade and semester
// ---------------------------------------------------------------------------

/// Fall is semester one; January through May is semester two.
pub fn current_semester(month: u32) -> i32 {
    if month > SPRING_END_MONTH {
        SEMESTER_ONE
    } else {
        SEMESTER_TWO
    }
}

pub fn current_grade(graduation_year: i32, now: Timestamp) -> i32 {
    let offset = graduation_year - now.year();
    if current_semester(now.month()) == SEMESTER_ONE {
        13 - offset
    } else {
        12 - offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn session(kind: &str, minutes: Minutes) -> SessionUsage {
        SessionUsage {
            duration_minutes: minutes,
            session_type: kind.to_string(),
            set_cancelled: false,
            late_cancel: false,
            is_tentative: false,
            is_group: false,
            group_cancelled: false,
        }
    }

    fn purchased() -> PurchasedMinutes {
        PurchasedMinutes {
            individual_test_prep: 600,
            group_test_prep: 300,
            individual_curriculum: 120,
        }
    }

    #[test]
    fn deducts_by_bucket() {
        let mut group = session(SESSION_TYPE_TEST_PREP, 90);
        group.is_group = true;
        let sessions = [
            session(SESSION_TYPE_TEST_PREP, 60),
            session(SESSION_TYPE_CURRICULUM, 60),
            group,
        ];
        let hours = available_tutoring_hours(purchased(), &sessions);
        assert_eq!(hours.individual_test_prep, 540);
        assert_eq!(hours.individual_curriculum, 60);
        assert_eq!(hours.group_test_prep, 210);
        assert_eq!(hours.total_individual_test_prep, 600);
    }

    #[test]
    fn cancelled_and_tentative_are_free() {
        let mut cancelled = session(SESSION_TYPE_TEST_PREP, 60);
        cancelled.set_cancelled = true;
        let mut late = session(SESSION_TYPE_TEST_PREP, 60);
        late.late_cancel = true;
        let mut tentative = session(SESSION_TYPE_TEST_PREP, 60);
        tentative.is_tentative = true;
        let mut group_off = session(SESSION_TYPE_TEST_PREP, 60);
        group_off.is_group = true;
        group_off.group_cancelled = true;
        let hours = available_tutoring_hours(purchased(), &[cancelled, late, tentative, group_off]);
        assert_eq!(hours.individual_test_prep, 600);
        assert_eq!(hours.group_test_prep, 300);
    }

    #[test]
    fn remaining_can_go_negative() {
        let hours = available_tutoring_hours(
            PurchasedMinutes::default(),
            &[session(SESSION_TYPE_CURRICULUM, 60)],
        );
        assert_eq!(hours.remaining_for(SESSION_TYPE_CURRICULUM), -60);
        assert!(is_last_session(hours.remaining_for(SESSION_TYPE_CURRICULUM)));
        assert!(!is_last_session(60));
    }

    #[test]
    fn counseling_balance_only_counts_bank_rows() {
        let grants = [
            BankRow { minutes: 600, include_in_hours_bank: true },
            BankRow { minutes: 60, include_in_hours_bank: false },
        ];
        let entries = [
            BankRow { minutes: 90, include_in_hours_bank: true },
            BankRow { minutes: 30, include_in_hours_bank: false },
        ];
        let balance = counseling_balance(&grants, &entries);
        assert_eq!(balance.total_minutes, 600);
        assert_eq!(balance.used_minutes, 90);
        assert_eq!(balance.remaining_minutes, 510);
    }

    #[test]
    fn semester_boundaries() {
        assert_eq!(current_semester(5), SEMESTER_TWO);
        assert_eq!(current_semester(6), SEMESTER_ONE);
        assert_eq!(current_semester(1), SEMESTER_TWO);
    }

    #[test]
    fn grade_from_graduation_year() {
        // Fall 2024, class of 2026 -> junior.
        let fall = Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap();
        assert_eq!(current_grade(2026, fall), 11);
        // Spring 2025, same class -> still a junior.
        let spring = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(current_grade(2026, spring), 11);
    }
}
