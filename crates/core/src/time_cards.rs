//! Time-card reconciliation: pay rates, totals, approvals and pay periods.
//!
//! All money is integer cents and all durations integer minutes. Totals are
//! accumulated as `minutes * cents_per_hour` and divided by 60 once, rounding
//! half up, so a card of many short entries does not drift.

use chrono::{Datelike, Duration, NaiveTime, TimeZone, Utc};

use crate::error::CoreError;
use crate::types::{Cents, Minutes, Timestamp};

/// Counselor time entries in these categories are paid at a flat admin rate.
pub const ADMIN_CATEGORIES: &[&str] = &[
    "admin_training",
    "admin_freshmen_forum",
    "admin_the_gut_check",
    "admin_office_hours",
    "admin_counseling_call",
    "admin_meeting_with_manager",
    "admin_miscellaneous_admin_tasks",
];

/// Category used for time entries created from counselor meetings.
pub const MEETING_CATEGORY: &str = "meeting";

/// Hourly rate for admin-category time, in cents.
pub const ADMIN_TIME_PAY_RATE_CENTS: Cents = 3500;

/// Tutors with a card created within this many days are skipped by the
/// biweekly time-card job.
pub const TIME_CARD_BUFFER_DAYS: i64 = 8;

/// Tutor pay periods span this many days.
pub const PAY_PERIOD_DAYS: i64 = 14;

pub fn is_admin_category(category: &str) -> bool {
    ADMIN_CATEGORIES.contains(&category)
}

// ---------------------------------------------------------------------------
// Totals
// ---------------------------------------------------------------------------

/// Pick the rate for one counselor time entry: the entry's own rate, then
/// the student's counselor pay rate, then the card rate. Zero counts as unset.
pub fn effective_pay_rate(
    entry_rate: Option<Cents>,
    student_rate: Option<Cents>,
    card_rate: Cents,
) -> Cents {
    entry_rate
        .filter(|r| *r > 0)
        .or(student_rate.filter(|r| *r > 0))
        .unwrap_or(card_rate)
}

/// One counselor time entry as seen by the total calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounselorEntryAmount {
    pub minutes: Minutes,
    pub pay_rate_cents: Option<Cents>,
    pub student_pay_rate_cents: Option<Cents>,
}

/// One tutor time-card line item as seen by the total calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineItemAmount {
    pub minutes: Minutes,
    pub hourly_rate_cents: Option<Cents>,
}

fn minute_cents_to_cents(minute_cents: i64) -> Cents {
    (minute_cents + 30).div_euclid(60)
}

pub fn counselor_card_total(entries: &[CounselorEntryAmount], card_rate: Cents) -> Cents {
    let minute_cents: i64 = entries
        .iter()
        .map(|e| {
            e.minutes * effective_pay_rate(e.pay_rate_cents, e.student_pay_rate_cents, card_rate)
        })
        .sum();
    minute_cents_to_cents(minute_cents)
}

/// Line items carrying their own rate are paid at it; the rest at the card rate.
pub fn tutor_card_total(items: &[LineItemAmount], card_rate: Cents) -> Cents {
    let rated: i64 = items
        .iter()
        .filter_map(|i| i.hourly_rate_cents.map(|r| i.minutes * r))
        .sum();
    let unrated_minutes: i64 = items
        .iter()
        .filter(|i| i.hourly_rate_cents.is_none())
        .map(|i| i.minutes)
        .sum();
    minute_cents_to_cents(rated + unrated_minutes * card_rate)
}

// ---------------------------------------------------------------------------
// Approval
// ---------------------------------------------------------------------------

/// Two-level approval state shared by counselor and tutor cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApprovalState {
    pub owner_approved_at: Option<Timestamp>,
    pub admin_approved_at: Option<Timestamp>,
}

impl ApprovalState {
    pub fn approve_as_owner(&mut self, now: Timestamp) -> Result<(), CoreError> {
        if self.owner_approved_at.is_some() {
            return Err(CoreError::Conflict(
                "Time card already approved by its owner".into(),
            ));
        }
        self.owner_approved_at = Some(now);
        Ok(())
    }

    /// Admin approval implies owner approval when the owner has not yet
    /// signed off.
    pub fn approve_as_admin(&mut self, now: Timestamp) -> Result<(), CoreError> {
        if self.admin_approved_at.is_some() {
            return Err(CoreError::Conflict(
                "Time card already approved as admin".into(),
            ));
        }
        if self.owner_approved_at.is_none() {
            self.owner_approved_at = Some(now);
        }
        self.admin_approved_at = Some(now);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Spans
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl Span {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// An existing card borders or overlaps `proposed`.
    fn meets(&self, proposed: &Span) -> bool {
        (self.start >= proposed.start && self.start <= proposed.end)
            || (self.end >= proposed.start && self.end <= proposed.end)
            || spans_overlap(self, proposed)
    }
}

/// Open-interval overlap, used to reject a new card.
pub fn spans_overlap(a: &Span, b: &Span) -> bool {
    a.start < b.end && a.end > b.start
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MultipleExisting,
    Overlapping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanDecision {
    Create(Span),
    Skip(SkipReason),
}

/// Fit a proposed span around the tutor's existing cards.
///
/// Cards may not be disjoint or overlap, so at most one neighbouring card
/// can be accommodated by trimming the proposed span to its edge.
pub fn adjust_span_for_existing(proposed: Span, existing: &[Span]) -> SpanDecision {
    let touching: Vec<&Span> = existing.iter().filter(|e| e.meets(&proposed)).collect();
    match touching.as_slice() {
        [] => SpanDecision::Create(proposed),
        [card] => {
            let (s, e) = (proposed.start, proposed.end);
            let splits = card.start > s && card.end < e;
            let covers = card.start <= s && card.end >= e;
            let crosses_start = card.start < s && s < card.end;
            let crosses_end = card.start < e && e < card.end;
            if splits || covers || crosses_start || crosses_end {
                return SpanDecision::Skip(SkipReason::Overlapping);
            }
            if card.start > s {
                SpanDecision::Create(Span::new(s, card.start))
            } else if card.end < e {
                SpanDecision::Create(Span::new(card.end, e))
            } else {
                SpanDecision::Create(proposed)
            }
        }
        _ => SpanDecision::Skip(SkipReason::MultipleExisting),
    }
}

// ---------------------------------------------------------------------------
// Pay period
// ---------------------------------------------------------------------------

/// Tutor pay period ending on the most recent Friday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayPeriod {
    pub start: Timestamp,
    /// Real end: Saturday 06:00 so late West Coast Friday sessions count.
    pub end: Timestamp,
    /// End shown on the card: Friday 23:59.
    pub display_end: Timestamp,
}

pub fn tutor_pay_period(now: Timestamp) -> PayPeriod {
    let weekday = i64::from(now.weekday().num_days_from_monday());
    let offset = if weekday >= 5 { weekday - 4 } else { weekday + 3 };
    let friday = (now - Duration::days(offset)).date_naive();
    let friday_close = NaiveTime::from_hms_opt(23, 59, 0).unwrap_or_default();
    let display_end = Utc.from_utc_datetime(&friday.and_time(friday_close));
    let end = display_end + Duration::hours(6);
    PayPeriod {
        start: end - Duration::days(PAY_PERIOD_DAYS),
        end,
        display_end,
    }
}
