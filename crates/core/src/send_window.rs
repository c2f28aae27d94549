//! Local-time send gates for digests.
//!
//! Counselor digests go out at a fixed hour in the counselor's own timezone.
//! The worker polls hourly, so a counselor is eligible for a three-hour
//! window starting at the send hour. Combined with the "already sent since
//! window start" check this yields one digest per day per counselor.

use chrono::{Datelike, Duration, Timelike, Weekday};
use chrono_tz::Tz;

use crate::types::Timestamp;

/// Counselor task digest goes out at 2pm local time.
pub const COUNSELOR_TASK_DIGEST_SEND_HOUR: u32 = 14;

/// Counselor completed-tasks digest goes out at 7pm local time.
pub const COUNSELOR_COMPLETED_TASKS_SEND_HOUR: u32 = 19;

/// Hours after the send hour during which a digest may still go out.
pub const SEND_WINDOW_HOURS: u32 = 3;

/// Default zone for users without a valid timezone.
pub const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";

/// Parse an IANA timezone name, falling back to UTC.
pub fn parse_timezone(name: &str) -> Tz {
    match name.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            tracing::warn!(timezone = name, "Unknown timezone, falling back to UTC");
            Tz::UTC
        }
    }
}

/// Hour of day (0-23) at `now` in the named timezone.
pub fn local_hour(now: Timestamp, timezone: &str) -> u32 {
    now.with_timezone(&parse_timezone(timezone)).hour()
}

/// Whether a digest scheduled for `send_hour` may go out at `now` for a
/// user in `timezone`.
pub fn in_send_window(now: Timestamp, timezone: &str, send_hour: u32) -> bool {
    let hour = local_hour(now, timezone);
    hour >= send_hour && hour - send_hour < SEND_WINDOW_HOURS
}

/// Saturday or Sunday (UTC).
pub fn is_weekend(now: Timestamp) -> bool {
    matches!(now.weekday(), Weekday::Sat | Weekday::Sun)
}

fn is_friday(ts: Timestamp) -> bool {
    ts.weekday() == Weekday::Fri
}

/// Completion window for the completed-tasks digest.
///
/// Friday's digest covers the whole week since Tuesday so nothing
/// completed over the weekend-adjacent days is missed.
pub fn completed_digest_window(now: Timestamp) -> (Timestamp, Timestamp) {
    let lookback = if is_friday(now) {
        Duration::hours(72)
    } else {
        Duration::hours(24)
    };
    (now - lookback, now)
}

/// Meeting window for the counselor task digest.
///
/// Sent at 2pm, the digest covers meetings from ten hours out for a day,
/// or for three days when that window starts on a Friday so Monday
/// meetings are included.
pub fn task_digest_window(now: Timestamp) -> (Timestamp, Timestamp) {
    let start = now + Duration::hours(10);
    let span = if is_friday(start) {
        Duration::hours(72)
    } else {
        Duration::hours(24)
    };
    (start, start + span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn parse_known_and_unknown_zones() {
        assert_eq!(parse_timezone("America/New_York"), Tz::America__New_York);
        assert_eq!(parse_timezone("Mars/Olympus"), Tz::UTC);
    }

    #[test]
    fn send_window_in_local_time() {
        // 22:00 UTC in March (PDT) is 15:00 in Los Angeles.
        let now = Utc.with_ymd_and_hms(2024, 3, 20, 22, 0, 0).unwrap();
        assert!(in_send_window(now, "America/Los_Angeles", 14));
        assert!(!in_send_window(now, "America/New_York", 14));
    }

    #[test]
    fn send_window_closes_after_three_hours() {
        let tz = "UTC";
        let at = |h| Utc.with_ymd_and_hms(2024, 3, 20, h, 0, 0).unwrap();
        assert!(!in_send_window(at(13), tz, 14));
        assert!(in_send_window(at(14), tz, 14));
        assert!(in_send_window(at(16), tz, 14));
        assert!(!in_send_window(at(17), tz, 14));
    }

    #[test]
    fn weekend_detection() {
        let saturday = Utc.with_ymd_and_hms(2024, 3, 23, 12, 0, 0).unwrap();
        let monday = Utc.with_ymd_and_hms(2024, 3, 25, 12, 0, 0).unwrap();
        assert!(is_weekend(saturday));
        assert!(!is_weekend(monday));
    }

    #[test]
    fn completed_window_longer_on_friday() {
        let friday = Utc.with_ymd_and_hms(2024, 3, 22, 19, 0, 0).unwrap();
        let (start, end) = completed_digest_window(friday);
        assert_eq!(end - start, Duration::hours(72));

        let wednesday = Utc.with_ymd_and_hms(2024, 3, 20, 19, 0, 0).unwrap();
        let (start, end) = completed_digest_window(wednesday);
        assert_eq!(end - start, Duration::hours(24));
    }

    #[test]
    fn task_digest_window_extends_over_weekend() {
        // Thursday 21:00 UTC + 10h lands on Friday.
        let thursday = Utc.with_ymd_and_hms(2024, 3, 21, 21, 0, 0).unwrap();
        let (start, end) = task_digest_window(thursday);
        assert_eq!(start, thursday + Duration::hours(10));
        assert_eq!(end - start, Duration::hours(72));

        let tuesday = Utc.with_ymd_and_hms(2024, 3, 19, 21, 0, 0).unwrap();
        let (start, end) = task_digest_window(tuesday);
        assert_eq!(end - start, Duration::hours(24));
    }
}
