//! Date formatting for notification titles, emails and texts.

use crate::send_window::parse_timezone;
use crate::types::Timestamp;

/// Zones we can label with a short abbreviation. Times in other zones are
/// shown as a date only, since an unlabeled time would be ambiguous.
const TIMEZONE_ABBREVIATIONS: &[(&str, &str)] = &[
    ("America/Los_Angeles", "PT"),
    ("America/Denver", "MT"),
    ("America/Phoenix", "MT"),
    ("America/Chicago", "CT"),
    ("America/New_York", "ET"),
    ("America/Anchorage", "AKT"),
    ("Pacific/Honolulu", "HT"),
];

fn abbreviation(timezone: &str) -> Option<&'static str> {
    TIMEZONE_ABBREVIATIONS
        .iter()
        .find(|(name, _)| *name == timezone)
        .map(|(_, abbr)| *abbr)
}

/// "Mar 04 at 3:30PM PT", or "Mar 04" for zones without an abbreviation.
pub fn format_datetime(dt: Timestamp, timezone: &str) -> String {
    let local = dt.with_timezone(&parse_timezone(timezone));
    match abbreviation(timezone) {
        Some(abbr) => format!("{} at {} {abbr}", local.format("%b %d"), local.format("%-I:%M%p")),
        None => local.format("%b %d").to_string(),
    }
}

/// "Mar 04" in the given zone.
pub fn format_day(dt: Timestamp, timezone: &str) -> String {
    dt.with_timezone(&parse_timezone(timezone))
        .format("%b %d")
        .to_string()
}

/// "03/04/2024" in UTC, used in time-card and admin titles.
pub fn format_mdy(dt: Timestamp) -> String {
    dt.format("%m/%d/%Y").to_string()
}

/// Render minutes as hours with up to two decimals: 90 -> "1.5".
pub fn format_hours(minutes: i64) -> String {
    let hundredths = (minutes * 100 + minutes.signum() * 30) / 60;
    let whole = hundredths / 100;
    let frac = (hundredths % 100).abs();
    let sign = if hundredths < 0 && whole == 0 { "-" } else { "" };
    match frac {
        0 => format!("{sign}{whole}"),
        f if f % 10 == 0 => format!("{sign}{whole}.{}", f / 10),
        f => format!("{sign}{whole}.{f:02}"),
    }
}
