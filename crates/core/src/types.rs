/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Monetary amounts are stored as integer cents.
pub type Cents = i64;

/// Durations of billable or purchased time are stored as whole minutes.
pub type Minutes = i64;

/// Convert minutes to fractional hours for display.
pub fn minutes_to_hours(minutes: Minutes) -> f64 {
    minutes as f64 / 60.0
}
