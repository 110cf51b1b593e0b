//! Date parsing helpers shared by the client boundary and the CLI.

use chrono::{NaiveDate, NaiveDateTime};

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Parse an activity start timestamp.
///
/// Accepts:
/// - `YYYY-MM-DD HH:MM:SS` (what the activity list returns)
/// - `YYYY-MM-DDTHH:MM:SS`, with or without fractional seconds
/// - RFC3339, converted to its local wall-clock time
/// - anything starting with a `YYYY-MM-DD` date, taken as midnight
pub fn parse_start_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt);
        }
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    s.get(..10)
        .and_then(parse_date)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
