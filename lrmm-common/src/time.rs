//! Timestamp utilities
//!
//! Marker timestamps are epoch milliseconds in memory and ISO-8601 UTC text
//! (millisecond precision, `Z` suffix) in the sidecar document.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Document layout; `%Y` writes an explicit sign for years past 9999
const UTC_MILLIS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Lenient counterpart of [`UTC_MILLIS_FORMAT`] for reading
const UTC_PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert epoch milliseconds to a UTC timestamp
///
/// Returns `None` when the value is outside chrono's representable range.
pub fn millis_to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

/// Format epoch milliseconds as `YYYY-MM-DDTHH:MM:SS.mmmZ`
///
/// Years after 9999 are written with a sign (`+10000-01-01T...`); every
/// string produced here is accepted by [`parse_utc_millis`].
pub fn format_utc_millis(millis: i64) -> Option<String> {
    millis_to_datetime(millis).map(|dt| dt.format(UTC_MILLIS_FORMAT).to_string())
}

/// Parse an ISO-8601 timestamp into epoch milliseconds
///
/// Any RFC 3339 offset is accepted and normalized to UTC, as are the
/// signed expanded years written by [`format_utc_millis`].
pub fn parse_utc_millis(text: &str) -> Option<i64> {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.timestamp_millis())
        .or_else(|_| {
            NaiveDateTime::parse_from_str(text, UTC_PARSE_FORMAT)
                .map(|naive| naive.and_utc().timestamp_millis())
        })
        .ok()
}
