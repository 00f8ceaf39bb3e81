//! Timestamp utilities

use chrono::{DateTime, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current UTC time as an RFC 3339 string with millisecond precision
///
/// Matches the `toISOString()` shape the submission form stamps on envelopes.
pub fn now_rfc3339() -> String {
    now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Seconds elapsed since `start`, clamped at zero
pub fn seconds_since(start: DateTime<Utc>) -> u64 {
    now().signed_duration_since(start).num_seconds().max(0) as u64
}
