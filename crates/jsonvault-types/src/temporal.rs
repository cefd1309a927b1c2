//! Timestamp helpers.
//!
//! Timestamps are persisted as integer milliseconds since the UNIX epoch and
//! surfaced as `DateTime<Utc>`.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::TypeError;

/// Current wall-clock time, truncated to the millisecond precision that is
/// persisted.
pub fn now() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Current wall-clock time in milliseconds since the UNIX epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert persisted milliseconds back into a timestamp.
pub fn from_millis(ms: i64) -> Result<DateTime<Utc>, TypeError> {
    DateTime::from_timestamp_millis(ms).ok_or(TypeError::TimestampOutOfRange(ms))
}

/// Display name assigned to entries created without one.
///
/// `JSON_` followed by the ISO-8601 timestamp with `:` and `.` replaced by
/// `-`, e.g. `JSON_2024-03-01T09-15-42-120Z`.
pub fn generated_entry_name(at: DateTime<Utc>) -> String {
    let iso = at.to_rfc3339_opts(SecondsFormat::Millis, true);
    format!("JSON_{}", iso.replace([':', '.'], "-"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn millis_roundtrip() {
        let ms = 1_700_000_000_123;
        let ts = from_millis(ms).unwrap();
        assert_eq!(ts.timestamp_millis(), ms);
    }

    #[test]
    fn out_of_range_millis_rejected() {
        assert_eq!(
            from_millis(i64::MAX),
            Err(TypeError::TimestampOutOfRange(i64::MAX))
        );
    }

    #[test]
    fn generated_name_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 15, 42).unwrap()
            + chrono::Duration::milliseconds(120);
        assert_eq!(generated_entry_name(at), "JSON_2024-03-01T09-15-42-120Z");
    }

    #[test]
    fn now_has_millisecond_precision() {
        let a = now_millis();
        let b = now();
        assert!(b.timestamp_millis() >= a);
        assert_eq!(b.timestamp_subsec_nanos() % 1_000_000, 0);
    }
}
