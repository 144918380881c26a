//! Timestamp utilities

use chrono::{DateTime, NaiveDateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Whole days elapsed from `earlier` to `now` (negative if `earlier` is in the future)
pub fn days_between(earlier: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - earlier).num_days()
}

/// Parse a timestamp as reported by the upstream services
///
/// Accepts RFC 3339 (`2024-03-01T20:15:33.1234567Z`) and the naive
/// `2024-03-01 20:15:33.1234567` form written by the activity log, which is
/// taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01
        assert!(timestamp.timestamp() < 4_102_444_800); // 2100-01-01
    }

    #[test]
    fn test_days_between_truncates_partial_days() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let earlier = now - Duration::hours(47);
        assert_eq!(days_between(earlier, now), 1);
    }

    #[test]
    fn test_parse_rfc3339_with_seven_fraction_digits() {
        let parsed = parse_timestamp("2023-01-05T12:00:00.0000000Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2023, 1, 5, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_activity_log_format() {
        let parsed = parse_timestamp("2024-03-01 20:15:33.1234567").unwrap();
        assert_eq!(parsed.date_naive().to_string(), "2024-03-01");
    }

    #[test]
    fn test_parse_garbage_is_none() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
