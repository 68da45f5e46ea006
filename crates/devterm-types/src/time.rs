//! Wall-clock helpers.
//!
//! All persisted timestamps are Unix epoch milliseconds (`i64`).

use chrono::{DateTime, TimeZone, Utc};

/// Current time as epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert epoch milliseconds to a UTC datetime. Out-of-range values clamp to
/// the Unix epoch.
pub fn to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Format epoch milliseconds as `YYYY-MM-DD HH:MM:SS` (UTC).
pub fn format_ms(ms: i64) -> String {
    to_datetime(ms).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Format epoch milliseconds as `HH:MM:SS` (UTC).
pub fn format_clock(ms: i64) -> String {
    to_datetime(ms).format("%H:%M:%S").to_string()
}

/// Fresh random identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_epoch() {
        assert_eq!(format_ms(0), "1970-01-01 00:00:00");
        assert_eq!(format_clock(3_661_000), "01:01:01");
    }

    #[test]
    fn now_is_after_2020() {
        assert!(now_ms() > 1_577_836_800_000);
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(new_id(), new_id());
    }
}
