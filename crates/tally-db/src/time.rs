//! Timestamp columns are INTEGER Unix milliseconds (UTC).

use chrono::{DateTime, Utc};

/// DateTime -> millis for binding.
pub fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

/// Millis column -> DateTime. Out-of-range values collapse to the epoch.
pub fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_round_trip() {
        let ts = DateTime::parse_from_rfc3339("2024-11-08T10:15:30.250Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(from_millis(to_millis(ts)), ts);
    }
}
