//! Timestamp formatting and parsing.
//!
//! Formatting belongs to the storage backend (each dialect has its own literal
//! format), so the coercion engine only ever formats through a [`TimestampFormat`].
//! Parsing has a tolerant default that backends may override.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

/// Default `DateTime` format: `2024-01-31 13:45:00.000000`
pub const DEFAULT_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Default `DateTimeOffset` format: `2024-01-31 13:45:00.000000 +02:00`
pub const DEFAULT_TIMESTAMP_OFFSET: &str = "%Y-%m-%d %H:%M:%S%.6f %:z";

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

const OFFSET_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f %:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
];

/// Timestamp formatting supplied by a storage backend.
pub trait TimestampFormat {
    /// Format a `DateTime` column value.
    fn timestamp(&self, value: &NaiveDateTime) -> String;

    /// Format a `DateTimeOffset` column value.
    fn timestamp_offset(&self, value: &DateTime<FixedOffset>) -> String;

    /// Parse a `DateTime` column value returned as text.
    ///
    /// Accepts `YYYY-MM-DD[ T]HH:MM:SS[.f]`, a bare date, or any offset form
    /// (converted to UTC).
    fn parse_timestamp(&self, text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
            .or_else(|| self.parse_timestamp_offset(text).map(|dt| dt.naive_utc()))
    }

    /// Parse a `DateTimeOffset` column value returned as text.
    ///
    /// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.f][ ]±hh:mm`, or an offset-less
    /// timestamp (taken as UTC).
    fn parse_timestamp_offset(&self, text: &str) -> Option<DateTime<FixedOffset>> {
        let text = text.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt);
        }
        if let Some(dt) = OFFSET_FORMATS
            .iter()
            .find_map(|fmt| DateTime::parse_from_str(text, fmt).ok())
        {
            return Some(dt);
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
            .map(|naive| naive.and_utc().fixed_offset())
    }
}

/// ISO-style timestamps with microsecond precision.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTimestamps;

impl TimestampFormat for DefaultTimestamps {
    fn timestamp(&self, value: &NaiveDateTime) -> String {
        value.format(DEFAULT_TIMESTAMP).to_string()
    }

    fn timestamp_offset(&self, value: &DateTime<FixedOffset>) -> String {
        value.format(DEFAULT_TIMESTAMP_OFFSET).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn sample() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_micro_opt(13, 45, 7, 250_000)
            .unwrap()
    }

    #[test]
    fn test_default_format() {
        assert_eq!(DefaultTimestamps.timestamp(&sample()), "2024-02-29 13:45:07.250000");
    }

    #[test]
    fn test_parse_round_trip() {
        let text = DefaultTimestamps.timestamp(&sample());
        assert_eq!(DefaultTimestamps.parse_timestamp(&text), Some(sample()));

        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let dt = offset.from_local_datetime(&sample()).unwrap();
        let text = DefaultTimestamps.timestamp_offset(&dt);
        assert_eq!(text, "2024-02-29 13:45:07.250000 +02:00");
        assert_eq!(DefaultTimestamps.parse_timestamp_offset(&text), Some(dt));
    }

    #[test]
    fn test_parse_variants() {
        let ts = DefaultTimestamps;
        assert!(ts.parse_timestamp("2024-02-29T13:45:07").is_some());
        assert!(ts.parse_timestamp("2024-02-29").is_some());
        assert!(ts.parse_timestamp_offset("2024-02-29T13:45:07Z").is_some());
        assert!(ts.parse_timestamp_offset("2024-02-29 13:45:07").is_some());
        assert!(ts.parse_timestamp("yesterday").is_none());
    }
}
