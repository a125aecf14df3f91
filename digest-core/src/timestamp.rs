//! Lenient timestamp parsing for feed dates and persisted state
//!
//! Feeds disagree on date formats: RSS uses RFC 2822, Atom uses RFC 3339,
//! and hand-edited state files sometimes drop the offset entirely. Values
//! without an offset are read as UTC.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

/// Why a timestamp could not be produced
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    /// No value was supplied
    #[error("timestamp missing")]
    Missing,

    /// A value was supplied but matched no known format
    #[error("unparseable timestamp: {0}")]
    Unparseable(String),
}

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%a, %d %b %Y %H:%M:%S %z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a timestamp string, keeping its offset.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, TimestampError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(TimestampError::Missing);
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts);
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(value) {
        return Ok(ts);
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(value, fmt) {
            return Ok(ts);
        }
    }

    let utc = FixedOffset::east_opt(0)
        .ok_or_else(|| TimestampError::Unparseable(value.to_string()))?;

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(naive.and_utc().with_timezone(&utc));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc().with_timezone(&utc));
        }
    }

    Err(TimestampError::Unparseable(value.to_string()))
}

/// Parse a timestamp string and normalize it to UTC.
pub fn parse_timestamp_utc(raw: &str) -> Result<DateTime<Utc>, TimestampError> {
    parse_timestamp(raw).map(|ts| ts.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_rfc2822_feed_date() {
        let ts = parse_timestamp_utc("Tue, 04 Mar 2025 08:30:00 GMT").unwrap();
        assert_eq!(ts, utc(2025, 3, 4, 8, 30, 0));
    }

    #[test]
    fn test_rfc3339_with_offset() {
        let ts = parse_timestamp("2025-03-04T17:30:00.123456+09:00").unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 9 * 3600);
        assert_eq!(
            ts.with_timezone(&Utc),
            utc(2025, 3, 4, 8, 30, 0) + chrono::Duration::microseconds(123456)
        );
    }

    #[test]
    fn test_space_separated_offset() {
        let ts = parse_timestamp_utc("2025-03-04 17:30:00+09:00").unwrap();
        assert_eq!(ts, utc(2025, 3, 4, 8, 30, 0));
    }

    #[test]
    fn test_naive_values_are_utc() {
        assert_eq!(
            parse_timestamp_utc("2025-03-04T08:30:00").unwrap(),
            utc(2025, 3, 4, 8, 30, 0)
        );
        assert_eq!(parse_timestamp_utc("2025-03-04").unwrap(), utc(2025, 3, 4, 0, 0, 0));
    }

    #[test]
    fn test_missing_vs_unparseable() {
        assert_eq!(parse_timestamp("   "), Err(TimestampError::Missing));
        assert_eq!(
            parse_timestamp("last tuesday"),
            Err(TimestampError::Unparseable("last tuesday".to_string()))
        );
    }
}
