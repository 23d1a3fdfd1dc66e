use crate::error::{EtlError, Result};
use crate::utils::constants::TIMESTAMP_FORMAT;
use chrono::{DateTime, DurationRound, NaiveDateTime, ParseError, TimeDelta, Utc};

/// Truncate an instant to the start of its UTC hour
pub fn truncate_to_hour(timestamp: DateTime<Utc>) -> Result<DateTime<Utc>> {
    timestamp
        .duration_trunc(TimeDelta::hours(1))
        .map_err(|e| EtlError::Timestamp(format!("Cannot truncate {}: {}", timestamp, e)))
}

/// Render an instant in the store's `YYYY-MM-DD HH:MM:SS` format
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp written by [`format_timestamp`]
pub fn parse_timestamp(value: &str) -> std::result::Result<DateTime<Utc>, ParseError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map(|naive| naive.and_utc())
}

pub fn from_unix_seconds(seconds: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| EtlError::Timestamp(format!("Unix time {} is out of range", seconds)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_truncate_to_hour() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 10, 14, 37, 12).unwrap();
        let hour = truncate_to_hour(ts).unwrap();
        assert_eq!(hour, Utc.with_ymd_and_hms(2024, 3, 10, 14, 0, 0).unwrap());
    }

    #[test]
    fn test_format_and_parse() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let text = format_timestamp(&ts);
        assert_eq!(text, "2024-01-02 03:04:05");
        assert_eq!(parse_timestamp(&text).unwrap(), ts);
    }

    #[test]
    fn test_parse_rejects_iso_t_separator() {
        assert!(parse_timestamp("2024-01-02T03:04:05").is_err());
    }

    #[test]
    fn test_from_unix_seconds() {
        let ts = from_unix_seconds(1_704_067_200).unwrap();
        assert_eq!(format_timestamp(&ts), "2024-01-01 00:00:00");
    }
}
