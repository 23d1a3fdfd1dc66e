use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// A row of `dim_time`. Calendar fields are derived in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDimRow {
    pub time_id: i64,
    pub timestamp_hour: DateTime<Utc>,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    /// 0 = Monday
    pub weekday: u32,
    pub is_weekend: bool,
    pub iso_week: u32,
    pub quarter: u32,
}

impl TimeDimRow {
    pub fn from_hour(time_id: i64, timestamp_hour: DateTime<Utc>) -> Self {
        let weekday = timestamp_hour.weekday();
        Self {
            time_id,
            timestamp_hour,
            year: timestamp_hour.year(),
            month: timestamp_hour.month(),
            day: timestamp_hour.day(),
            hour: timestamp_hour.hour(),
            weekday: weekday.num_days_from_monday(),
            is_weekend: matches!(weekday, Weekday::Sat | Weekday::Sun),
            iso_week: timestamp_hour.iso_week().week(),
            quarter: (timestamp_hour.month() - 1) / 3 + 1,
        }
    }
}

/// A row of `dim_location`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationDimRow {
    pub location_id: i64,
    pub location_code: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// A row of `fact_weather`; `fact_id` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRow {
    pub time_id: i64,
    pub location_id: i64,
    pub temperature: f64,
    pub wind_speed: f64,
    pub wind_chill: f64,
    pub observed_timestamp: DateTime<Utc>,
}

/// The three tables produced by one transform run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StarSchema {
    pub time_dim: Vec<TimeDimRow>,
    pub location_dim: Vec<LocationDimRow>,
    pub facts: Vec<FactRow>,
}

impl StarSchema {
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn summary(&self) -> String {
        let range = match (self.time_dim.first(), self.time_dim.last()) {
            (Some(first), Some(last)) => format!(
                "{} to {}",
                first.timestamp_hour.format("%Y-%m-%d %H:00"),
                last.timestamp_hour.format("%Y-%m-%d %H:00")
            ),
            _ => "empty".to_string(),
        };

        format!(
            "Time rows: {}\nLocation rows: {}\nFact rows: {}\nHour range: {}",
            self.time_dim.len(),
            self.location_dim.len(),
            self.facts.len(),
            range
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_calendar_fields_weekday() {
        // 2024-03-13 is a Wednesday in ISO week 11
        let hour = Utc.with_ymd_and_hms(2024, 3, 13, 7, 0, 0).unwrap();
        let row = TimeDimRow::from_hour(1, hour);

        assert_eq!(row.year, 2024);
        assert_eq!(row.month, 3);
        assert_eq!(row.day, 13);
        assert_eq!(row.hour, 7);
        assert_eq!(row.weekday, 2);
        assert!(!row.is_weekend);
        assert_eq!(row.iso_week, 11);
        assert_eq!(row.quarter, 1);
    }

    #[test]
    fn test_calendar_fields_weekend_year_boundary() {
        // 2022-01-01 is a Saturday that belongs to ISO week 52 of 2021
        let hour = Utc.with_ymd_and_hms(2022, 1, 1, 23, 0, 0).unwrap();
        let row = TimeDimRow::from_hour(5, hour);

        assert_eq!(row.weekday, 5);
        assert!(row.is_weekend);
        assert_eq!(row.iso_week, 52);
        assert_eq!(row.quarter, 1);
    }

    #[test]
    fn test_quarters() {
        for (month, quarter) in [(1, 1), (3, 1), (4, 2), (6, 2), (7, 3), (9, 3), (10, 4), (12, 4)] {
            let hour = Utc.with_ymd_and_hms(2023, month, 1, 0, 0, 0).unwrap();
            assert_eq!(TimeDimRow::from_hour(1, hour).quarter, quarter);
        }
    }
}
