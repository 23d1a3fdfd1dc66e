use crate::utils::wind_chill::wind_chill;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One location's reading for one hourly tick, as produced by the fetcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct RawObservation {
    pub timestamp: DateTime<Utc>,

    #[validate(length(min = 1))]
    pub location_code: String,

    pub temperature: f64,

    #[validate(range(min = 0.0))]
    pub wind_speed: f64,

    pub wind_chill: f64,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

impl RawObservation {
    /// Build an observation, deriving wind chill from the two readings.
    pub fn new(
        timestamp: DateTime<Utc>,
        location_code: impl Into<String>,
        temperature: f64,
        wind_speed: f64,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            timestamp,
            location_code: location_code.into(),
            temperature,
            wind_speed,
            wind_chill: wind_chill(temperature, wind_speed),
            latitude,
            longitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_derives_wind_chill() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, 6, 0, 0).unwrap();
        let obs = RawObservation::new(ts, "Bergen", -10.0, 20.0, 60.36, 5.29);

        assert_eq!(obs.wind_chill, wind_chill(-10.0, 20.0));
        assert!(obs.validate().is_ok());
    }

    #[test]
    fn test_negative_wind_speed_invalid() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, 6, 0, 0).unwrap();
        let obs = RawObservation::new(ts, "Bergen", 1.0, -3.0, 60.36, 5.29);
        assert!(obs.validate().is_err());
    }
}
