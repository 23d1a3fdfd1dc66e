use crate::error::{EtlError, Result};
use crate::models::{FactRow, LocationDimRow, TimeDimRow};
use crate::utils::constants::MAX_LOOKBACK_HOURS;
use crate::utils::timestamp::{format_timestamp, parse_timestamp};
use chrono::{DateTime, TimeDelta, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OpenFlags, Row};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reject lookback windows beyond one week before any query runs.
pub fn validate_lookback(hours: u32) -> Result<()> {
    if hours > MAX_LOOKBACK_HOURS {
        return Err(EtlError::InputValidation(format!(
            "lookback must be at most {} hours, got {}",
            MAX_LOOKBACK_HOURS, hours
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationAverage {
    pub location_id: i64,
    pub location_code: String,
    /// `None` when no observation falls inside the window
    pub avg_temperature: Option<f64>,
    pub observation_count: i64,
}

#[derive(Debug, Clone)]
pub struct AverageReport {
    pub lookback_hours: u32,
    pub cutoff: String,
    pub rows: Vec<LocationAverage>,
}

impl AverageReport {
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Average temperature, observations up to {} (now + {}h)\n",
            self.cutoff, self.lookback_hours
        );
        if self.rows.is_empty() {
            summary.push_str("No locations in store\n");
        }
        for row in &self.rows {
            let avg = row
                .avg_temperature
                .map(|t| format!("{:.2}°C", t))
                .unwrap_or_else(|| "n/a".to_string());
            summary.push_str(&format!(
                "  {:>3} {:<12} avg={:<10} n_obs={}\n",
                row.location_id, row.location_code, avg, row.observation_count
            ));
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeakWind {
    pub location_id: i64,
    pub location_code: String,
    pub max_wind_speed: f64,
    pub observed_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct WindReport {
    pub rows: Vec<PeakWind>,
}

impl WindReport {
    pub fn summary(&self) -> String {
        let mut summary = String::from("Peak wind speed per location\n");
        if self.rows.is_empty() {
            summary.push_str("No observations in store\n");
        }
        for row in &self.rows {
            summary.push_str(&format!(
                "  {:>3} {:<12} {:.1} km/h at {}\n",
                row.location_id,
                row.location_code,
                row.max_wind_speed,
                format_timestamp(&row.observed_timestamp)
            ));
        }
        summary
    }
}

/// Read-only queries over a loaded store.
pub struct WeatherAnalyzer {
    conn: Connection,
    path: PathBuf,
}

impl WeatherAnalyzer {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(EtlError::StoreNotFound(path.to_path_buf()));
        }

        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| EtlError::StoreConnection {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Average temperature per location over facts observed up to `now + hours`.
    pub fn average_temperature(&self, hours: u32, now: DateTime<Utc>) -> Result<AverageReport> {
        validate_lookback(hours)?;

        let cutoff = format_timestamp(&(now + TimeDelta::hours(i64::from(hours))));
        debug!(%cutoff, hours, "Running lookback average");

        let mut stmt = self.conn.prepare(
            "SELECT l.location_id, l.station_code, AVG(f.temperature_2m), COUNT(f.fact_id) \
             FROM dim_location l \
             LEFT JOIN fact_weather f \
               ON f.location_id = l.location_id AND f.observed_ts <= ?1 \
             GROUP BY l.location_id, l.station_code \
             ORDER BY l.location_id",
        )?;
        let rows = stmt
            .query_map(params![cutoff], |row| {
                Ok(LocationAverage {
                    location_id: row.get(0)?,
                    location_code: row.get(1)?,
                    avg_temperature: row.get(2)?,
                    observation_count: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(AverageReport {
            lookback_hours: hours,
            cutoff,
            rows,
        })
    }

    /// Highest wind speed per location and when it was observed.
    pub fn windiest(&self) -> Result<WindReport> {
        // SQLite takes bare columns from the row that holds the MAX
        let mut stmt = self.conn.prepare(
            "SELECT f.location_id, l.station_code, MAX(f.wind_speed_10m), f.observed_ts \
             FROM fact_weather f \
             JOIN dim_location l ON l.location_id = f.location_id \
             WHERE f.wind_speed_10m IS NOT NULL \
             GROUP BY f.location_id \
             ORDER BY f.location_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(PeakWind {
                    location_id: row.get(0)?,
                    location_code: row.get(1)?,
                    max_wind_speed: row.get(2)?,
                    observed_timestamp: timestamp_column(row, 3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(WindReport { rows })
    }

    pub fn read_time_dimension(&self, limit: Option<usize>) -> Result<Vec<TimeDimRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT time_id, ts_iso, year, month, day, hour, weekday, is_weekend, iso_week, quarter \
             FROM dim_time ORDER BY time_id LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![sql_limit(limit)], |row| {
                Ok(TimeDimRow {
                    time_id: row.get(0)?,
                    timestamp_hour: timestamp_column(row, 1)?,
                    year: row.get(2)?,
                    month: row.get(3)?,
                    day: row.get(4)?,
                    hour: row.get(5)?,
                    weekday: row.get(6)?,
                    is_weekend: row.get(7)?,
                    iso_week: row.get(8)?,
                    quarter: row.get(9)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn read_location_dimension(&self, limit: Option<usize>) -> Result<Vec<LocationDimRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT location_id, station_code, latitude, longitude \
             FROM dim_location ORDER BY location_id LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![sql_limit(limit)], |row| {
                Ok(LocationDimRow {
                    location_id: row.get(0)?,
                    location_code: row.get(1)?,
                    latitude: row.get(2)?,
                    longitude: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Fact rows in insertion order.
    pub fn read_facts(&self, limit: Option<usize>) -> Result<Vec<FactRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT time_id, location_id, temperature_2m, wind_speed_10m, wind_chill, observed_ts \
             FROM fact_weather ORDER BY fact_id LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![sql_limit(limit)], |row| {
                Ok(FactRow {
                    time_id: row.get(0)?,
                    location_id: row.get(1)?,
                    temperature: row.get(2)?,
                    wind_speed: row.get(3)?,
                    wind_chill: row.get(4)?,
                    observed_timestamp: timestamp_column(row, 5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Head of each table, formatted for the terminal.
    pub fn sample_tables(&self, limit: usize) -> Result<String> {
        let mut out = String::new();

        out.push_str("dim_time (head)\n");
        for row in self.read_time_dimension(Some(limit))? {
            out.push_str(&format!(
                "  {:>4} {} y={} m={} d={} h={} wd={} weekend={} wk={} q={}\n",
                row.time_id,
                format_timestamp(&row.timestamp_hour),
                row.year,
                row.month,
                row.day,
                row.hour,
                row.weekday,
                row.is_weekend,
                row.iso_week,
                row.quarter
            ));
        }

        out.push_str("dim_location (head)\n");
        for row in self.read_location_dimension(Some(limit))? {
            out.push_str(&format!(
                "  {:>4} {:<12} {:.2}, {:.2}\n",
                row.location_id, row.location_code, row.latitude, row.longitude
            ));
        }

        out.push_str("fact_weather (head)\n");
        for row in self.read_facts(Some(limit))? {
            out.push_str(&format!(
                "  t={:<4} l={:<3} temp={:.1} wind={:.1} chill={:.1} at {}\n",
                row.time_id,
                row.location_id,
                row.temperature,
                row.wind_speed,
                row.wind_chill,
                format_timestamp(&row.observed_timestamp)
            ));
        }

        Ok(out)
    }
}

/// Read a stored timestamp column, failing the row on malformed text.
fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    parse_timestamp(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// SQLite treats a negative LIMIT as unbounded.
fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map(|l| l as i64).unwrap_or(-1)
}
