use crate::error::{EtlError, Result, UnresolvedRow};
use crate::models::{FactRow, LocationDimRow, RawObservation, StarSchema, TimeDimRow};
use crate::processors::integrity_checker::IntegrityChecker;
use crate::utils::timestamp::truncate_to_hour;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

/// Maps a flat observation series onto time/location dimensions and a fact table.
///
/// Surrogate keys are dense, 1-based and assigned in sorted natural-key order,
/// so the same input in any order yields the same schema.
pub struct StarTransformer {
    checker: IntegrityChecker,
}

impl StarTransformer {
    pub fn new() -> Self {
        Self {
            checker: IntegrityChecker::new(),
        }
    }

    /// Transform raw observations into a star schema.
    ///
    /// Fails with an integrity error if any fact row cannot be joined to both
    /// dimensions or the resulting tables violate a key invariant.
    pub fn transform(&self, rows: &[RawObservation]) -> Result<StarSchema> {
        let hours = truncate_all(rows)?;
        let time_dim = build_time_dimension(&hours);
        let location_dim = build_location_dimension(rows)?;
        let facts = build_facts(rows, &time_dim, &location_dim)?;

        let schema = StarSchema {
            time_dim,
            location_dim,
            facts,
        };

        let report = self.checker.check(&schema);
        if !report.is_clean() {
            return Err(EtlError::DimensionIntegrity(
                self.checker.generate_summary(&report),
            ));
        }

        info!(
            time_rows = schema.time_dim.len(),
            location_rows = schema.location_dim.len(),
            fact_rows = schema.facts.len(),
            "Star schema built"
        );
        Ok(schema)
    }
}

impl Default for StarTransformer {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate_all(rows: &[RawObservation]) -> Result<Vec<DateTime<Utc>>> {
    rows.iter().map(|r| truncate_to_hour(r.timestamp)).collect()
}

/// Distinct hours, ascending, keyed 1..=N.
pub fn build_time_dimension(hours: &[DateTime<Utc>]) -> Vec<TimeDimRow> {
    let distinct: BTreeSet<DateTime<Utc>> = hours.iter().copied().collect();

    distinct
        .into_iter()
        .zip(1..)
        .map(|(hour, time_id)| TimeDimRow::from_hour(time_id, hour))
        .collect()
}

/// Distinct location codes, ascending, keyed 1..=N.
///
/// A code reported with two different coordinate pairs is rejected rather
/// than producing two rows for one natural key.
pub fn build_location_dimension(rows: &[RawObservation]) -> Result<Vec<LocationDimRow>> {
    let mut coordinates: BTreeMap<&str, (f64, f64)> = BTreeMap::new();

    for row in rows {
        let incoming = (row.latitude, row.longitude);
        match coordinates.get(row.location_code.as_str()) {
            Some(&existing) if existing != incoming => {
                return Err(EtlError::DimensionIntegrity(format!(
                    "Location '{}' reported at both ({}, {}) and ({}, {})",
                    row.location_code, existing.0, existing.1, incoming.0, incoming.1
                )));
            }
            Some(_) => {}
            None => {
                coordinates.insert(row.location_code.as_str(), incoming);
            }
        }
    }

    Ok(coordinates
        .into_iter()
        .zip(1..)
        .map(|((code, (latitude, longitude)), location_id)| LocationDimRow {
            location_id,
            location_code: code.to_string(),
            latitude,
            longitude,
        })
        .collect())
}

/// Join every raw row to its surrogate keys.
///
/// All unresolved rows are collected and reported together; no partial fact
/// table is ever returned.
pub fn build_facts(
    rows: &[RawObservation],
    time_dim: &[TimeDimRow],
    location_dim: &[LocationDimRow],
) -> Result<Vec<FactRow>> {
    let time_keys: HashMap<DateTime<Utc>, i64> = time_dim
        .iter()
        .map(|t| (t.timestamp_hour, t.time_id))
        .collect();
    let location_keys: HashMap<&str, i64> = location_dim
        .iter()
        .map(|l| (l.location_code.as_str(), l.location_id))
        .collect();

    let mut facts = Vec::with_capacity(rows.len());
    let mut unresolved = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let timestamp_hour = truncate_to_hour(row.timestamp)?;
        let time_id = time_keys.get(&timestamp_hour).copied();
        let location_id = location_keys.get(row.location_code.as_str()).copied();

        match (time_id, location_id) {
            (Some(time_id), Some(location_id)) => facts.push(FactRow {
                time_id,
                location_id,
                temperature: row.temperature,
                wind_speed: row.wind_speed,
                wind_chill: row.wind_chill,
                observed_timestamp: row.timestamp,
            }),
            _ => unresolved.push(UnresolvedRow {
                index,
                location_code: row.location_code.clone(),
                timestamp_hour,
                missing_time: time_id.is_none(),
                missing_location: location_id.is_none(),
            }),
        }
    }

    if !unresolved.is_empty() {
        debug!(count = unresolved.len(), "Fact join left unresolved rows");
        return Err(EtlError::UnresolvedFacts { rows: unresolved });
    }

    Ok(facts)
}
