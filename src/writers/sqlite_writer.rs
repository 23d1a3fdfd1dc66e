use crate::error::{EtlError, Result};
use crate::models::{FactRow, LocationDimRow, StarSchema, TimeDimRow};
use crate::utils::constants::{
    DEFAULT_BUSY_TIMEOUT_SECS, FACT_TABLE, LOCATION_DIMENSION_TABLE, TIME_DIMENSION_TABLE,
};
use crate::utils::timestamp::format_timestamp;
use crate::writers::schema::{
    CREATE_SCHEMA_SQL, INSERT_FACT_SQL, INSERT_LOCATION_SQL, INSERT_TIME_SQL,
};
use rusqlite::{params, Connection};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Progress of a single load. A failure reports the last stage reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadStage {
    NotStarted,
    SchemaCreated,
    DimensionsWritten,
    FactsWritten,
    Committed,
    Published,
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadStage::NotStarted => "NotStarted",
            LoadStage::SchemaCreated => "SchemaCreated",
            LoadStage::DimensionsWritten => "DimensionsWritten",
            LoadStage::FactsWritten => "FactsWritten",
            LoadStage::Committed => "Committed",
            LoadStage::Published => "Published",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct LoadSummary {
    pub path: PathBuf,
    pub time_rows: usize,
    pub location_rows: usize,
    pub fact_rows: usize,
}

impl LoadSummary {
    pub fn summary(&self) -> String {
        format!(
            "Store: {}\n{}: {} rows\n{}: {} rows\n{}: {} rows",
            self.path.display(),
            TIME_DIMENSION_TABLE,
            self.time_rows,
            LOCATION_DIMENSION_TABLE,
            self.location_rows,
            FACT_TABLE,
            self.fact_rows
        )
    }
}

/// Full-refresh loader for the SQLite star schema.
///
/// Each load builds a complete store in a staging file beside the target,
/// validates it, then renames it over the target. A failed load leaves any
/// previous store untouched.
pub struct SqliteWriter {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: Duration::from_secs(DEFAULT_BUSY_TIMEOUT_SECS),
        }
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check that the target can be replaced, creating its parent directory.
    ///
    /// Returns the parent directory the staging store will be built in.
    pub fn check_target(&self) -> Result<PathBuf> {
        let target = if self.path.is_absolute() {
            self.path.clone()
        } else {
            std::env::current_dir()?.join(&self.path)
        };

        if target.is_dir() {
            return Err(EtlError::StoreIsDirectory(target));
        }

        let parent = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        fs::create_dir_all(&parent).map_err(|e| EtlError::StorePermission {
            path: parent.clone(),
            source: e,
        })?;

        // Write-test file is removed on drop
        tempfile::Builder::new()
            .prefix(".write_test")
            .tempfile_in(&parent)
            .map_err(|e| EtlError::StorePermission {
                path: parent.clone(),
                source: e,
            })?;

        Ok(parent)
    }

    /// Replace the store with the given tables.
    pub fn load(&self, schema: &StarSchema) -> Result<LoadSummary> {
        let parent = self.check_target()?;

        let staging = tempfile::Builder::new()
            .prefix(".weather_star")
            .suffix(".db.staging")
            .tempfile_in(&parent)
            .map_err(|e| EtlError::StorePermission {
                path: parent.clone(),
                source: e,
            })?;
        debug!(staging = %staging.path().display(), "Building store in staging file");

        let mut conn =
            Connection::open(staging.path()).map_err(|e| EtlError::StoreConnection {
                path: staging.path().to_path_buf(),
                source: e,
            })?;
        conn.busy_timeout(self.busy_timeout)?;

        let stage = write_star_schema(&mut conn, schema)?;
        debug!(%stage, "Staging store committed");

        validate_store(&conn, schema)?;
        conn.close().map_err(|(_, e)| EtlError::Sqlite(e))?;

        // Readers may run under other accounts
        #[cfg(unix)]
        {
            use crate::utils::constants::STORE_FILE_MODE;
            use std::os::unix::fs::PermissionsExt;
            staging
                .as_file()
                .set_permissions(fs::Permissions::from_mode(STORE_FILE_MODE))?;
        }

        if self.path.exists() {
            warn!(path = %self.path.display(), "Replacing existing store");
        }
        staging
            .persist(&self.path)
            .map_err(|e| EtlError::Io(e.error))?;

        info!(
            stage = %LoadStage::Published,
            path = %self.path.display(),
            facts = schema.facts.len(),
            "Store published"
        );

        Ok(LoadSummary {
            path: self.path.clone(),
            time_rows: schema.time_dim.len(),
            location_rows: schema.location_dim.len(),
            fact_rows: schema.facts.len(),
        })
    }
}

fn failed_at(stage: LoadStage) -> impl Fn(rusqlite::Error) -> EtlError {
    move |source| EtlError::LoadFailed { stage, source }
}

/// Create the schema and write all three tables in one transaction.
pub fn write_star_schema(conn: &mut Connection, schema: &StarSchema) -> Result<LoadStage> {
    let mut stage = LoadStage::NotStarted;

    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(failed_at(stage))?;
    let tx = conn.transaction().map_err(failed_at(stage))?;

    tx.execute_batch(CREATE_SCHEMA_SQL)
        .map_err(failed_at(stage))?;
    stage = LoadStage::SchemaCreated;

    let time_inserted = insert_time_dimension(&tx, &schema.time_dim).map_err(failed_at(stage))?;
    let location_inserted =
        insert_location_dimension(&tx, &schema.location_dim).map_err(failed_at(stage))?;
    stage = LoadStage::DimensionsWritten;
    debug!(time_inserted, location_inserted, %stage, "Dimensions written");

    let facts_inserted = insert_facts(&tx, &schema.facts).map_err(failed_at(stage))?;
    stage = LoadStage::FactsWritten;
    debug!(facts_inserted, %stage, "Facts written");

    tx.commit().map_err(failed_at(stage))?;
    Ok(LoadStage::Committed)
}

/// Insert-or-ignore time rows; returns how many were new.
pub fn insert_time_dimension(conn: &Connection, rows: &[TimeDimRow]) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare_cached(INSERT_TIME_SQL)?;
    let mut inserted = 0;
    for row in rows {
        inserted += stmt.execute(params![
            row.time_id,
            format_timestamp(&row.timestamp_hour),
            row.year,
            row.month,
            row.day,
            row.hour,
            row.weekday,
            row.is_weekend,
            row.iso_week,
            row.quarter,
        ])?;
    }
    Ok(inserted)
}

/// Insert-or-ignore location rows; returns how many were new.
pub fn insert_location_dimension(
    conn: &Connection,
    rows: &[LocationDimRow],
) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare_cached(INSERT_LOCATION_SQL)?;
    let mut inserted = 0;
    for row in rows {
        inserted += stmt.execute(params![
            row.location_id,
            row.location_code,
            row.latitude,
            row.longitude,
        ])?;
    }
    Ok(inserted)
}

/// Strict fact insert; any constraint violation aborts.
pub fn insert_facts(conn: &Connection, rows: &[FactRow]) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare_cached(INSERT_FACT_SQL)?;
    let mut inserted = 0;
    for row in rows {
        inserted += stmt.execute(params![
            row.time_id,
            row.location_id,
            row.temperature,
            row.wind_speed,
            row.wind_chill,
            format_timestamp(&row.observed_timestamp),
        ])?;
    }
    Ok(inserted)
}

fn count_rows(conn: &Connection, table: &str) -> Result<usize> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
    Ok(count as usize)
}

/// Validate a committed staging store before it is published.
fn validate_store(conn: &Connection, schema: &StarSchema) -> Result<()> {
    let integrity: String = conn.query_row("PRAGMA integrity_check", [], |r| r.get(0))?;
    if integrity != "ok" {
        return Err(EtlError::StoreValidation(format!(
            "integrity_check reported: {}",
            integrity
        )));
    }

    let mut stmt = conn.prepare("PRAGMA foreign_key_check")?;
    let orphans = stmt.query_map([], |_| Ok(()))?.count();
    if orphans > 0 {
        return Err(EtlError::StoreValidation(format!(
            "{} row(s) fail foreign key check",
            orphans
        )));
    }

    let expected = [
        (TIME_DIMENSION_TABLE, schema.time_dim.len()),
        (LOCATION_DIMENSION_TABLE, schema.location_dim.len()),
        (FACT_TABLE, schema.facts.len()),
    ];
    for (table, want) in expected {
        let have = count_rows(conn, table)?;
        if have != want {
            return Err(EtlError::StoreValidation(format!(
                "{} holds {} rows, expected {}",
                table, have, want
            )));
        }
    }

    Ok(())
}
