use crate::writers::LoadStage;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EtlError>;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("No write permission for store directory '{}': {source}", .path.display())]
    StorePermission {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store path '{}' is a directory, not a file", .0.display())]
    StoreIsDirectory(PathBuf),

    #[error("Could not open store '{}': {source}", .path.display())]
    StoreConnection {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Store not found: {}", .0.display())]
    StoreNotFound(PathBuf),

    #[error("Load failed after stage {stage}: {source}")]
    LoadFailed {
        stage: LoadStage,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Built store failed validation: {0}")]
    StoreValidation(String),

    #[error("{} fact row(s) do not resolve to a dimension key (first: {})", .rows.len(), first_unresolved(.rows))]
    UnresolvedFacts { rows: Vec<UnresolvedRow> },

    #[error("Dimension integrity error: {0}")]
    DimensionIntegrity(String),

    #[error("Request for location '{location}' failed: {source}")]
    SourceRequest {
        location: String,
        #[source]
        source: reqwest_middleware::Error,
    },

    #[error("Request for location '{location}' returned HTTP {status}")]
    SourceStatus {
        location: String,
        status: reqwest::StatusCode,
    },

    #[error("Malformed response for location '{location}': {message}")]
    SourceFormat { location: String, message: String },

    #[error("Could not decode response for location '{location}': {source}")]
    SourceDecode {
        location: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Fetch failed for location(s): {}", .0.join(", "))]
    PartialFetch(Vec<String>),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InputValidation(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Timestamp error: {0}")]
    Timestamp(String),
}

/// Where an error sits in the pipeline's failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    StoreAccess,
    Integrity,
    Source,
    InputValidation,
    Other,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::StorePermission { .. }
            | EtlError::StoreIsDirectory(_)
            | EtlError::StoreConnection { .. }
            | EtlError::StoreNotFound(_)
            | EtlError::LoadFailed { .. }
            | EtlError::StoreValidation(_) => ErrorCategory::StoreAccess,
            EtlError::UnresolvedFacts { .. } | EtlError::DimensionIntegrity(_) => {
                ErrorCategory::Integrity
            }
            EtlError::SourceRequest { .. }
            | EtlError::SourceStatus { .. }
            | EtlError::SourceFormat { .. }
            | EtlError::SourceDecode { .. }
            | EtlError::PartialFetch(_) => ErrorCategory::Source,
            EtlError::InputValidation(_) => ErrorCategory::InputValidation,
            _ => ErrorCategory::Other,
        }
    }
}

/// A raw observation whose dimension lookup failed during the fact join.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedRow {
    pub index: usize,
    pub location_code: String,
    pub timestamp_hour: DateTime<Utc>,
    pub missing_time: bool,
    pub missing_location: bool,
}

impl fmt::Display for UnresolvedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let missing = match (self.missing_time, self.missing_location) {
            (true, true) => "time and location",
            (true, false) => "time",
            _ => "location",
        };
        write!(
            f,
            "row {} ({} @ {}) missing {} key",
            self.index, self.location_code, self.timestamp_hour, missing
        )
    }
}

fn first_unresolved(rows: &[UnresolvedRow]) -> String {
    rows.first()
        .map(|r| r.to_string())
        .unwrap_or_else(|| "none".to_string())
}
