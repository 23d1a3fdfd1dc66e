//! Run configuration.
//!
//! Sources, lowest priority first: built-in defaults, a TOML file
//! (`--config`, or `weather-etl.toml` in the working directory when present),
//! then `WEATHER_ETL_*` environment variables. Nested keys use a double
//! underscore, e.g. `WEATHER_ETL_FETCH__MAX_RETRIES=3`.

use crate::error::Result;
use crate::models::Location;
use crate::utils::constants::{
    DEFAULT_BACKOFF_SECS, DEFAULT_CACHE_DIR, DEFAULT_CACHE_EXPIRY_SECS, DEFAULT_CONFIG_FILE,
    DEFAULT_DATABASE_PATH, DEFAULT_FORECAST_URL, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS,
    ENV_PREFIX,
};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    pub database_path: PathBuf,

    #[validate(length(min = 1), nested, custom(function = "validate_unique_codes"))]
    pub locations: Vec<Location>,

    #[validate(nested)]
    pub fetch: FetchSettings,
}

/// HTTP transport and cache settings for the forecast reader.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct FetchSettings {
    #[validate(length(min = 1))]
    pub base_url: String,

    pub cache_dir: PathBuf,

    pub cache_expiry_secs: u64,

    #[validate(range(max = 10))]
    pub max_retries: u32,

    #[validate(range(min = 0.0, max = 60.0))]
    pub backoff_secs: f64,

    #[validate(range(min = 1))]
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            locations: Location::defaults(),
            fetch: FetchSettings::default(),
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_FORECAST_URL.to_string(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            cache_expiry_secs: DEFAULT_CACHE_EXPIRY_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_secs: DEFAULT_BACKOFF_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    /// Load and validate settings. An explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false),
        };

        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        debug!(?settings, "Configuration loaded");
        Ok(settings)
    }
}

#[allow(clippy::ptr_arg)]
fn validate_unique_codes(locations: &Vec<Location>) -> std::result::Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for location in locations {
        if !seen.insert(location.code.as_str()) {
            let mut err = ValidationError::new("duplicate_location_code");
            err.message = Some(format!("location code '{}' listed twice", location.code).into());
            return Err(err);
        }
    }
    Ok(())
}
