/// Fixed timestamp format used for every persisted instant
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Wind chill coefficients (temperature in °C, wind speed in km/h)
pub const WIND_CHILL_BASE: f64 = 13.12;
pub const WIND_CHILL_TEMP_FACTOR: f64 = 0.6215;
pub const WIND_CHILL_WIND_FACTOR: f64 = 11.37;
pub const WIND_CHILL_MIXED_FACTOR: f64 = 0.3965;
pub const WIND_CHILL_EXPONENT: f64 = 0.16;

/// Report bounds
pub const MAX_LOOKBACK_HOURS: u32 = 168;
pub const DEFAULT_SAMPLE_ROWS: usize = 10;

/// Upstream forecast source
pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const HOURLY_VARIABLES: &str = "temperature_2m,wind_speed_10m";
pub const COORDINATE_DECIMALS: i32 = 2;

/// Fetch defaults
pub const DEFAULT_CACHE_DIR: &str = ".cache";
pub const DEFAULT_CACHE_EXPIRY_SECS: u64 = 3600;
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_BACKOFF_SECS: f64 = 0.2;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Store defaults
pub const DEFAULT_DATABASE_PATH: &str = "data/weather_star.db";
pub const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 30;
pub const STORE_FILE_MODE: u32 = 0o644;
pub const DEFAULT_CONFIG_FILE: &str = "weather-etl.toml";
pub const ENV_PREFIX: &str = "WEATHER_ETL";

/// Table names
pub const TIME_DIMENSION_TABLE: &str = "dim_time";
pub const LOCATION_DIMENSION_TABLE: &str = "dim_location";
pub const FACT_TABLE: &str = "fact_weather";
