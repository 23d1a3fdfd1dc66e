//! DDL and statements for the weather star schema.

pub const CREATE_SCHEMA_SQL: &str = "
    CREATE TABLE IF NOT EXISTS dim_time (
        time_id     INTEGER PRIMARY KEY,
        ts_iso      TEXT NOT NULL UNIQUE,
        year        INTEGER NOT NULL,
        month       INTEGER NOT NULL,
        day         INTEGER NOT NULL,
        hour        INTEGER NOT NULL,
        weekday     INTEGER NOT NULL,
        is_weekend  INTEGER NOT NULL,
        iso_week    INTEGER NOT NULL,
        quarter     INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS dim_location (
        location_id   INTEGER PRIMARY KEY,
        station_code  TEXT NOT NULL UNIQUE,
        latitude      REAL NOT NULL,
        longitude     REAL NOT NULL
    );

    CREATE TABLE IF NOT EXISTS fact_weather (
        fact_id         INTEGER PRIMARY KEY AUTOINCREMENT,
        time_id         INTEGER NOT NULL,
        location_id     INTEGER NOT NULL,
        temperature_2m  REAL,
        wind_speed_10m  REAL,
        wind_chill      REAL,
        observed_ts     TEXT NOT NULL,
        FOREIGN KEY(time_id) REFERENCES dim_time(time_id),
        FOREIGN KEY(location_id) REFERENCES dim_location(location_id)
    );
    CREATE INDEX IF NOT EXISTS idx_fact_observed_ts ON fact_weather(observed_ts);
";

pub const INSERT_TIME_SQL: &str = "INSERT OR IGNORE INTO dim_time \
     (time_id, ts_iso, year, month, day, hour, weekday, is_weekend, iso_week, quarter) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)";

pub const INSERT_LOCATION_SQL: &str = "INSERT OR IGNORE INTO dim_location \
     (location_id, station_code, latitude, longitude) \
     VALUES (?1, ?2, ?3, ?4)";

pub const INSERT_FACT_SQL: &str = "INSERT INTO fact_weather \
     (time_id, location_id, temperature_2m, wind_speed_10m, wind_chill, observed_ts) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)";
