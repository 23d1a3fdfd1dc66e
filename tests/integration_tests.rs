use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use weather_star_etl::analyzers::WeatherAnalyzer;
use weather_star_etl::models::{LocationDimRow, RawObservation, StarSchema};
use weather_star_etl::processors::{build_facts, build_time_dimension, StarTransformer};
use weather_star_etl::readers::ForecastResponse;
use weather_star_etl::writers::{LoadStage, SqliteWriter};
use weather_star_etl::{ErrorCategory, EtlError};

fn hour(h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, h, 0, 0).unwrap()
}

fn observation(code: &str, h: u32, temperature: f64, wind_speed: f64) -> RawObservation {
    let (latitude, longitude) = match code {
        "A" => (51.52, -0.12),
        "B" => (60.36, 5.29),
        _ => (69.35, 88.19),
    };
    RawObservation::new(hour(h), code, temperature, wind_speed, latitude, longitude)
}

fn three_rows() -> Vec<RawObservation> {
    vec![
        observation("A", 12, 14.0, 10.0),
        observation("B", 12, 9.0, 25.0),
        observation("A", 13, 16.0, 30.0),
    ]
}

fn load(rows: &[RawObservation], temp_dir: &TempDir) -> std::path::PathBuf {
    let path = temp_dir.path().join("weather.db");
    let schema = StarTransformer::new().transform(rows).unwrap();
    SqliteWriter::new(&path).load(&schema).unwrap();
    path
}

#[test]
fn test_three_row_scenario() {
    let schema = StarTransformer::new().transform(&three_rows()).unwrap();

    let time_keys: Vec<_> = schema
        .time_dim
        .iter()
        .map(|t| (t.time_id, t.timestamp_hour))
        .collect();
    assert_eq!(time_keys, vec![(1, hour(12)), (2, hour(13))]);

    let location_keys: Vec<_> = schema
        .location_dim
        .iter()
        .map(|l| (l.location_id, l.location_code.as_str()))
        .collect();
    assert_eq!(location_keys, vec![(1, "A"), (2, "B")]);

    let fact_keys: Vec<_> = schema
        .facts
        .iter()
        .map(|f| (f.time_id, f.location_id))
        .collect();
    assert_eq!(fact_keys, vec![(1, 1), (1, 2), (2, 1)]);
}

#[test]
fn test_store_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let rows = three_rows();
    let schema = StarTransformer::new().transform(&rows).unwrap();
    let path = temp_dir.path().join("weather.db");

    let summary = SqliteWriter::new(&path).load(&schema).unwrap();
    assert_eq!(summary.fact_rows, 3);

    let analyzer = WeatherAnalyzer::open(&path).unwrap();
    let stored = StarSchema {
        time_dim: analyzer.read_time_dimension(None).unwrap(),
        location_dim: analyzer.read_location_dimension(None).unwrap(),
        facts: analyzer.read_facts(None).unwrap(),
    };
    assert_eq!(stored, schema);
}

#[test]
fn test_reload_replaces_store() {
    let temp_dir = TempDir::new().unwrap();
    let path = load(&three_rows(), &temp_dir);
    load(&[observation("C", 8, -20.0, 30.0)], &temp_dir);

    let analyzer = WeatherAnalyzer::open(&path).unwrap();
    let locations = analyzer.read_location_dimension(None).unwrap();
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].location_code, "C");
    assert_eq!(analyzer.read_facts(None).unwrap().len(), 1);
}

#[test]
fn test_failed_load_keeps_previous_store() {
    let temp_dir = TempDir::new().unwrap();
    let path = load(&three_rows(), &temp_dir);

    let mut broken = StarTransformer::new().transform(&three_rows()).unwrap();
    broken.facts[0].location_id = 99;
    let err = SqliteWriter::new(&path).load(&broken).unwrap_err();
    match &err {
        EtlError::LoadFailed { stage, .. } => assert_eq!(*stage, LoadStage::DimensionsWritten),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.category(), ErrorCategory::StoreAccess);

    let analyzer = WeatherAnalyzer::open(&path).unwrap();
    assert_eq!(analyzer.read_facts(None).unwrap().len(), 3);

    let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().contains("staging"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_unknown_location_is_integrity_error() {
    let temp_dir = TempDir::new().unwrap();
    let rows = three_rows();
    let time_dim = build_time_dimension(&rows.iter().map(|r| r.timestamp).collect::<Vec<_>>());
    let location_dim = vec![LocationDimRow {
        location_id: 1,
        location_code: "A".to_string(),
        latitude: 51.52,
        longitude: -0.12,
    }];

    let err = build_facts(&rows, &time_dim, &location_dim).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Integrity);
    match err {
        EtlError::UnresolvedFacts { rows } => {
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].location_code, "B");
            assert!(rows[0].missing_location);
            assert!(!rows[0].missing_time);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Nothing was handed to the writer
    assert!(!temp_dir.path().join("weather.db").exists());
}

#[test]
fn test_average_on_empty_store() {
    let temp_dir = TempDir::new().unwrap();
    let path = load(&[], &temp_dir);

    let analyzer = WeatherAnalyzer::open(&path).unwrap();
    let report = analyzer.average_temperature(168, Utc::now()).unwrap();
    assert!(report.rows.is_empty());
}

#[test]
fn test_average_rejects_long_lookback() {
    let temp_dir = TempDir::new().unwrap();
    let path = load(&three_rows(), &temp_dir);

    let analyzer = WeatherAnalyzer::open(&path).unwrap();
    let err = analyzer.average_temperature(200, Utc::now()).unwrap_err();
    assert!(matches!(err, EtlError::InputValidation(_)));
    assert_eq!(err.category(), ErrorCategory::InputValidation);
}

#[test]
fn test_average_respects_cutoff() {
    let temp_dir = TempDir::new().unwrap();
    let path = load(&three_rows(), &temp_dir);
    let analyzer = WeatherAnalyzer::open(&path).unwrap();

    // Cutoff at 12:00 excludes A's 13:00 reading
    let report = analyzer.average_temperature(1, hour(11)).unwrap();
    assert_eq!(report.cutoff, "2024-06-01 12:00:00");
    let summary: Vec<_> = report
        .rows
        .iter()
        .map(|r| (r.location_code.as_str(), r.avg_temperature, r.observation_count))
        .collect();
    assert_eq!(summary, vec![("A", Some(14.0), 1), ("B", Some(9.0), 1)]);

    let report = analyzer.average_temperature(24, hour(12)).unwrap();
    assert_eq!(report.rows[0].avg_temperature, Some(15.0));
    assert_eq!(report.rows[0].observation_count, 2);

    // A window that closes before any reading keeps every location
    let report = analyzer.average_temperature(0, hour(0)).unwrap();
    assert_eq!(report.rows.len(), 2);
    assert!(report.rows.iter().all(|r| r.avg_temperature.is_none()));
    assert!(report.rows.iter().all(|r| r.observation_count == 0));
}

#[test]
fn test_windiest_reports_peak_timestamp() {
    let temp_dir = TempDir::new().unwrap();
    let path = load(&three_rows(), &temp_dir);
    let analyzer = WeatherAnalyzer::open(&path).unwrap();

    let report = analyzer.windiest().unwrap();
    let peaks: Vec<_> = report
        .rows
        .iter()
        .map(|r| (r.location_code.as_str(), r.max_wind_speed, r.observed_timestamp))
        .collect();
    assert_eq!(peaks, vec![("A", 30.0, hour(13)), ("B", 25.0, hour(12))]);
}

#[test]
fn test_forecast_payload_to_store() {
    let payload = r#"{
        "latitude": 60.36,
        "longitude": 5.3,
        "hourly": {
            "time": [1717243200, 1717246800],
            "temperature_2m": [11.5, 12.25],
            "wind_speed_10m": [18.0, 20.5]
        }
    }"#;
    let response: ForecastResponse = serde_json::from_str(payload).unwrap();
    let rows = response.into_observations("Bergen").unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].timestamp, hour(12));

    let temp_dir = TempDir::new().unwrap();
    let path = load(&rows, &temp_dir);
    let analyzer = WeatherAnalyzer::open(&path).unwrap();

    let facts = analyzer.read_facts(None).unwrap();
    assert_eq!(facts[1].wind_chill, rows[1].wind_chill);
    assert!(analyzer.sample_tables(1).unwrap().contains("Bergen"));
}
