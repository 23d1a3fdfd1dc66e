pub mod weather_analyzer;

pub use weather_analyzer::{
    validate_lookback, AverageReport, LocationAverage, PeakWind, WeatherAnalyzer, WindReport,
};
