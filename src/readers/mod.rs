pub mod forecast_reader;
pub mod response_cache;

pub use forecast_reader::{FetchOutcome, ForecastReader, ForecastResponse, HourlySeries};
pub use response_cache::ResponseCache;
