pub mod constants;
pub mod progress;
pub mod timestamp;
pub mod wind_chill;

pub use constants::*;
pub use progress::ProgressReporter;
pub use timestamp::{format_timestamp, parse_timestamp, truncate_to_hour};
pub use wind_chill::wind_chill;
