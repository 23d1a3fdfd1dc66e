use serde::{Deserialize, Serialize};
use validator::Validate;

/// A configured fetch target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Location {
    #[validate(length(min = 1))]
    pub code: String,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

impl Location {
    pub fn new(code: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            code: code.into(),
            latitude,
            longitude,
        }
    }

    /// The three cities the pipeline ships with
    pub fn defaults() -> Vec<Location> {
        vec![
            Location::new("London", 51.52, -0.12),
            Location::new("Bergen", 60.363, 5.294),
            Location::new("Norilsk", 69.350, 88.188),
        ]
    }
}
