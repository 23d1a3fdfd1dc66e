use crate::utils::constants::{
    WIND_CHILL_BASE, WIND_CHILL_EXPONENT, WIND_CHILL_MIXED_FACTOR, WIND_CHILL_TEMP_FACTOR,
    WIND_CHILL_WIND_FACTOR,
};

/// Wind chill index for a temperature in °C and a wind speed in km/h.
///
/// Applied to every observation regardless of the temperature or wind range
/// the index is normally quoted for.
///
/// # Examples
/// ```
/// use weather_star_etl::utils::wind_chill;
///
/// let chill = wind_chill(-10.0, 20.0);
/// assert!((chill - -17.86).abs() < 0.01);
/// ```
pub fn wind_chill(temperature: f64, wind_speed: f64) -> f64 {
    let wind_term = wind_speed.powf(WIND_CHILL_EXPONENT);
    WIND_CHILL_BASE + WIND_CHILL_TEMP_FACTOR * temperature - WIND_CHILL_WIND_FACTOR * wind_term
        + WIND_CHILL_MIXED_FACTOR * temperature * wind_term
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wind_chill_reference_values() {
        // Environment Canada table: -10°C at 20 km/h ≈ -17.86
        assert!((wind_chill(-10.0, 20.0) - -17.86).abs() < 0.01);
        // -20°C at 30 km/h ≈ -32.6
        assert!((wind_chill(-20.0, 30.0) - -32.57).abs() < 0.01);
    }

    #[test]
    fn test_wind_chill_calm_air() {
        // v^0.16 is zero for calm air, leaving only the linear term
        let chill = wind_chill(5.0, 0.0);
        assert!((chill - (13.12 + 0.6215 * 5.0)).abs() < 1e-9);
    }

    #[test]
    fn test_wind_chill_unclamped_in_warm_air() {
        // No guard above the usual validity range
        let chill = wind_chill(25.0, 10.0);
        assert!(chill.is_finite());
        assert!(chill > 20.0);
    }
}
