//! Structural coordinate checks.
//!
//! This is the hard gate that runs before any distance math. It knows nothing
//! about service regions; see [`crate::regions`] for the softer check.

use crate::error::CoordinateError;
use crate::models::{LocationSample, ValidationResult};

pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;
pub const MIN_LNG: f64 = -180.0;
pub const MAX_LNG: f64 = 180.0;

/// Checks a coordinate pair, reporting the first structural problem found.
pub fn check_coordinate(lat: f64, lng: f64) -> Result<(), CoordinateError> {
    if !lat.is_finite() || !lng.is_finite() {
        return Err(CoordinateError::NotFinite);
    }
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordinateError::LatitudeOutOfRange(lat));
    }
    if !(MIN_LNG..=MAX_LNG).contains(&lng) {
        return Err(CoordinateError::LongitudeOutOfRange(lng));
    }
    if lat == 0.0 && lng == 0.0 {
        return Err(CoordinateError::NullIsland);
    }
    Ok(())
}

pub fn is_valid_coordinate(lat: f64, lng: f64) -> bool {
    check_coordinate(lat, lng).is_ok()
}

/// Validates a whole sample: coordinates plus a sane accuracy value.
pub fn validate_sample(sample: &LocationSample) -> ValidationResult {
    let mut result = ValidationResult::valid();

    if let Err(e) = check_coordinate(sample.latitude, sample.longitude) {
        result.push_error(e.to_string());
    }
    if !sample.accuracy.is_finite() || sample.accuracy < 0.0 {
        result.push_error(format!("accuracy {} is not a valid radius", sample.accuracy));
    }

    result
}

/// Display form used whenever a raw position stands in for an address.
pub fn format_coordinates(lat: f64, lng: f64) -> String {
    format!("{:.6}, {:.6}", lat, lng)
}
