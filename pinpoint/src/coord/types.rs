//! Coordinate value type and validation errors.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum valid latitude in degrees.
pub const MIN_LAT: f64 = -90.0;

/// Maximum valid latitude in degrees.
pub const MAX_LAT: f64 = 90.0;

/// Minimum valid longitude in degrees.
pub const MIN_LON: f64 = -180.0;

/// Maximum valid longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// Errors produced when validating raw latitude/longitude values.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum CoordError {
    #[error("Invalid latitude: {0} (must be within -90..=90)")]
    InvalidLatitude(f64),

    #[error("Invalid longitude: {0} (must be within -180..=180)")]
    InvalidLongitude(f64),
}

/// A WGS84 position in decimal degrees.
///
/// Immutable once constructed. Construction goes through [`Coordinate::new`],
/// which rejects non-finite and out-of-range values, so every `Coordinate`
/// in the system is known to be valid. Deserialization applies the same
/// validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

/// Unvalidated wire shape used only as a deserialization stage.
#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoordError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    /// Create a coordinate, validating both axes.
    ///
    /// NaN and infinities fail the range check and are rejected as well.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordError> {
        if !(MIN_LAT..=MAX_LAT).contains(&latitude) {
            return Err(CoordError::InvalidLatitude(latitude));
        }
        if !(MIN_LON..=MAX_LON).contains(&longitude) {
            return Err(CoordError::InvalidLongitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Build a coordinate from constants known to be in range.
    pub(crate) const fn new_unchecked(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Latitude in degrees.
    #[inline]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    #[inline]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_are_inclusive() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
    }

    #[test]
    fn test_nan_is_rejected() {
        assert!(matches!(
            Coordinate::new(f64::NAN, 0.0),
            Err(CoordError::InvalidLatitude(_))
        ));
        assert!(matches!(
            Coordinate::new(0.0, f64::INFINITY),
            Err(CoordError::InvalidLongitude(_))
        ));
    }

    #[test]
    fn test_deserialize_validates_range() {
        let ok: Coordinate = serde_json::from_str(r#"{"latitude":19.3,"longitude":73.0}"#).unwrap();
        assert_eq!(ok, Coordinate::new(19.3, 73.0).unwrap());

        let err = serde_json::from_str::<Coordinate>(r#"{"latitude":91.0,"longitude":73.0}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_display_uses_six_decimals() {
        let coord = Coordinate::new(19.31, 73.02).unwrap();
        assert_eq!(coord.to_string(), "19.310000, 73.020000");
    }
}
