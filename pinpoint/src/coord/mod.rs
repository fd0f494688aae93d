//! Geographic coordinate module
//!
//! Provides the validated [`Coordinate`] value type exchanged between the
//! platform location service, the renderer bridge and the picker.

mod types;

pub use types::{Coordinate, CoordError, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

/// Default comparison tolerance in degrees (~1cm at the equator).
pub const DEFAULT_TOLERANCE_DEG: f64 = 1e-7;

/// Returns `true` if both coordinates are within `tolerance` degrees on each axis.
#[inline]
pub fn approx_eq(a: &Coordinate, b: &Coordinate, tolerance: f64) -> bool {
    (a.latitude() - b.latitude()).abs() <= tolerance
        && (a.longitude() - b.longitude()).abs() <= tolerance
}
