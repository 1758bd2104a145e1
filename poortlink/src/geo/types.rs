//! Geographic value types and their validation errors.

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

/// Errors raised when a coordinate is malformed.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeoError {
    /// Latitude is NaN or outside [-90, 90].
    #[error("Invalid latitude: {0} (must be between -90 and 90)")]
    InvalidLatitude(f64),

    /// Longitude is NaN or outside [-180, 180].
    #[error("Invalid longitude: {0} (must be between -180 and 180)")]
    InvalidLongitude(f64),

    /// Radius is not a positive finite number of meters.
    #[error("Invalid radius: {0} meters (must be positive)")]
    InvalidRadius(f64),
}

/// A validated WGS84 coordinate in degrees.
///
/// Only [`GeoPoint::new`] and the serde implementation build points, and
/// both validate, so a `GeoPoint` is never NaN or out of range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPoint")]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    /// Create a point, rejecting NaN and out-of-range values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        // NaN fails `contains`, so it lands in the same error arm
        if !(MIN_LAT..=MAX_LAT).contains(&latitude) {
            return Err(GeoError::InvalidLatitude(latitude));
        }
        if !(MIN_LON..=MAX_LON).contains(&longitude) {
            return Err(GeoError::InvalidLongitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in degrees, positive north.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees, positive east.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Returns the point as a `(lat, lon)` tuple.
    pub fn to_lat_lon(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    /// Returns the point `distance_m` meters due north (negative = south).
    ///
    /// Uses the spherical model, so it is exact with respect to
    /// [`distance_meters`](super::distance_meters) along a meridian.
    /// Latitude is clamped at the poles.
    pub fn offset_north(&self, distance_m: f64) -> Self {
        let delta_deg = (distance_m / super::EARTH_RADIUS_METERS).to_degrees();
        Self {
            latitude: (self.latitude + delta_deg).clamp(MIN_LAT, MAX_LAT),
            longitude: self.longitude,
        }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

impl TryFrom<(f64, f64)> for GeoPoint {
    type Error = GeoError;

    fn try_from((latitude, longitude): (f64, f64)) -> Result<Self, Self::Error> {
        Self::new(latitude, longitude)
    }
}

#[derive(Deserialize)]
struct RawPoint {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawPoint> for GeoPoint {
    type Error = GeoError;

    fn try_from(raw: RawPoint) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}
