//! Geospatial utilities for geofencing.
//!
//! Great-circle distance on a spherical Earth and the inclusive
//! point-in-circle test used to decide whether a driver is physically
//! inside a loading zone.

mod types;

pub use types::{GeoError, GeoPoint, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

/// Mean Earth radius used by the spherical approximation, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance between two points using the Haversine formula.
///
/// Symmetric, and zero for identical points. Accuracy is within a fraction
/// of a percent of the ellipsoidal distance at the scales a loading zone
/// cares about.
#[inline]
pub fn distance_meters(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.latitude().to_radians();
    let lat2 = b.latitude().to_radians();
    let delta_lat = (b.latitude() - a.latitude()).to_radians();
    let delta_lon = (b.longitude() - a.longitude()).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);

    // Rounding can push h a hair above 1.0 for antipodal points
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_RADIUS_METERS * c
}

/// Check whether `point` lies inside the circle (boundary inclusive).
#[inline]
pub fn is_within_radius(center: &GeoPoint, radius_meters: f64, point: &GeoPoint) -> bool {
    distance_meters(center, point) <= radius_meters
}

/// Meters a point still has to cover to reach the boundary of a circle.
///
/// Zero when already inside.
#[inline]
pub fn meters_to_go(distance_meters: f64, radius_meters: f64) -> f64 {
    (distance_meters - radius_meters).max(0.0)
}

/// Validate a geofence radius.
pub fn validate_radius(radius_meters: f64) -> Result<f64, GeoError> {
    if radius_meters.is_finite() && radius_meters > 0.0 {
        Ok(radius_meters)
    } else {
        Err(GeoError::InvalidRadius(radius_meters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let p = point(-25.7, 28.3);
        assert_eq!(distance_meters(&p, &p), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = point(-26.2041, 28.0473); // Johannesburg
        let b = point(-25.7479, 28.2293); // Pretoria
        let ab = distance_meters(&a, &b);
        let ba = distance_meters(&b, &a);
        assert!((ab - ba).abs() < 1e-6);
    }

    #[test]
    fn test_one_kilometer_north() {
        // 1000m along a meridian is 1000 / R radians of latitude
        let a = point(-25.7, 28.3);
        let b = a.offset_north(1000.0);
        let d = distance_meters(&a, &b);
        assert!((d - 1000.0).abs() < 10.0, "Expected ~1000m, got {}m", d);
    }

    #[test]
    fn test_one_degree_longitude_at_equator() {
        // ~111.195 km on the sphere
        let d = distance_meters(&point(0.0, 0.0), &point(0.0, 1.0));
        assert!((d - 111_195.0).abs() < 1_111.0, "Got {}m", d);
    }

    #[test]
    fn test_johannesburg_pretoria() {
        // Survey distance between city centers is roughly 53-55 km
        let d = distance_meters(&point(-26.2041, 28.0473), &point(-25.7479, 28.2293));
        assert!(d > 50_000.0 && d < 58_000.0, "Got {}m", d);
    }

    #[test]
    fn test_antipodal_points_do_not_nan() {
        let d = distance_meters(&point(0.0, 0.0), &point(0.0, 180.0));
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_METERS).abs() < 1.0);
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let center = point(-25.7, 28.3);
        let edge = center.offset_north(100.0);
        let radius = distance_meters(&center, &edge);

        assert!(is_within_radius(&center, radius, &edge));
        assert!(!is_within_radius(&center, radius - 0.01, &edge));
    }

    #[test]
    fn test_point_beyond_radius_is_outside() {
        let center = point(-25.7, 28.3);
        let outside = center.offset_north(100.5);
        assert!(!is_within_radius(&center, 100.0, &outside));
    }

    #[test]
    fn test_invalid_coordinates_rejected() {
        assert!(matches!(
            GeoPoint::new(90.5, 0.0),
            Err(GeoError::InvalidLatitude(_))
        ));
        assert!(matches!(
            GeoPoint::new(0.0, -180.01),
            Err(GeoError::InvalidLongitude(_))
        ));
        assert!(matches!(
            GeoPoint::new(f64::NAN, 0.0),
            Err(GeoError::InvalidLatitude(_))
        ));
        assert!(matches!(
            GeoPoint::new(0.0, f64::NAN),
            Err(GeoError::InvalidLongitude(_))
        ));
    }

    #[test]
    fn test_range_edges_accepted() {
        assert!(GeoPoint::new(90.0, 180.0).is_ok());
        assert!(GeoPoint::new(-90.0, -180.0).is_ok());
    }

    #[test]
    fn test_meters_to_go() {
        assert_eq!(meters_to_go(600.0, 100.0), 500.0);
        assert_eq!(meters_to_go(40.0, 100.0), 0.0);
    }

    #[test]
    fn test_validate_radius() {
        assert_eq!(validate_radius(50.0), Ok(50.0));
        assert!(validate_radius(0.0).is_err());
        assert!(validate_radius(-5.0).is_err());
        assert!(validate_radius(f64::INFINITY).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: GeoPoint = serde_json::from_str(r#"{"latitude": -25.7, "longitude": 28.3}"#).unwrap();
        assert_eq!(ok, point(-25.7, 28.3));

        let bad = serde_json::from_str::<GeoPoint>(r#"{"latitude": 91.0, "longitude": 28.3}"#);
        assert!(bad.is_err());
    }
}
