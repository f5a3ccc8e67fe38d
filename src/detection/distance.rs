//! Great-circle distance and elapsed time between two logins

use chrono::{DateTime, FixedOffset};

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Geographic coordinates in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        GeoPoint { latitude, longitude }
    }

    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        haversine_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

/// Calculate the great-circle distance between two points using the Haversine formula
/// Returns distance in kilometers
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let hav = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push hav slightly outside [0, 1] for near-antipodal points
    let hav = hav.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_KM * hav.sqrt().asin()
}

/// Absolute time between two instants, in fractional minutes
pub fn elapsed_minutes(t1: &DateTime<FixedOffset>, t2: &DateTime<FixedOffset>) -> f64 {
    let delta = t2.signed_duration_since(*t1);
    match delta.num_microseconds() {
        Some(micros) => micros.abs() as f64 / 60_000_000.0,
        // Only overflows for spans of roughly 290,000 years
        None => delta.num_milliseconds().abs() as f64 / 60_000.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const NYC: GeoPoint = GeoPoint { latitude: 40.7128, longitude: -74.0060 };
    const LA: GeoPoint = GeoPoint { latitude: 34.0522, longitude: -118.2437 };
    const TORONTO: GeoPoint = GeoPoint { latitude: 43.6532, longitude: -79.3832 };

    #[test]
    fn test_haversine_distance() {
        // New York to Los Angeles: ~3944 km
        let distance = NYC.distance_km(&LA);
        assert!((distance - 3944.0).abs() < 50.0, "NYC to LA should be ~3944 km, got {}", distance);
    }

    #[test]
    fn test_identical_points_are_exactly_zero() {
        let points = [
            NYC,
            LA,
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(90.0, 180.0),
            GeoPoint::new(-89.999, -179.5),
            GeoPoint::new(12.345678901, 98.765432109),
        ];
        for p in points {
            assert_eq!(p.distance_km(&p), 0.0, "distance of {:?} to itself", p);
        }
    }

    #[test]
    fn test_symmetric() {
        let pairs = [(NYC, LA), (NYC, TORONTO), (GeoPoint::new(-33.8688, 151.2093), GeoPoint::new(51.5074, -0.1278))];
        for (a, b) in pairs {
            assert_eq!(a.distance_km(&b), b.distance_km(&a));
        }
    }

    #[test]
    fn test_antipodal_points_do_not_produce_nan() {
        let distance = haversine_km(0.0, 0.0, 0.0, 180.0);
        assert!(distance.is_finite());
        assert!((distance - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_elapsed_minutes_is_fractional_and_absolute() {
        let t1 = DateTime::parse_from_rfc3339("2025-12-10T10:00:00Z").unwrap();
        let t2 = t1 + Duration::seconds(90);
        assert_eq!(elapsed_minutes(&t1, &t2), 1.5);
        assert_eq!(elapsed_minutes(&t2, &t1), 1.5);
        assert_eq!(elapsed_minutes(&t1, &t1), 0.0);
    }

    #[test]
    fn test_elapsed_minutes_across_offsets() {
        let utc = DateTime::parse_from_rfc3339("2025-12-10T10:00:00Z").unwrap();
        let paris = DateTime::parse_from_rfc3339("2025-12-10T11:05:00+01:00").unwrap();
        assert_eq!(elapsed_minutes(&utc, &paris), 5.0);
    }

    #[test]
    fn test_elapsed_minutes_keeps_sub_millisecond_precision() {
        let t1 = DateTime::parse_from_rfc3339("2025-12-10T10:00:00.000000Z").unwrap();
        let t2 = DateTime::parse_from_rfc3339("2025-12-10T10:00:00.000600Z").unwrap();
        let minutes = elapsed_minutes(&t1, &t2);
        assert!(minutes > 0.0);
        assert!((minutes - 0.0006 / 60.0).abs() < 1e-12);
    }
}
