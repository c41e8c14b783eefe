// src/geo.rs
//! Great-circle distance and cache-bucket quantization helpers.

use crate::types::Location;

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Coordinates closer than this are considered the same point.
pub const COORD_EPSILON: f64 = 1e-9;

/// Haversine great-circle distance between two locations, in kilometers.
/// Non-negative and symmetric; zero iff the coordinates coincide within
/// [`COORD_EPSILON`].
pub fn distance_km(a: &Location, b: &Location) -> f64 {
    if same_point(a, b) {
        return 0.0;
    }

    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// True when both coordinate pairs coincide within [`COORD_EPSILON`].
pub fn same_point(a: &Location, b: &Location) -> bool {
    (a.latitude - b.latitude).abs() < COORD_EPSILON
        && (a.longitude - b.longitude).abs() < COORD_EPSILON
}

/// True when `candidate` lies within `radius_km` of `origin`.
pub fn within_radius(origin: &Location, candidate: &Location, radius_km: f64) -> bool {
    distance_km(origin, candidate) <= radius_km
}

/// Quantize a location to a grid cell id usable as a cache-key component.
///
/// `precision_km` is the approximate cell edge length. Two locations within
/// `precision_km / 2` of each other usually share a bucket; points straddling
/// a cell boundary may not. That imprecision is acceptable: a boundary miss
/// only costs one extra upstream fetch, never a wrong answer.
pub fn bucket_key(loc: &Location, precision_km: f64) -> String {
    // ~111 km per degree of latitude; good enough for cache cell sizing.
    let cell_deg = (precision_km / 111.0).max(1e-6);
    let lat_cell = (loc.latitude / cell_deg).floor() as i64;
    let lon_cell = (loc.longitude / cell_deg).floor() as i64;
    format!("{lat_cell}:{lon_cell}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(lat: f64, lon: f64) -> Location {
        Location::new(lat, lon)
    }

    #[test]
    fn zero_distance_for_same_coordinates() {
        let a = loc(40.7128, -74.0060);
        assert_eq!(distance_km(&a, &a), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = loc(40.7128, -74.0060); // NYC
        let b = loc(34.0522, -118.2437); // LA
        let ab = distance_km(&a, &b);
        let ba = distance_km(&b, &a);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn known_distance_nyc_to_la() {
        let a = loc(40.7128, -74.0060);
        let b = loc(34.0522, -118.2437);
        let d = distance_km(&a, &b);
        // Great-circle NYC→LA is roughly 3936 km.
        assert!((d - 3936.0).abs() < 20.0, "got {d}");
    }

    #[test]
    fn short_distances_are_plausible() {
        // ~1 degree of latitude apart → ~111 km
        let a = loc(40.0, -74.0);
        let b = loc(41.0, -74.0);
        let d = distance_km(&a, &b);
        assert!((d - 111.0).abs() < 1.0, "got {d}");
    }

    #[test]
    fn nearby_points_share_a_bucket() {
        let a = loc(40.7128, -74.0060);
        let b = loc(40.7130, -74.0062);
        assert_eq!(bucket_key(&a, 5.0), bucket_key(&b, 5.0));
    }

    #[test]
    fn distant_points_get_distinct_buckets() {
        let a = loc(40.7128, -74.0060);
        let b = loc(34.0522, -118.2437);
        assert_ne!(bucket_key(&a, 5.0), bucket_key(&b, 5.0));
    }

    #[test]
    fn radius_containment() {
        let origin = loc(40.7128, -74.0060);
        let near = loc(40.7200, -74.0000);
        let far = loc(42.0, -74.0);
        assert!(within_radius(&origin, &near, 5.0));
        assert!(!within_radius(&origin, &far, 5.0));
    }
}
