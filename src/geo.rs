/// Geographic primitives shared by every spatial query in the service.
///
/// GeoIndex (event radius counts) and StationStore (nearest station) must
/// agree on one distance metric, so both go through `haversine_m` here.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Builds a point from raw coordinates, rejecting anything that cannot
    /// be placed on the map: non-finite values, out-of-range values, and
    /// the `0` placeholder the telemetry sheet uses for unsurveyed stations.
    pub fn located(lat: f64, lon: f64) -> Option<Self> {
        if !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        if lat == 0.0 || lon == 0.0 {
            return None;
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return None;
        }
        Some(Self { lat, lon })
    }

    /// Great-circle distance to `other` in meters.
    pub fn distance_m(&self, other: &GeoPoint) -> f64 {
        haversine_m(self, other)
    }

    /// Point reached by moving `meters` due north (negative = south).
    /// Used by fixtures to place events at exact distances.
    pub fn offset_north(&self, meters: f64) -> GeoPoint {
        let d_lat = (meters / EARTH_RADIUS_M).to_degrees();
        GeoPoint::new(self.lat + d_lat, self.lon)
    }
}

/// Haversine distance in meters.
pub fn haversine_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Meters → kilometers rounded to two decimals, the precision shown in
/// station popups and combined reports.
pub fn round_km(meters: f64) -> f64 {
    (meters / 10.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_self_is_zero() {
        let p = GeoPoint::new(14.1648, 121.2413);
        assert_eq!(p.distance_m(&p), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let los_banos = GeoPoint::new(14.1648, 121.2413);
        let baguio = GeoPoint::new(16.4023, 120.5960);
        let ab = los_banos.distance_m(&baguio);
        let ba = baguio.distance_m(&los_banos);
        assert!((ab - ba).abs() < 1e-6);
    }

    #[test]
    fn test_known_distance_los_banos_to_baguio() {
        // Roughly 257 km as the crow flies.
        let los_banos = GeoPoint::new(14.1648, 121.2413);
        let baguio = GeoPoint::new(16.4023, 120.5960);
        let km = los_banos.distance_m(&baguio) / 1000.0;
        assert!(km > 250.0 && km < 265.0, "got {} km", km);
    }

    #[test]
    fn test_offset_north_matches_haversine() {
        let origin = GeoPoint::new(14.0, 121.0);
        for meters in [1000.0, 4999.0, 5001.0, 20_000.0] {
            let moved = origin.offset_north(meters);
            assert!((origin.distance_m(&moved) - meters).abs() < 0.01);
        }
    }

    #[test]
    fn test_located_rejects_placeholders() {
        assert!(GeoPoint::located(0.0, 121.0).is_none());
        assert!(GeoPoint::located(14.0, 0.0).is_none());
        assert!(GeoPoint::located(f64::NAN, 121.0).is_none());
        assert!(GeoPoint::located(14.0, f64::INFINITY).is_none());
        assert!(GeoPoint::located(95.0, 121.0).is_none());
        assert!(GeoPoint::located(14.0, 121.0).is_some());
    }

    #[test]
    fn test_round_km() {
        assert_eq!(round_km(12_345.0), 12.35);
        assert_eq!(round_km(999.0), 1.0);
        assert_eq!(round_km(0.0), 0.0);
    }
}
