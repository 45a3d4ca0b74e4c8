/// Recorded landslide events and the radius query behind the
/// "Historical Context" section of a combined report.
///
/// Loaded once at startup from the event GeoJSON layer and never modified
/// afterwards; the daemon shares it behind an `Arc`.

use crate::geo::GeoPoint;
use crate::model::HazardEvent;

/// Radius used for "nearby landslides" when the caller has no preference.
pub const DEFAULT_EVENT_RADIUS_M: f64 = 5000.0;

#[derive(Debug, Default, Clone)]
pub struct GeoIndex {
    events: Vec<HazardEvent>,
}

impl GeoIndex {
    pub fn new(events: Vec<HazardEvent>) -> Self {
        Self { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[HazardEvent] {
        &self.events
    }

    /// Number of events whose distance to `point` is at most `radius_m`.
    pub fn count_within_radius(&self, point: &GeoPoint, radius_m: f64) -> usize {
        self.events
            .iter()
            .filter(|e| e.location.distance_m(point) <= radius_m)
            .count()
    }

    /// `count_within_radius` with the 5 km report radius.
    pub fn count_nearby(&self, point: &GeoPoint) -> usize {
        self.count_within_radius(point, DEFAULT_EVENT_RADIUS_M)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
