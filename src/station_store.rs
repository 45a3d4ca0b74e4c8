/// In-memory cache of the latest weather-station telemetry snapshot.
///
/// ## Snapshot model
///
/// - The whole collection is held as one `Arc<[StationRecord]>`.
/// - `replace_snapshot` swaps the pointer only when the incoming records
///   differ by value from the cached ones, so an unchanged sheet never
///   triggers a re-render of markers and buffers.
/// - Readers take `snapshot()` (an `Arc` clone) and can never observe a
///   half-replaced collection.
///
/// There is no persistence: a failed fetch leaves the last good snapshot in
/// place and a restart begins empty.

use crate::geo::{round_km, GeoPoint};
use crate::model::StationRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Result of offering a new snapshot to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotUpdate {
    /// The collection was replaced; downstream layers must be rebuilt.
    Updated,
    /// Value-identical to the cached snapshot; nothing changed.
    Unchanged,
}

/// The station nearest to a query point, annotated for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearestStation {
    pub station: StationRecord,
    /// Kilometers, rounded to two decimals.
    pub distance_km: f64,
}

pub struct StationStore {
    snapshot: Arc<[StationRecord]>,
    generation: u64,
    last_updated: Option<DateTime<Utc>>,
}

impl Default for StationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StationStore {
    pub fn new() -> Self {
        Self {
            snapshot: Arc::from(Vec::new()),
            generation: 0,
            last_updated: None,
        }
    }

    /// Offers a freshly ingested collection. Deep value equality against the
    /// cached snapshot gates the swap.
    pub fn replace_snapshot(&mut self, records: Vec<StationRecord>) -> SnapshotUpdate {
        if self.snapshot.as_ref() == records.as_slice() {
            return SnapshotUpdate::Unchanged;
        }

        self.snapshot = Arc::from(records);
        self.generation += 1;
        self.last_updated = Some(Utc::now());
        SnapshotUpdate::Updated
    }

    /// Cheap handle on the current collection.
    pub fn snapshot(&self) -> Arc<[StationRecord]> {
        Arc::clone(&self.snapshot)
    }

    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }

    /// Incremented once per accepted snapshot.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Records with usable coordinates, in snapshot order.
    pub fn located(&self) -> impl Iterator<Item = (&StationRecord, GeoPoint)> {
        self.snapshot
            .iter()
            .filter_map(|s| s.location.map(|loc| (s, loc)))
    }

    /// Linear scan for the located station closest to `point`.
    ///
    /// Ties keep the first station in snapshot order. Returns `None` when
    /// the snapshot is empty or no station has valid coordinates.
    pub fn nearest(&self, point: &GeoPoint) -> Option<NearestStation> {
        let mut best: Option<(&StationRecord, f64)> = None;

        for (station, loc) in self.located() {
            let dist = loc.distance_m(point);
            match best {
                Some((_, min)) if dist >= min => {}
                _ => best = Some((station, dist)),
            }
        }

        best.map(|(station, dist)| NearestStation {
            station: station.clone(),
            distance_km: round_km(dist),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn station(name: &str, lat: f64, lon: f64) -> StationRecord {
        StationRecord::new(name, GeoPoint::located(lat, lon))
    }

    #[test]
    fn test_empty_store_has_no_nearest() {
        let store = StationStore::new();
        assert!(store.nearest(&GeoPoint::new(14.0, 121.0)).is_none());
    }

    #[test]
    fn test_nearest_picks_minimum_distance() {
        let mut store = StationStore::new();
        store.replace_snapshot(vec![
            station("LIGTAS Baguio", 16.40, 120.60),
            station("ASTI Los Banos", 14.16, 121.24),
            station("SARAI Tanay", 14.50, 121.28),
        ]);

        let nearest = store.nearest(&GeoPoint::new(14.17, 121.25)).expect("should find a station");
        assert_eq!(nearest.station.name, "ASTI Los Banos");
        assert!(nearest.distance_km < 2.0);
    }

    #[test]
    fn test_nearest_tie_goes_to_first_record() {
        // Co-located stations (shared mast) are an exact tie.
        let p = GeoPoint::new(14.0, 121.0);
        let mast = p.offset_north(3000.0);

        let mut store = StationStore::new();
        store.replace_snapshot(vec![
            StationRecord::new("first", Some(mast)),
            StationRecord::new("second", Some(mast)),
        ]);

        assert_eq!(store.nearest(&p).map(|n| n.station.name), Some("first".to_string()));
    }

    #[test]
    fn test_unlocated_records_are_skipped() {
        let mut store = StationStore::new();
        store.replace_snapshot(vec![
            StationRecord::new("no coords", None),
            station("zero lat", 0.0, 121.0),
            station("real", 15.0, 120.0),
        ]);

        assert_eq!(store.located().count(), 1);
        let nearest = store.nearest(&GeoPoint::new(14.0, 121.0)).expect("one located station");
        assert_eq!(nearest.station.name, "real");
    }

    #[test]
    fn test_only_unlocated_records_yield_none() {
        let mut store = StationStore::new();
        store.replace_snapshot(vec![StationRecord::new("nowhere", None)]);
        assert!(store.nearest(&GeoPoint::new(14.0, 121.0)).is_none());
    }

    #[test]
    fn test_distance_is_rounded_to_two_decimals() {
        let p = GeoPoint::new(14.0, 121.0);
        let mut store = StationStore::new();
        store.replace_snapshot(vec![StationRecord::new("s", Some(p.offset_north(12_345.0)))]);

        let nearest = store.nearest(&p).expect("station present");
        assert_eq!(nearest.distance_km, 12.35);
    }

    #[test]
    fn test_identical_snapshot_updates_once() {
        let build = || vec![
            station("A", 14.0, 121.0).with_warning("1"),
            station("B", 15.0, 120.5).with_rainfall(42.5),
        ];

        let mut store = StationStore::new();
        let updates = [store.replace_snapshot(build()), store.replace_snapshot(build())];

        assert_eq!(updates.iter().filter(|u| **u == SnapshotUpdate::Updated).count(), 1);
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn test_changed_field_triggers_update() {
        let mut store = StationStore::new();
        store.replace_snapshot(vec![station("A", 14.0, 121.0).with_warning("1")]);
        let update = store.replace_snapshot(vec![station("A", 14.0, 121.0).with_warning("2")]);
        assert_eq!(update, SnapshotUpdate::Updated);
        assert_eq!(store.generation(), 2);
        assert!(store.last_updated().is_some());
    }

    #[test]
    fn test_reader_snapshot_survives_replacement() {
        let mut store = StationStore::new();
        store.replace_snapshot(vec![station("old", 14.0, 121.0)]);
        let held = store.snapshot();

        store.replace_snapshot(vec![station("new", 15.0, 121.0), station("new2", 16.0, 121.0)]);

        assert_eq!(held.len(), 1);
        assert_eq!(held[0].name, "old");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_empty_snapshot_on_empty_store_is_unchanged() {
        let mut store = StationStore::new();
        assert_eq!(store.replace_snapshot(Vec::new()), SnapshotUpdate::Unchanged);
        assert!(store.is_empty());
    }
}
