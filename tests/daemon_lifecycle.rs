/// Integration tests for daemon lifecycle behavior
///
/// These tests drive the daemon loop one step at a time with in-memory
/// telemetry sources (no network). Telemetry runs on the daemon's worker
/// thread, so each step that queues a job is followed by
/// `settle_telemetry`:
/// 1. Immediate refresh on startup, with CSV fallback
/// 2. Combined reports built from the published state
/// 3. Offline detection, connectivity probe and the recovery refresh
/// 4. Unchanged telemetry does not bump the snapshot generation
///
/// Run with: cargo test --test daemon_lifecycle

mod common;

use chrono::Utc;
use common::*;
use lsmon_service::config::DashboardConfig;
use lsmon_service::daemon::{build_client, read_state, Daemon, HazardLayers};
use lsmon_service::geo::GeoPoint;
use lsmon_service::geo_index::GeoIndex;
use lsmon_service::ingest::geojson::{hazard_events, parse_feature_collection, susceptibility_features};
use lsmon_service::ingest::sheet::parse_sheet_csv;
use lsmon_service::ingest::telemetry::parse_station_array;
use lsmon_service::ingestor::{TelemetryIngestor, TelemetrySource};
use lsmon_service::model::{DashboardError, StationRecord, SusceptibilityClass};
use lsmon_service::notice::{MSG_OFFLINE, MSG_RESTORED};
use lsmon_service::report::WeatherStatus;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// JSON fixture source that can be switched off to simulate an outage.
struct JsonFixture {
    up: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl TelemetrySource for JsonFixture {
    fn name(&self) -> &str {
        "json-fixture"
    }

    fn fetch(&self) -> Result<Vec<StationRecord>, DashboardError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.up.load(Ordering::SeqCst) {
            parse_station_array(station_array_json())
        } else {
            Err(DashboardError::Network("connection refused".into()))
        }
    }
}

struct CsvFixture {
    up: Arc<AtomicBool>,
}

impl TelemetrySource for CsvFixture {
    fn name(&self) -> &str {
        "csv-fixture"
    }

    fn fetch(&self) -> Result<Vec<StationRecord>, DashboardError> {
        if self.up.load(Ordering::SeqCst) {
            parse_sheet_csv(station_sheet_csv())
        } else {
            Err(DashboardError::Network("connection refused".into()))
        }
    }
}

fn fixture_hazards() -> HazardLayers {
    let mut hazards = HazardLayers {
        events: GeoIndex::new(hazard_events(
            parse_feature_collection(landslide_events_geojson()).expect("events parse"),
        )),
        ..HazardLayers::default()
    };
    hazards.zones.insert(
        SusceptibilityClass::High,
        susceptibility_features(
            SusceptibilityClass::High,
            parse_feature_collection(high_susceptibility_geojson()).expect("zones parse"),
        ),
    );
    hazards
}

struct Harness {
    daemon: Daemon,
    primary_up: Arc<AtomicBool>,
    fallback_up: Arc<AtomicBool>,
    primary_calls: Arc<AtomicUsize>,
}

fn harness(primary_up: bool, fallback_up: bool) -> Harness {
    let primary_flag = Arc::new(AtomicBool::new(primary_up));
    let fallback_flag = Arc::new(AtomicBool::new(fallback_up));
    let primary_calls = Arc::new(AtomicUsize::new(0));

    let ingestor = TelemetryIngestor::new(
        Some(Box::new(JsonFixture {
            up: Arc::clone(&primary_flag),
            calls: Arc::clone(&primary_calls),
        })),
        Some(Box::new(CsvFixture { up: Arc::clone(&fallback_flag) })),
    );

    let client = build_client(2).expect("client builds");
    let mut daemon = Daemon::with_ingestor(DashboardConfig::default(), client, ingestor);
    daemon.set_hazards(fixture_hazards());

    Harness {
        daemon,
        primary_up: primary_flag,
        fallback_up: fallback_flag,
        primary_calls,
    }
}

fn active_messages(daemon: &Daemon) -> Vec<String> {
    let state = daemon.state();
    let state = read_state(&state);
    state.notices.active(Utc::now()).into_iter().map(|n| n.message).collect()
}

// ---------------------------------------------------------------------------
// 1. Startup refresh
// ---------------------------------------------------------------------------

#[test]
fn test_startup_refresh_uses_primary() {
    let mut h = harness(true, true);
    h.daemon.step(Instant::now());
    h.daemon.settle_telemetry();

    let state = h.daemon.state();
    let state = read_state(&state);
    assert_eq!(state.stations.len(), 4);
    assert_eq!(state.stations.generation(), 1);
    assert!(state.stations.last_updated().is_some());
    assert_eq!(h.primary_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_startup_refresh_falls_back_to_csv() {
    let mut h = harness(false, true);
    h.daemon.step(Instant::now());
    h.daemon.settle_telemetry();

    let state = h.daemon.state();
    let state = read_state(&state);
    assert_eq!(state.stations.len(), 4);
    assert!(state.online, "fallback success keeps the service online");
}

#[test]
fn test_refresh_waits_for_interval() {
    let mut h = harness(true, true);
    let t0 = Instant::now();
    h.daemon.step(t0);
    h.daemon.settle_telemetry();
    h.daemon.step(t0 + Duration::from_secs(30));
    h.daemon.settle_telemetry();
    assert_eq!(h.primary_calls.load(Ordering::SeqCst), 1);

    h.daemon.step(t0 + Duration::from_secs(60));
    h.daemon.settle_telemetry();
    assert_eq!(h.primary_calls.load(Ordering::SeqCst), 2);

    // Same data both times: no new generation.
    let state = h.daemon.state();
    assert_eq!(read_state(&state).stations.generation(), 1);
}

// ---------------------------------------------------------------------------
// 2. Reports
// ---------------------------------------------------------------------------

#[test]
fn test_report_fuses_zone_station_and_history() {
    let mut h = harness(true, true);
    h.daemon.step(Instant::now());
    h.daemon.settle_telemetry();

    let state = h.daemon.state();
    let state = read_state(&state);
    let report = state
        .combined_report("MGB-HIGH", 0, &GeoPoint::new(14.165, 121.24))
        .expect("report");

    let WeatherStatus::Station(summary) = report.weather() else {
        panic!("expected a nearest station");
    };
    assert_eq!(summary.station_name, "LIGTAS AWS Los Banos");
    assert_eq!(summary.badge_color, "orange");

    let html = report.to_html().into_string();
    assert!(html.contains("Combined Report"));
    assert!(html.contains("Nearby Landslides (5km)"));
}

// ---------------------------------------------------------------------------
// 3. Connectivity
// ---------------------------------------------------------------------------

#[test]
fn test_outage_probe_and_recovery_refresh() {
    let mut h = harness(false, false);
    let t0 = Instant::now();

    h.daemon.step(t0);
    h.daemon.settle_telemetry();
    assert!(active_messages(&h.daemon).contains(&MSG_OFFLINE.to_string()));
    {
        let state = h.daemon.state();
        let state = read_state(&state);
        assert!(!state.online);
        assert!(state.stations.is_empty());
    }

    // Network comes back.
    h.primary_up.store(true, Ordering::SeqCst);
    h.fallback_up.store(true, Ordering::SeqCst);

    let t1 = t0 + Duration::from_secs(1);
    h.daemon.step(t1);
    h.daemon.settle_telemetry();
    let messages = active_messages(&h.daemon);
    assert!(messages.contains(&MSG_RESTORED.to_string()));
    assert!(!messages.contains(&MSG_OFFLINE.to_string()));
    {
        let state = h.daemon.state();
        assert!(read_state(&state).stations.is_empty(), "refresh waits for the 2 s delay");
    }

    h.daemon.step(t1 + Duration::from_secs(2));
    h.daemon.settle_telemetry();
    let state = h.daemon.state();
    let state = read_state(&state);
    assert!(state.online);
    assert_eq!(state.stations.len(), 4);
}

#[test]
fn test_failed_refresh_keeps_last_snapshot() {
    let mut h = harness(true, true);
    let t0 = Instant::now();
    h.daemon.step(t0);
    h.daemon.settle_telemetry();

    h.primary_up.store(false, Ordering::SeqCst);
    h.fallback_up.store(false, Ordering::SeqCst);
    h.daemon.step(t0 + Duration::from_secs(60));
    h.daemon.settle_telemetry();

    let state = h.daemon.state();
    let state = read_state(&state);
    assert_eq!(state.stations.len(), 4);
    assert_eq!(state.stations.generation(), 1);
    let messages: Vec<String> =
        state.notices.active(Utc::now()).into_iter().map(|n| n.message).collect();
    assert!(messages.contains(&"Data connection lost. Retrying...".to_string()));
}
