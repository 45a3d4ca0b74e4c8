//! lsmon_service: landslide early-warning monitoring service.
//!
//! # Module structure
//!
//! ```text
//! lsmon_service
//! ├── model         — shared data types (StationRecord, HazardEvent, DashboardError, …)
//! ├── geo           — GeoPoint and haversine distance
//! ├── geo_index     — recorded landslides and the "nearby" radius count
//! ├── station_store — latest telemetry snapshot, nearest-station lookup
//! ├── config        — service configuration loader (dashboard.toml + env)
//! ├── ingest
//! │   ├── telemetry — primary station API: JSON parsing + normalization
//! │   ├── sheet     — published-sheet CSV export (fallback source)
//! │   ├── geojson   — hazard and susceptibility FeatureCollections
//! │   └── fixtures  — representative payloads for tests
//! ├── ingestor      — primary/fallback refresh, schedule, connectivity
//! ├── alert
//! │   └── warning   — warning-tier classification and buffer plans
//! ├── render        — render instructions for the external map widget
//! ├── report        — combined report fusion (JSON + HTML)
//! ├── notice        — user-visible error/warning notices
//! ├── forecast
//! │   ├── sequencer — forecast animation state machine
//! │   └── loader    — worker-pool group loader
//! ├── daemon        — main loop (refresh, probe, forecast, publish)
//! └── endpoint      — HTTP API for the browser front end
//! ```

pub mod alert;
pub mod config;
pub mod daemon;
pub mod endpoint;
pub mod forecast;
pub mod geo;
pub mod geo_index;
pub mod ingest;
pub mod ingestor;
pub mod model;
pub mod notice;
pub mod render;
pub mod report;
pub mod station_store;
