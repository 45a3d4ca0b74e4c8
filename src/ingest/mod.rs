/// Clients and parsers for every upstream data source.
///
/// - `telemetry` — primary station telemetry API (JSON array)
/// - `sheet`     — published spreadsheet CSV export, the telemetry fallback
/// - `geojson`   — hazard and susceptibility FeatureCollections
/// - `fixtures`  — representative payloads for tests

pub mod fixtures;
pub mod geojson;
pub mod sheet;
pub mod telemetry;
