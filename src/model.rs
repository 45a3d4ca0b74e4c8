/// Core data types for the landslide early-warning service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O — only types, their invariants, and the error enum.

use crate::geo::GeoPoint;
use serde::Serialize;
use thiserror::Error;

/// Free-form feature properties, kept in source order.
pub type Properties = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Telemetry
// ---------------------------------------------------------------------------

/// One telemetry reading for one automated weather station.
///
/// Built fresh on every ingest cycle by `ingest::telemetry` or
/// `ingest::sheet`; the full collection is swapped into `StationStore`
/// as a unit and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationRecord {
    pub name: String,
    /// `None` when the sheet row has missing, non-finite or zero coordinates.
    pub location: Option<GeoPoint>,
    /// Rainfall accumulation in mm (24 h total when the source provides it).
    pub rainfall_mm: Option<f64>,
    /// Rainfall cell as published, total column first.
    pub rainfall_total: Option<String>,
    /// Warning indicator exactly as published; see `alert::warning::classify`.
    pub warning_raw: Option<String>,
    pub status: Option<String>,
    pub location_details: Option<String>,
    pub municipality: Option<String>,
    pub rainfall_description: Option<String>,
    pub scenario: Option<String>,
    pub recommended_action: Option<String>,
    pub guide_url: Option<String>,
    pub image_url: Option<String>,
    pub date_range: Option<String>,
}

impl StationRecord {
    /// A bare record with only a name and position; every other field empty.
    pub fn new(name: &str, location: Option<GeoPoint>) -> Self {
        Self {
            name: name.to_string(),
            location,
            rainfall_mm: None,
            rainfall_total: None,
            warning_raw: None,
            status: None,
            location_details: None,
            municipality: None,
            rainfall_description: None,
            scenario: None,
            recommended_action: None,
            guide_url: None,
            image_url: None,
            date_range: None,
        }
    }

    pub fn with_warning(mut self, raw: &str) -> Self {
        self.warning_raw = Some(raw.to_string());
        self
    }

    pub fn with_rainfall(mut self, mm: f64) -> Self {
        self.rainfall_mm = Some(mm);
        self
    }

    pub fn with_recommended_action(mut self, action: &str) -> Self {
        self.recommended_action = Some(action.to_string());
        self
    }
}

// ---------------------------------------------------------------------------
// Hazard geometry
// ---------------------------------------------------------------------------

/// A recorded landslide occurrence (point geometry only).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HazardEvent {
    pub location: GeoPoint,
    pub properties: Properties,
}

/// Susceptibility severity class, one per published hazard layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SusceptibilityClass {
    High,
    Medium,
    Low,
}

const SUSCEPTIBILITY_LOGO: &str =
    "https://raw.githubusercontent.com/Gabzrock/LIGTASAGADEWSV3/refs/heads/main/logo3.png";

impl SusceptibilityClass {
    pub const ALL: [SusceptibilityClass; 3] = [
        SusceptibilityClass::High,
        SusceptibilityClass::Medium,
        SusceptibilityClass::Low,
    ];

    /// Layer name used in legends, toggles and the report header.
    pub fn layer_name(&self) -> &'static str {
        match self {
            SusceptibilityClass::High => "MGB-HIGH",
            SusceptibilityClass::Medium => "MGB-MED",
            SusceptibilityClass::Low => "MGB-LOW",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            SusceptibilityClass::High => "red",
            SusceptibilityClass::Medium => "yellow",
            SusceptibilityClass::Low => "green",
        }
    }

    pub fn logo_url(&self) -> &'static str {
        SUSCEPTIBILITY_LOGO
    }

    pub fn from_layer_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.layer_name().eq_ignore_ascii_case(name))
    }
}

/// Minimal geometry model: points are kept as positions, everything else
/// is carried as raw GeoJSON for the renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(GeoPoint),
    Other(serde_json::Value),
}

impl Geometry {
    /// GeoJSON geometry object (`[lon, lat]` order for points).
    pub fn to_geojson(&self) -> serde_json::Value {
        match self {
            Geometry::Point(p) => serde_json::json!({
                "type": "Point",
                "coordinates": [p.lon, p.lat],
            }),
            Geometry::Other(v) => v.clone(),
        }
    }

    pub fn as_point(&self) -> Option<GeoPoint> {
        match self {
            Geometry::Point(p) => Some(*p),
            Geometry::Other(_) => None,
        }
    }
}

impl Serialize for Geometry {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_geojson().serialize(serializer)
    }
}

/// A polygon or point hazard-zone feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SusceptibilityFeature {
    pub class: SusceptibilityClass,
    pub geometry: Geometry,
    pub properties: Properties,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised at operation boundaries (per fetch, per record).
///
/// None of these is allowed to escape the daemon loop; each ends up as a
/// log line or a `Notice`.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Non-2xx HTTP response.
    #[error("HTTP error: {0}")]
    Http(u16),
    /// Transport-level failure (DNS, connect, timeout).
    #[error("network error: {0}")]
    Network(String),
    /// The response body could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),
    /// A required collaborator is not available; fatal to the feature it enables.
    #[error("missing dependency: {0}")]
    MissingDependency(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DashboardError {
    /// True for failures that suggest the host itself is offline.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, DashboardError::Network(_))
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            DashboardError::Http(status.as_u16())
        } else if err.is_decode() {
            DashboardError::Parse(err.to_string())
        } else {
            DashboardError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::Parse(err.to_string())
    }
}

impl From<csv::Error> for DashboardError {
    fn from(err: csv::Error) -> Self {
        DashboardError::Parse(err.to_string())
    }
}
