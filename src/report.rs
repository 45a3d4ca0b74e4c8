/// Combined report fusion.
///
/// Clicking a susceptibility zone produces one report that brings together
/// three independent sources:
///
/// 1. **Susceptibility**: the clicked feature's properties, verbatim
/// 2. **Weather Status**: the nearest weather station's warning state, or
///    an explicit "no data" placeholder when no station can be located
/// 3. **Historical Context**: recorded landslides within 5 km
///
/// Section order and the placeholder are part of the report contract; the
/// front end and the PDF export both rely on them.

use crate::alert::warning::{classify, WarningTier};
use crate::model::Properties;
use crate::station_store::NearestStation;
use maud::{html, Markup};
use serde::Serialize;
use serde_json::Value;

/// Placeholder row shown when no station data is available.
pub const NO_STATION_DATA: &str = "No AWS Data Available";

/// Label of the historical-context row.
pub const NEARBY_EVENTS_LABEL: &str = "Nearby Landslides (5km)";

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// A property value prepared for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Text(String),
    /// Strings that look like URLs render as "View Link".
    Link(String),
}

impl PropertyValue {
    /// Strings are shown as-is (URLs become links), nested objects and
    /// arrays are JSON-encoded, and scalars use their JSON spelling.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) if s.starts_with("http") || s.starts_with("www") => {
                PropertyValue::Link(s.clone())
            }
            Value::String(s) => PropertyValue::Text(s.clone()),
            other => PropertyValue::Text(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyRow {
    pub key: String,
    pub value: PropertyValue,
}

/// Properties of the clicked feature in source order.
pub fn property_rows(properties: &Properties) -> Vec<PropertyRow> {
    properties
        .iter()
        .map(|(key, value)| PropertyRow {
            key: key.clone(),
            value: PropertyValue::from_json(value),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationSummary {
    pub station_name: String,
    pub distance_km: f64,
    pub tier: WarningTier,
    /// Raw level as published, shown next to the tier badge.
    pub level: String,
    pub badge_color: &'static str,
    pub rainfall_mm: f64,
    pub recommended_action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WeatherStatus {
    NoData { message: &'static str },
    Station(StationSummary),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "section", rename_all = "snake_case")]
pub enum ReportSection {
    Susceptibility { layer: String, rows: Vec<PropertyRow> },
    WeatherStatus(WeatherStatus),
    HistoricalContext { label: &'static str, count: usize },
}

impl ReportSection {
    pub fn title(&self) -> String {
        match self {
            ReportSection::Susceptibility { layer, .. } => format!("1. Susceptibility ({})", layer),
            ReportSection::WeatherStatus(_) => "2. Weather Status".to_string(),
            ReportSection::HistoricalContext { .. } => "3. Historical Context".to_string(),
        }
    }
}

/// The fused report. Always exactly three sections, in fixed order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedReport {
    pub title: &'static str,
    pub sections: [ReportSection; 3],
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

fn summarize(nearest: NearestStation) -> StationSummary {
    let station = nearest.station;
    let tier = classify(station.warning_raw.as_deref());

    StationSummary {
        station_name: station.name,
        distance_km: nearest.distance_km,
        tier,
        level: station.warning_raw.unwrap_or_else(|| "0".to_string()),
        badge_color: tier.badge_color(),
        rainfall_mm: station.rainfall_mm.unwrap_or(0.0),
        recommended_action: station
            .recommended_action
            .unwrap_or_else(|| "Monitor".to_string()),
    }
}

/// Fuses one click into a report.
pub fn compose(
    layer: &str,
    hazard_properties: &Properties,
    nearest_station: Option<NearestStation>,
    nearby_event_count: usize,
) -> CombinedReport {
    let weather = match nearest_station {
        Some(nearest) => WeatherStatus::Station(summarize(nearest)),
        None => WeatherStatus::NoData { message: NO_STATION_DATA },
    };

    CombinedReport {
        title: "Combined Report",
        sections: [
            ReportSection::Susceptibility {
                layer: layer.to_string(),
                rows: property_rows(hazard_properties),
            },
            ReportSection::WeatherStatus(weather),
            ReportSection::HistoricalContext {
                label: NEARBY_EVENTS_LABEL,
                count: nearby_event_count,
            },
        ],
    }
}

impl CombinedReport {
    pub fn weather(&self) -> &WeatherStatus {
        match &self.sections[1] {
            ReportSection::WeatherStatus(w) => w,
            _ => unreachable!("weather status is always the second section"),
        }
    }

    /// Popup fragment; the `pdf-btn` hook is wired up by the front end.
    pub fn to_html(&self) -> Markup {
        html! {
            div class="popup-container" {
                div class="popup-header" { (self.title) }
                div class="popup-scroll-container" {
                    @for section in &self.sections {
                        div class="popup-section-title" { (section.title()) }
                        table class="popup-table" { (section_rows(section)) }
                    }
                }
                button class="pdf-btn" { "Download as PDF" }
            }
        }
    }
}

pub fn property_value_html(value: &PropertyValue) -> Markup {
    match value {
        PropertyValue::Text(t) => html! { (t) },
        PropertyValue::Link(url) => html! { a href=(url) target="_blank" { "View Link 🔗" } },
    }
}

fn section_rows(section: &ReportSection) -> Markup {
    match section {
        ReportSection::Susceptibility { rows, .. } => html! {
            @for row in rows {
                tr { th { (row.key) } td { (property_value_html(&row.value)) } }
            }
        },
        ReportSection::WeatherStatus(WeatherStatus::NoData { message }) => html! {
            tr { td colspan="2" { (message) } }
        },
        ReportSection::WeatherStatus(WeatherStatus::Station(s)) => html! {
            tr { th { "Nearest Station" } td { (s.station_name) } }
            tr { th { "Distance" } td { (format!("{:.2} km", s.distance_km)) } }
            tr {
                th { "Warning Level" }
                td style=(format!("background-color:{}; font-weight:bold;", s.badge_color)) {
                    (format!("Level {}", s.level))
                }
            }
            tr { th { "Rainfall (24h)" } td { (format!("{} mm", s.rainfall_mm)) } }
            tr { th { "Rec. Actions" } td { (s.recommended_action) } }
        },
        ReportSection::HistoricalContext { label, count } => html! {
            tr { th { (label) } td { b { (count) } " recorded event(s)" } }
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
