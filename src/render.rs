/// Render instructions handed to the external map widget.
///
/// The service never draws anything itself. For each thing that should
/// appear on the map it emits a `RenderInstruction`: a GeoJSON geometry,
/// style attributes, an optional marker icon and optional popup HTML. The
/// browser front end turns these into map layers one-to-one.

use crate::alert::warning::{classify, BufferLayer, WarningTier, WARNING_BUFFER_RADIUS_M};
use crate::model::{
    HazardEvent, Properties, StationRecord, SusceptibilityClass, SusceptibilityFeature,
};
use crate::report::{property_rows, property_value_html};
use maud::{html, Markup};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Icons
// ---------------------------------------------------------------------------

pub const ICON_LIGTAS: &str =
    "https://ligtas.uplb.edu.ph/wp-content/uploads/2022/04/3-e1659971771933.png";
pub const ICON_SARAI: &str = "https://ligtas.uplb.edu.ph/wp-content/uploads/2022/02/SARAI.png";
pub const ICON_ASTI: &str =
    "https://ligtas.uplb.edu.ph/wp-content/uploads/2022/10/DOST-ASTI-Logo-RGB-e1722929759841.png";
pub const ICON_PAGASA: &str =
    "https://raw.githubusercontent.com/Gabzrock/LIGTASkanaba/refs/heads/main/LOGO2.png";

/// Marker icon for a station, chosen by the network named in its title.
pub fn station_icon(station_name: &str) -> &'static str {
    if station_name.contains("ASTI") {
        ICON_ASTI
    } else if station_name.contains("SARAI") {
        ICON_SARAI
    } else if station_name.contains("PAGASA") {
        ICON_PAGASA
    } else {
        ICON_LIGTAS
    }
}

// ---------------------------------------------------------------------------
// Instruction types
// ---------------------------------------------------------------------------

/// Style attributes understood by the map front end. Unset fields use the
/// widget's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Style {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    /// Circle radius in meters for buffers, pixels for circle markers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash_array: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    pub interactive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionKind {
    Marker,
    Buffer,
    Feature,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderInstruction {
    pub kind: InstructionKind,
    pub geometry: serde_json::Value,
    pub style: Style,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popup_html: Option<String>,
}

fn point_geometry(lat: f64, lon: f64) -> serde_json::Value {
    serde_json::json!({ "type": "Point", "coordinates": [lon, lat] })
}

/// Style of one warning buffer circle.
pub fn buffer_style(layer: BufferLayer) -> Style {
    match layer {
        BufferLayer::Outline { color } => Style {
            color: Some(color.to_string()),
            // The "n/a" ring is drawn hollow; level rings get a faint tint.
            fill_color: Some(if color == "white" { "transparent" } else { color }.to_string()),
            fill_opacity: Some(if color == "white" { 0.0 } else { 0.05 }),
            radius: Some(WARNING_BUFFER_RADIUS_M),
            weight: Some(2.0),
            dash_array: Some("5, 10".to_string()),
            ..Style::default()
        },
        BufferLayer::Pulse { color } => Style {
            color: Some(color.to_string()),
            fill_color: Some(color.to_string()),
            fill_opacity: Some(0.3),
            radius: Some(WARNING_BUFFER_RADIUS_M),
            weight: Some(1.0),
            class_name: Some("pulse-layer".to_string()),
            ..Style::default()
        },
    }
}

// ---------------------------------------------------------------------------
// Warning layer
// ---------------------------------------------------------------------------

/// Builds the "20-KM Warning & AWS" layer for a snapshot: every located
/// station gets its tier's buffers followed by its marker. Unlocated
/// stations are left out entirely.
pub fn warning_layer(stations: &[StationRecord]) -> Vec<RenderInstruction> {
    let mut out = Vec::new();

    for station in stations {
        let Some(loc) = station.location else {
            continue;
        };
        let tier = classify(station.warning_raw.as_deref());
        let geometry = point_geometry(loc.lat, loc.lon);

        for layer in tier.buffer_plan() {
            out.push(RenderInstruction {
                kind: InstructionKind::Buffer,
                geometry: geometry.clone(),
                style: buffer_style(layer),
                icon_url: None,
                popup_html: None,
            });
        }

        out.push(RenderInstruction {
            kind: InstructionKind::Marker,
            geometry,
            style: Style { interactive: true, ..Style::default() },
            icon_url: Some(station_icon(&station.name).to_string()),
            popup_html: Some(station_popup(station, tier).into_string()),
        });
    }

    out
}

/// Station marker popup.
pub fn station_popup(station: &StationRecord, tier: WarningTier) -> Markup {
    let or_na = |v: &Option<String>| v.clone().unwrap_or_else(|| "N/A".to_string());
    let rainfall = station.rainfall_total.as_deref().unwrap_or("0");
    let level = station.warning_raw.clone().unwrap_or_else(|| "0".to_string());
    let area = station
        .date_range
        .clone()
        .or_else(|| station.municipality.clone())
        .unwrap_or_else(|| "N/A".to_string());

    html! {
        div class="popup-container" {
            div class="popup-header" { (station.name) }
            div class="popup-scroll-container" {
                table class="popup-table" {
                    tr { th { "Status" } td { (or_na(&station.status)) } }
                    tr { th { "Location" } td { (or_na(&station.location_details)) } }
                    tr { th { "Rainfall (Total)" } td { (format!("{} mm", rainfall)) } }
                    tr { th { "Warning Level" } td data-tier=(tier.label()) { (level) } }
                    tr { th { "Description" } td { (or_na(&station.rainfall_description)) } }
                    tr { th { "Scenario" } td { (or_na(&station.scenario)) } }
                    tr { th { "Actions" } td { (or_na(&station.recommended_action)) } }
                    @if let Some(guide) = &station.guide_url {
                        tr { th { "Guide" } td { img class="popup-image" src=(guide) alt="Guide"; } }
                    }
                    @if let Some(image) = &station.image_url {
                        tr { th { "Image" } td { img class="popup-image" src=(image) alt="Station Image"; } }
                    }
                    tr { th { "Area" } td { (area) } }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Hazard layers
// ---------------------------------------------------------------------------

/// Style for a susceptibility zone layer; the high class flashes.
pub fn susceptibility_style(class: SusceptibilityClass) -> Style {
    Style {
        color: Some(class.color().to_string()),
        fill_opacity: Some(0.6),
        class_name: (class == SusceptibilityClass::High).then(|| "flashing-high".to_string()),
        interactive: true,
        ..Style::default()
    }
}

/// Circle-marker style for recorded landslide points.
pub fn landslide_event_style() -> Style {
    Style {
        color: Some("orange".to_string()),
        fill_color: Some("orange".to_string()),
        fill_opacity: Some(0.8),
        radius: Some(6.0),
        weight: Some(1.0),
        class_name: Some("flashing-high".to_string()),
        interactive: true,
        ..Style::default()
    }
}

/// Generic property popup for hazard features; URL values become links.
pub fn feature_popup(properties: &Properties) -> Markup {
    html! {
        div class="popup-container" {
            div class="popup-scroll-container" {
                table class="popup-table" {
                    @for row in property_rows(properties) {
                        tr { th { (row.key) } td { (property_value_html(&row.value)) } }
                    }
                }
            }
        }
    }
}

/// One instruction per zone feature of a susceptibility layer. Zone
/// popups are replaced by the combined report, so none is attached here.
pub fn susceptibility_layer(features: &[SusceptibilityFeature]) -> Vec<RenderInstruction> {
    features
        .iter()
        .map(|f| RenderInstruction {
            kind: InstructionKind::Feature,
            geometry: f.geometry.to_geojson(),
            style: susceptibility_style(f.class),
            icon_url: None,
            popup_html: None,
        })
        .collect()
}

/// Recorded landslide points as flashing circle markers.
pub fn landslide_layer(events: &[HazardEvent]) -> Vec<RenderInstruction> {
    events
        .iter()
        .map(|e| RenderInstruction {
            kind: InstructionKind::Marker,
            geometry: point_geometry(e.location.lat, e.location.lon),
            style: landslide_event_style(),
            icon_url: None,
            popup_html: Some(feature_popup(&e.properties).into_string()),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
