/// Weather-station telemetry API client.
///
/// The primary source publishes the monitoring spreadsheet as a JSON array
/// with one object per station. Column names are the spreadsheet headers
/// with spaces removed (`StationName`, `RainfallLandslidethresholdwarninglevel`,
/// …). Values are loosely typed: the same column may hold `2`, `"2"`,
/// `"N/A"` or `null` depending on how the sheet cell was formatted.
///
/// `RawStation` is also the landing type for CSV rows (see `sheet.rs`), so
/// both sources share one normalization path into `StationRecord`.

use crate::geo::GeoPoint;
use crate::model::{DashboardError, StationRecord};
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use std::fmt;
use tracing::warn;

// ---------------------------------------------------------------------------
// Serde structures
// ---------------------------------------------------------------------------

/// One station row as published, before normalization.
#[derive(Debug, Default, Deserialize)]
pub struct RawStation {
    #[serde(rename = "StationName", default, deserialize_with = "lenient_string")]
    pub station_name: Option<String>,
    #[serde(rename = "Station", default, deserialize_with = "lenient_string")]
    pub station: Option<String>,
    #[serde(rename = "Latitude", default, deserialize_with = "lenient_string")]
    pub latitude: Option<String>,
    #[serde(rename = "Longitude", default, deserialize_with = "lenient_string")]
    pub longitude: Option<String>,
    #[serde(
        rename = "RainfallLandslidethresholdwarninglevel",
        default,
        deserialize_with = "lenient_string"
    )]
    pub warning_level: Option<String>,
    #[serde(rename = "R24H", default, deserialize_with = "lenient_string")]
    pub r24h: Option<String>,
    #[serde(rename = "Rainfall", default, deserialize_with = "lenient_string")]
    pub rainfall: Option<String>,
    #[serde(rename = "Status", default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(rename = "LocationDetails", default, deserialize_with = "lenient_string")]
    pub location_details: Option<String>,
    #[serde(rename = "Municipality", default, deserialize_with = "lenient_string")]
    pub municipality: Option<String>,
    #[serde(rename = "Rainfalldescription", default, deserialize_with = "lenient_string")]
    pub rainfall_description: Option<String>,
    #[serde(rename = "Possiblescenario", default, deserialize_with = "lenient_string")]
    pub scenario: Option<String>,
    #[serde(rename = "Recommendedactions", default, deserialize_with = "lenient_string")]
    pub recommended_actions: Option<String>,
    #[serde(rename = "Warninglevelguide", default, deserialize_with = "lenient_string")]
    pub guide_url: Option<String>,
    #[serde(rename = "Imagelink", default, deserialize_with = "lenient_string")]
    pub image_url: Option<String>,
    #[serde(rename = "Daterange", default, deserialize_with = "lenient_string")]
    pub date_range: Option<String>,
}

/// Accepts strings, numbers, booleans and nulls; blank strings become `None`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct LenientVisitor;

    impl<'de> Visitor<'de> for LenientVisitor {
        type Value = Option<String>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a string, number, boolean or null")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            let trimmed = v.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
            self.visit_str(&v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D2: Deserializer<'de>>(self, d: D2) -> Result<Self::Value, D2::Error> {
            d.deserialize_any(LenientVisitor)
        }
    }

    deserializer.deserialize_any(LenientVisitor)
}

fn parse_finite(s: Option<&str>) -> Option<f64> {
    s?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

impl RawStation {
    /// Normalizes a raw row. Coordinates that do not parse, are non-finite,
    /// or are the sheet's `0` placeholder leave the record unlocated rather
    /// than dropping it: the station still belongs in the snapshot.
    pub fn into_record(self) -> StationRecord {
        let lat = parse_finite(self.latitude.as_deref());
        let lon = parse_finite(self.longitude.as_deref());
        let location = match (lat, lon) {
            (Some(lat), Some(lon)) => GeoPoint::located(lat, lon),
            _ => None,
        };

        let rainfall_mm = parse_finite(self.r24h.as_deref())
            .or_else(|| parse_finite(self.rainfall.as_deref()));

        StationRecord {
            name: self
                .station_name
                .or(self.station)
                .unwrap_or_else(|| "Unknown Station".to_string()),
            location,
            rainfall_mm,
            rainfall_total: self.rainfall.or(self.r24h),
            warning_raw: self.warning_level,
            status: self.status,
            location_details: self.location_details.or_else(|| self.municipality.clone()),
            municipality: self.municipality,
            rainfall_description: self.rainfall_description,
            scenario: self.scenario,
            recommended_action: self.recommended_actions,
            guide_url: self.guide_url,
            image_url: self.image_url,
            date_range: self.date_range,
        }
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Parses the primary API body (a JSON array of station objects).
///
/// Entries that are not objects, or whose fields cannot be read, are logged
/// and skipped; the rest of the array is still returned.
///
/// # Errors
/// - `DashboardError::Parse` — the body is not a JSON array.
pub fn parse_station_array(json: &str) -> Result<Vec<StationRecord>, DashboardError> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(json)
        .map_err(|e| DashboardError::Parse(format!("telemetry body is not a JSON array: {}", e)))?;

    let mut records = Vec::with_capacity(entries.len());
    for (i, entry) in entries.into_iter().enumerate() {
        if !entry.is_object() {
            warn!(index = i, "skipping non-object telemetry entry");
            continue;
        }
        match serde_json::from_value::<RawStation>(entry) {
            Ok(raw) => records.push(raw.into_record()),
            Err(e) => warn!(index = i, error = %e, "skipping malformed telemetry entry"),
        }
    }

    Ok(records)
}

// ---------------------------------------------------------------------------
// API client
// ---------------------------------------------------------------------------

/// Fetches the primary telemetry feed.
///
/// # Errors
/// - `DashboardError::Http` — non-success status.
/// - `DashboardError::Network` — transport failure.
/// - `DashboardError::Parse` — body is not a JSON array.
pub fn fetch_stations(
    client: &reqwest::blocking::Client,
    url: &str,
) -> Result<Vec<StationRecord>, DashboardError> {
    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()?;

    if !response.status().is_success() {
        return Err(DashboardError::Http(response.status().as_u16()));
    }

    let body = response.text()?;
    parse_station_array(&body)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
