/// GeoJSON FeatureCollection loading for hazard, susceptibility and
/// forecast layers.
///
/// The layers are hand-maintained exports, so individual features are
/// sometimes broken (null geometry, string coordinates, stray values in the
/// `features` array). Each feature is decoded on its own and a bad one is
/// skipped with a warning; the rest of the layer still loads.

use crate::geo::GeoPoint;
use crate::model::{
    DashboardError, Geometry, HazardEvent, Properties, SusceptibilityClass, SusceptibilityFeature,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Deserialize)]
struct RawCollection {
    #[serde(default)]
    features: Vec<Value>,
}

#[derive(Deserialize)]
struct RawFeature {
    #[serde(default)]
    geometry: Option<Value>,
    #[serde(default)]
    properties: Option<Properties>,
}

/// A decoded feature: geometry plus its (possibly empty) properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry,
    pub properties: Properties,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Decodes a GeoJSON geometry object.
///
/// Points become positions (GeoJSON order is `[lon, lat]`); any other
/// geometry type is kept verbatim for the renderer.
fn decode_geometry(value: Value) -> Result<Geometry, String> {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or("geometry has no type")?
        .to_string();

    if kind != "Point" {
        if value.get("coordinates").is_none() && value.get("geometries").is_none() {
            return Err(format!("{} geometry has no coordinates", kind));
        }
        return Ok(Geometry::Other(value));
    }

    let coords = value
        .get("coordinates")
        .and_then(Value::as_array)
        .ok_or("point has no coordinate array")?;
    let lon = coords.first().and_then(Value::as_f64).ok_or("point longitude is not a number")?;
    let lat = coords.get(1).and_then(Value::as_f64).ok_or("point latitude is not a number")?;

    if !lat.is_finite() || !lon.is_finite() {
        return Err("point coordinates are not finite".to_string());
    }
    Ok(Geometry::Point(GeoPoint::new(lat, lon)))
}

/// Parses a FeatureCollection body, skipping features that cannot be decoded.
///
/// # Errors
/// - `DashboardError::Parse` — the body is not a JSON object with a
///   `features` array.
pub fn parse_feature_collection(json: &str) -> Result<Vec<Feature>, DashboardError> {
    let collection: RawCollection = serde_json::from_str(json)
        .map_err(|e| DashboardError::Parse(format!("not a FeatureCollection: {}", e)))?;

    let mut features = Vec::with_capacity(collection.features.len());
    for (i, raw) in collection.features.into_iter().enumerate() {
        let raw: RawFeature = match serde_json::from_value(raw) {
            Ok(f) => f,
            Err(e) => {
                warn!(index = i, error = %e, "skipping undecodable feature");
                continue;
            }
        };

        let Some(geometry) = raw.geometry.filter(|g| !g.is_null()) else {
            debug!(index = i, "skipping feature without geometry");
            continue;
        };

        match decode_geometry(geometry) {
            Ok(geometry) => features.push(Feature {
                geometry,
                properties: raw.properties.unwrap_or_default(),
            }),
            Err(e) => warn!(index = i, error = %e, "skipping feature with bad geometry"),
        }
    }

    Ok(features)
}

/// Keeps point features as recorded landslide events.
pub fn hazard_events(features: Vec<Feature>) -> Vec<HazardEvent> {
    features
        .into_iter()
        .filter_map(|f| match f.geometry {
            Geometry::Point(location) => Some(HazardEvent {
                location,
                properties: f.properties,
            }),
            Geometry::Other(_) => None,
        })
        .collect()
}

/// Tags every feature of a susceptibility layer with its class.
pub fn susceptibility_features(
    class: SusceptibilityClass,
    features: Vec<Feature>,
) -> Vec<SusceptibilityFeature> {
    features
        .into_iter()
        .map(|f| SusceptibilityFeature {
            class,
            geometry: f.geometry,
            properties: f.properties,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Downloads and parses one FeatureCollection.
pub fn fetch_feature_collection(
    client: &reqwest::blocking::Client,
    url: &str,
) -> Result<Vec<Feature>, DashboardError> {
    let response = client.get(url).send()?;

    if !response.status().is_success() {
        return Err(DashboardError::Http(response.status().as_u16()));
    }

    let body = response.text()?;
    parse_feature_collection(&body)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures::*;

    #[test]
    fn test_broken_feature_is_skipped() {
        let features = parse_feature_collection(fixture_landslide_events_geojson()).expect("parses");
        // 5 features in the fixture, one with string coordinates.
        assert_eq!(features.len(), 4);
    }

    #[test]
    fn test_hazard_events_keep_points_only() {
        let features = parse_feature_collection(fixture_landslide_events_geojson()).expect("parses");
        let events = hazard_events(features);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].location, GeoPoint::new(14.1700, 121.2413));
        assert_eq!(events[0].properties["Event_ID"], "LS-0001");
    }

    #[test]
    fn test_susceptibility_features_carry_class_and_order() {
        let features =
            parse_feature_collection(fixture_high_susceptibility_geojson()).expect("parses");
        let zones = susceptibility_features(SusceptibilityClass::High, features);
        assert_eq!(zones.len(), 2);
        assert!(zones.iter().all(|z| z.class == SusceptibilityClass::High));

        let keys: Vec<&String> = zones[0].properties.keys().collect();
        assert_eq!(keys, ["Susceptibility", "Municipality", "Area_ha", "Source"]);
    }

    #[test]
    fn test_point_round_trips_to_geojson_order() {
        let features = parse_feature_collection(
            r#"{"features":[{"geometry":{"type":"Point","coordinates":[121.5,14.25]}}]}"#,
        )
        .expect("parses");
        let geojson = features[0].geometry.to_geojson();
        assert_eq!(geojson["coordinates"][0], 121.5);
        assert_eq!(geojson["coordinates"][1], 14.25);
        assert!(features[0].properties.is_empty());
    }

    #[test]
    fn test_null_geometry_is_skipped() {
        let features = parse_feature_collection(
            r#"{"features":[{"geometry":null,"properties":{"a":1}}]}"#,
        )
        .expect("parses");
        assert!(features.is_empty());
    }

    #[test]
    fn test_non_collection_is_parse_error() {
        assert!(matches!(parse_feature_collection("[1,2,3]"), Err(DashboardError::Parse(_))));
    }
}
