//! Shared payloads for the integration tests.
//!
//! Four monitoring stations (one per network) in both upstream formats, a
//! handful of recorded landslides and one high-susceptibility zone around
//! Los Banos.

#![allow(dead_code)]

pub fn station_array_json() -> &'static str {
    r##"[
      {
        "StationName": "LIGTAS AWS Los Banos",
        "Latitude": 14.1648,
        "Longitude": 121.2413,
        "RainfallLandslidethresholdwarninglevel": 2,
        "R24H": 85.5,
        "Status": "Online",
        "Recommendedactions": "Prepare for evacuation"
      },
      {
        "StationName": "ASTI AWS Tanay",
        "Latitude": "14.4970",
        "Longitude": "121.2850",
        "RainfallLandslidethresholdwarninglevel": "1",
        "Rainfall": "32"
      },
      {
        "StationName": "SARAI AWS Baguio",
        "Latitude": 16.4023,
        "Longitude": 120.5960,
        "RainfallLandslidethresholdwarninglevel": "DOWN"
      },
      {
        "StationName": "PAGASA AWS Virac",
        "Latitude": 0,
        "Longitude": 0,
        "RainfallLandslidethresholdwarninglevel": "#VALUE!"
      }
    ]"##
}

pub fn station_sheet_csv() -> &'static str {
    "StationName,Latitude,Longitude,RainfallLandslidethresholdwarninglevel,R24H,Municipality\n\
LIGTAS AWS Los Banos,14.1648,121.2413,2,85.5,\"Los Banos, Laguna\"\n\
ASTI AWS Tanay,14.4970,121.2850,1,32,\"Tanay, Rizal\"\n\
\n\
SARAI AWS Baguio,16.4023,120.5960,DOWN,,Baguio City\n\
PAGASA AWS Virac,0,0,#VALUE!,,Virac\n"
}

pub fn landslide_events_geojson() -> &'static str {
    r#"{
      "type": "FeatureCollection",
      "features": [
        {
          "type": "Feature",
          "geometry": { "type": "Point", "coordinates": [121.2413, 14.1700] },
          "properties": { "Event_ID": "LS-0001" }
        },
        {
          "type": "Feature",
          "geometry": { "type": "Point", "coordinates": [121.2500, 14.1600] },
          "properties": { "Event_ID": "LS-0002" }
        },
        {
          "type": "Feature",
          "geometry": { "type": "Point", "coordinates": [120.5960, 16.4023] },
          "properties": { "Event_ID": "LS-0003" }
        }
      ]
    }"#
}

pub fn high_susceptibility_geojson() -> &'static str {
    r#"{
      "type": "FeatureCollection",
      "features": [
        {
          "type": "Feature",
          "geometry": {
            "type": "Polygon",
            "coordinates": [[[121.23, 14.16], [121.25, 14.16], [121.25, 14.18], [121.23, 14.16]]]
          },
          "properties": { "Susceptibility": "High", "Municipality": "Los Banos" }
        }
      ]
    }"#
}
