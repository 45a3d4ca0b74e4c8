/// Test fixtures: representative payloads from every upstream source.
///
/// Station rows mirror the published monitoring sheet. Notes on its quirks:
///   - numeric cells may be JSON numbers or strings depending on formatting
///   - unsurveyed stations carry `0` coordinates
///   - the warning column mixes levels (1–3), "DOWN", and formula errors
///     ("N/A", "#VALUE!")
///
/// GeoJSON fixtures are trimmed FeatureCollections with one deliberately
/// malformed feature each so the per-feature skip path is exercised.

/// Primary API response: four stations, one per network.
///   - LIGTAS Los Banos: level 2, 85.5 mm
///   - ASTI Tanay: level 1, coordinates as strings
///   - SARAI Baguio: station down
///   - PAGASA Catanduanes: zero coordinates (unlocated), formula error
#[cfg(test)]
pub(crate) fn fixture_station_array_json() -> &'static str {
    r##"[
      {
        "StationName": "LIGTAS AWS Los Banos",
        "Latitude": 14.1648,
        "Longitude": 121.2413,
        "RainfallLandslidethresholdwarninglevel": 2,
        "R24H": 85.5,
        "Status": "Online",
        "LocationDetails": "UPLB Campus, Laguna",
        "Rainfalldescription": "Heavy",
        "Possiblescenario": "Slope failures possible on steep terrain",
        "Recommendedactions": "Prepare for evacuation",
        "Warninglevelguide": "https://example.org/guide.png",
        "Imagelink": "https://example.org/losbanos.jpg",
        "Daterange": "Last 24 hours"
      },
      {
        "StationName": "ASTI AWS Tanay",
        "Latitude": "14.4970",
        "Longitude": "121.2850",
        "RainfallLandslidethresholdwarninglevel": "1",
        "Rainfall": "32",
        "Status": "Online",
        "Municipality": "Tanay, Rizal",
        "Recommendedactions": "Monitor"
      },
      {
        "StationName": "SARAI AWS Baguio",
        "Latitude": 16.4023,
        "Longitude": 120.5960,
        "RainfallLandslidethresholdwarninglevel": "DOWN",
        "Status": "Offline"
      },
      {
        "StationName": "PAGASA AWS Virac",
        "Latitude": 0,
        "Longitude": 0,
        "RainfallLandslidethresholdwarninglevel": "#VALUE!",
        "R24H": null
      }
    ]"##
}

/// Spreadsheet CSV export carrying the same logical rows as
/// `fixture_station_array_json`, plus quoted commas and a blank line.
#[cfg(test)]
pub(crate) fn fixture_station_sheet_csv() -> &'static str {
    "StationName,Latitude,Longitude,RainfallLandslidethresholdwarninglevel,R24H,Status,Municipality,Recommendedactions\n\
LIGTAS AWS Los Banos,14.1648,121.2413,2,85.5,Online,\"Los Banos, Laguna\",\"Prepare for evacuation, stay alert\"\n\
ASTI AWS Tanay,14.4970,121.2850,1,32,Online,\"Tanay, Rizal\",Monitor\n\
\n\
SARAI AWS Baguio,16.4023,120.5960,DOWN,,Offline,Baguio City,\n\
PAGASA AWS Virac,0,0,#VALUE!,,Online,Virac,\n"
}

/// Recorded landslide events: three points, one polygon (ignored by the
/// index) and one feature with a broken geometry.
#[cfg(test)]
pub(crate) fn fixture_landslide_events_geojson() -> &'static str {
    r#"{
      "type": "FeatureCollection",
      "features": [
        {
          "type": "Feature",
          "geometry": { "type": "Point", "coordinates": [121.2413, 14.1700] },
          "properties": { "Event_ID": "LS-0001", "Date": "2020-11-01", "Trigger": "Typhoon Rolly" }
        },
        {
          "type": "Feature",
          "geometry": { "type": "Point", "coordinates": [121.2500, 14.1600] },
          "properties": { "Event_ID": "LS-0002", "Date": "2022-10-29", "Trigger": "TS Paeng" }
        },
        {
          "type": "Feature",
          "geometry": { "type": "Point", "coordinates": [120.5960, 16.4023] },
          "properties": { "Event_ID": "LS-0003", "Date": "2018-09-15", "Trigger": "Typhoon Ompong" }
        },
        {
          "type": "Feature",
          "geometry": {
            "type": "Polygon",
            "coordinates": [[[121.0, 14.0], [121.1, 14.0], [121.1, 14.1], [121.0, 14.0]]]
          },
          "properties": { "Event_ID": "LS-0004" }
        },
        {
          "type": "Feature",
          "geometry": { "type": "Point", "coordinates": ["oops"] },
          "properties": { "Event_ID": "LS-BROKEN" }
        }
      ]
    }"#
}

/// High-susceptibility zones: one polygon with a link property, one point.
#[cfg(test)]
pub(crate) fn fixture_high_susceptibility_geojson() -> &'static str {
    r#"{
      "type": "FeatureCollection",
      "features": [
        {
          "type": "Feature",
          "geometry": {
            "type": "Polygon",
            "coordinates": [[[121.23, 14.16], [121.25, 14.16], [121.25, 14.18], [121.23, 14.16]]]
          },
          "properties": {
            "Susceptibility": "High",
            "Municipality": "Los Banos",
            "Area_ha": 12.4,
            "Source": "https://gdis.mgb.gov.ph/"
          }
        },
        {
          "type": "Feature",
          "geometry": { "type": "Point", "coordinates": [121.28, 14.49] },
          "properties": { "Susceptibility": "High", "Municipality": "Tanay" }
        },
        "not a feature"
      ]
    }"#
}
