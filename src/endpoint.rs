/// HTTP endpoint for the browser front end
///
/// The map front end polls this API for render instructions and reports,
/// and drives the forecast animation through it. Nothing is drawn here.
///
/// Endpoints:
/// - GET  /health - Service health check
/// - GET  /stations - Warning layer (markers + 20 km buffers)
/// - GET  /layers - Susceptibility zones and recorded landslides
/// - GET  /report?layer=MGB-HIGH&feature=0&lat=14.1&lon=121.2[&format=html]
/// - GET  /forecast - Animation state and displayed frame
/// - POST /forecast/{play|pause|stop|next|prev}
/// - POST /forecast/speed/{secs}
/// - POST /forecast/raster/{on|off}
/// - GET  /notices - Active user notices

use crate::daemon::{read_state, ForecastCommand, SharedState};
use crate::geo::GeoPoint;
use crate::model::SusceptibilityClass;
use crate::render::{landslide_layer, susceptibility_layer, warning_layer};
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::sync::mpsc::Sender;
use std::time::Duration;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

/// Routed response, before it becomes a `tiny_http::Response`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    fn json(status: u16, value: serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: serde_json::to_string_pretty(&value).unwrap_or_default(),
        }
    }

    fn html(body: String) -> Self {
        Self { status: 200, content_type: "text/html; charset=utf-8", body }
    }

    fn error(status: u16, message: &str) -> Self {
        Self::json(status, json!({ "error": message }))
    }
}

/// Splits a request URL into its path and decoded query parameters.
pub fn parse_url(url: &str) -> (&str, HashMap<String, String>) {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    let params = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = value.replace('+', " ");
            let key = urlencoding::decode(key).ok()?.into_owned();
            let value = urlencoding::decode(&value).ok()?.into_owned();
            Some((key, value))
        })
        .collect();
    (path, params)
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Routes one request. Forecast controls are forwarded to the daemon loop
/// and acknowledged with 202; their effect shows up in `/forecast`.
pub fn route(
    method: &tiny_http::Method,
    url: &str,
    state: &SharedState,
    commands: &Sender<ForecastCommand>,
) -> Reply {
    let (path, params) = parse_url(url);
    debug!(%method, path, "request");

    match (method, path) {
        (tiny_http::Method::Get, "/health") => handle_health(state),
        (tiny_http::Method::Get, "/stations") => handle_stations(state),
        (tiny_http::Method::Get, "/layers") => handle_layers(state),
        (tiny_http::Method::Get, "/report") => handle_report(state, &params),
        (tiny_http::Method::Get, "/forecast") => handle_forecast(state),
        (tiny_http::Method::Get, "/notices") => handle_notices(state),
        (tiny_http::Method::Post, p) if p.starts_with("/forecast/") => {
            match parse_command(p.trim_start_matches("/forecast/")) {
                Ok(command) => send_command(commands, command),
                Err(message) => Reply::error(400, &message),
            }
        }
        _ => Reply::json(
            404,
            json!({
                "error": "Not found",
                "available_endpoints": [
                    "GET /health", "GET /stations", "GET /layers", "GET /report",
                    "GET /forecast", "GET /notices", "POST /forecast/{action}"
                ]
            }),
        ),
    }
}

fn handle_health(state: &SharedState) -> Reply {
    let state = read_state(state);
    Reply::json(
        200,
        json!({
            "status": "ok",
            "service": "lsmon_service",
            "version": env!("CARGO_PKG_VERSION"),
            "online": state.online,
            "stations": state.stations.len(),
            "last_updated": state.stations.last_updated(),
        }),
    )
}

fn handle_stations(state: &SharedState) -> Reply {
    let state = read_state(state);
    let snapshot = state.stations.snapshot();
    Reply::json(
        200,
        json!({
            "layer": "20-KM Warning & AWS",
            "generation": state.stations.generation(),
            "last_updated": state.stations.last_updated(),
            "station_count": snapshot.len(),
            "instructions": warning_layer(&snapshot),
        }),
    )
}

fn handle_layers(state: &SharedState) -> Reply {
    let state = read_state(state);
    let mut layers: Vec<serde_json::Value> = SusceptibilityClass::ALL
        .iter()
        .map(|&class| {
            let zones = state.hazards.zones(class);
            json!({
                "name": class.layer_name(),
                "group": "Susceptibility",
                "color": class.color(),
                "logo_url": class.logo_url(),
                "feature_count": zones.len(),
                "instructions": susceptibility_layer(zones),
            })
        })
        .collect();

    layers.insert(
        0,
        json!({
            "name": "LIGTAS-LSDB",
            "group": "Recorded Landslides",
            "color": "orange",
            "feature_count": state.hazards.events.len(),
            "instructions": landslide_layer(state.hazards.events.events()),
        }),
    );

    Reply::json(200, json!({ "layers": layers }))
}

fn handle_report(state: &SharedState, params: &HashMap<String, String>) -> Reply {
    let Some(layer) = params.get("layer") else {
        return Reply::error(400, "missing query parameter: layer");
    };
    let feature = match params.get("feature").map(|f| f.parse::<usize>()) {
        Some(Ok(index)) => index,
        _ => return Reply::error(400, "feature must be a non-negative integer"),
    };
    let coord = |key: &str| params.get(key).and_then(|v| v.parse::<f64>().ok()).filter(|v| v.is_finite());
    let (Some(lat), Some(lon)) = (coord("lat"), coord("lon")) else {
        return Reply::error(400, "lat and lon must be numbers");
    };

    let state = read_state(state);
    match state.combined_report(layer, feature, &GeoPoint::new(lat, lon)) {
        Ok(report) if params.get("format").map(String::as_str) == Some("html") => {
            Reply::html(report.to_html().into_string())
        }
        Ok(report) => Reply::json(200, serde_json::to_value(&report).unwrap_or_default()),
        Err(e) => Reply::error(404, &e.to_string()),
    }
}

fn handle_forecast(state: &SharedState) -> Reply {
    let state = read_state(state);
    Reply::json(200, serde_json::to_value(&state.forecast).unwrap_or_default())
}

fn handle_notices(state: &SharedState) -> Reply {
    let state = read_state(state);
    Reply::json(200, json!({ "notices": state.notices.active(Utc::now()) }))
}

/// Parses the part of a control path after `/forecast/`.
pub fn parse_command(action: &str) -> Result<ForecastCommand, String> {
    let segments: Vec<&str> = action.trim_matches('/').split('/').collect();
    match segments.as_slice() {
        ["play"] => Ok(ForecastCommand::Play),
        ["pause"] => Ok(ForecastCommand::Pause),
        ["stop"] => Ok(ForecastCommand::Stop),
        ["next"] => Ok(ForecastCommand::Next),
        ["prev"] => Ok(ForecastCommand::Prev),
        ["raster", "on"] => Ok(ForecastCommand::Raster(true)),
        ["raster", "off"] => Ok(ForecastCommand::Raster(false)),
        ["speed", secs] => secs
            .parse::<f64>()
            .ok()
            .filter(|s| *s > 0.0)
            .and_then(|s| Duration::try_from_secs_f64(s).ok())
            .map(ForecastCommand::SetInterval)
            .ok_or_else(|| format!("invalid speed: {}", secs)),
        _ => Err(format!("unknown forecast action: {}", action)),
    }
}

fn send_command(commands: &Sender<ForecastCommand>, command: ForecastCommand) -> Reply {
    match commands.send(command) {
        Ok(()) => Reply::json(202, json!({ "accepted": format!("{:?}", command) })),
        Err(e) => {
            warn!(error = %e, "daemon loop is not receiving commands");
            Reply::error(503, "daemon loop unavailable")
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP Server
// ---------------------------------------------------------------------------

/// Start HTTP endpoint server on the specified port
pub fn start_endpoint_server(
    port: u16,
    state: SharedState,
    commands: Sender<ForecastCommand>,
) -> Result<(), String> {
    let server = tiny_http::Server::http(format!("0.0.0.0:{}", port))
        .map_err(|e| format!("Failed to start HTTP server: {}", e))?;

    println!("📡 HTTP endpoint listening on http://0.0.0.0:{}", port);
    println!("   GET /stations, /layers, /report, /forecast, /notices, /health");
    println!("   POST /forecast/{{play|pause|stop|next|prev}}\n");

    for request in server.incoming_requests() {
        let reply = route(request.method(), request.url(), &state, &commands);

        if let Err(e) = request.respond(create_response(reply)) {
            warn!(error = %e, "failed to send response");
        }
    }

    Ok(())
}

/// Create HTTP response from a routed reply
fn create_response(reply: Reply) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let mut response = tiny_http::Response::from_data(reply.body.into_bytes())
        .with_status_code(tiny_http::StatusCode::from(reply.status));

    if let Ok(header) = tiny_http::Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
        response = response.with_header(header);
    }
    if let Ok(header) = tiny_http::Header::from_bytes(&b"Access-Control-Allow-Origin"[..], &b"*"[..]) {
        response = response.with_header(header);
    }
    response
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
