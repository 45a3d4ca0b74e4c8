/// Published-spreadsheet CSV export: the telemetry fallback source.
///
/// When the primary telemetry API is unreachable the service downloads the
/// sheet's "publish to web" CSV export instead. The first row holds the
/// column headers; each subsequent row is mapped onto the same `RawStation`
/// fields the JSON source uses, so both paths normalize identically.

use crate::ingest::telemetry::RawStation;
use crate::model::{DashboardError, StationRecord};
use csv::{ReaderBuilder, Trim};
use serde_json::{Map, Value};
use tracing::warn;

/// Parses a CSV export with a header row into station records.
///
/// Blank lines are ignored and ragged rows are tolerated (missing trailing
/// cells read as empty). A row that cannot be decoded is skipped on its own.
///
/// # Errors
/// - `DashboardError::Parse` — the header row itself is unreadable.
pub fn parse_sheet_csv(csv_text: &str) -> Result<Vec<StationRecord>, DashboardError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(csv_text.as_bytes());

    let headers = rdr.headers()?.clone();
    let mut records = Vec::new();

    for (i, row) in rdr.records().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(row = i + 1, error = %e, "skipping unreadable CSV row");
                continue;
            }
        };

        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        let mut object = Map::new();
        for (header, cell) in headers.iter().zip(row.iter()) {
            object.insert(header.to_string(), Value::String(cell.to_string()));
        }

        match serde_json::from_value::<RawStation>(Value::Object(object)) {
            Ok(raw) => records.push(raw.into_record()),
            Err(e) => warn!(row = i + 1, error = %e, "skipping malformed CSV row"),
        }
    }

    Ok(records)
}

/// Downloads and parses the CSV export.
///
/// # Errors
/// - `DashboardError::Http` — non-success status.
/// - `DashboardError::Network` — transport failure.
/// - `DashboardError::Parse` — unreadable header row.
pub fn fetch_sheet(
    client: &reqwest::blocking::Client,
    url: &str,
) -> Result<Vec<StationRecord>, DashboardError> {
    let response = client.get(url).header("Accept", "text/csv").send()?;

    if !response.status().is_success() {
        return Err(DashboardError::Http(response.status().as_u16()));
    }

    let text = response.text()?;
    parse_sheet_csv(&text)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
