/// Service configuration loader - parses dashboard.toml
///
/// Keeps source URLs, refresh intervals and forecast templates out of the
/// code so a data source can move without a rebuild. Every field has a
/// production default; the file only needs the values that differ.
///
/// # Environment overrides
///
/// - `LSMON_CONFIG` - path of the config file (default `dashboard.toml`)
/// - `LSMON_TELEMETRY_URL` - primary telemetry JSON endpoint
/// - `LSMON_FALLBACK_CSV_URL` - published sheet CSV export
///
/// A `.env` file in the working directory is loaded first.

use crate::model::{DashboardError, SusceptibilityClass};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "dashboard.toml";

const SHEET_CSV_URL: &str = "https://docs.google.com/spreadsheets/d/e/2PACX-1vSosfBP3StMyRUzwI0tUZPsLjPVH1zePCz8gZbTMOzjOvnonbmNCoy5VT46UxO0qdqb-Wm9EqTpXp8y/pub?gid=470430875&single=true&output=csv";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Timeout applied to every outbound HTTP request.
    pub http_timeout_secs: u64,
    pub telemetry: TelemetryConfig,
    pub layers: LayerConfig,
    pub forecast: ForecastConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// JSON API serving the station array. Unset means CSV only.
    pub primary_url: Option<String>,
    /// Unset is a missing-dependency condition reported to the user.
    pub fallback_csv_url: Option<String>,
    pub refresh_interval_secs: u64,
    /// How often to probe for connectivity while offline.
    pub probe_interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    pub landslide_events_url: String,
    pub high_susceptibility_url: String,
    pub medium_susceptibility_url: String,
    pub low_susceptibility_url: String,
    /// Radius for the "nearby landslides" count in reports.
    pub nearby_radius_m: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// `{day}` expands to 01..10 and `{bin}` to 1..7.
    pub bin_url_template: String,
    pub raster_urls: Vec<String>,
    pub interval_ms: u64,
    pub loader_workers: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: 30,
            telemetry: TelemetryConfig::default(),
            layers: LayerConfig::default(),
            forecast: ForecastConfig::default(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            primary_url: None,
            fallback_csv_url: Some(SHEET_CSV_URL.to_string()),
            refresh_interval_secs: 60,
            probe_interval_secs: 10,
        }
    }
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            landslide_events_url: "https://raw.githubusercontent.com/Gabzrock/LIGTAS-AGAD/refs/heads/main/LandslideDB-web.geojson".to_string(),
            high_susceptibility_url: "https://raw.githubusercontent.com/Gabzrock/LIGTASAGADEWSV3/refs/heads/main/uRIL_AWS_High%20Susceptibility.geojson".to_string(),
            medium_susceptibility_url: "https://raw.githubusercontent.com/Gabzrock/LIGTASAGADEWSV3/refs/heads/main/uRIL_AWS_Moderate_Susceptibility.geojson".to_string(),
            low_susceptibility_url: "https://raw.githubusercontent.com/Gabzrock/LIGTASAGADEWSV3/refs/heads/main/uRIL_AWS_Low_Susceptibility.geojson".to_string(),
            nearby_radius_m: crate::geo_index::DEFAULT_EVENT_RADIUS_M,
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            bin_url_template: "https://raw.githubusercontent.com/Gabzrock/CRSS/refs/heads/main/Daily_RF_Day{day}_Bin{bin}.geojson".to_string(),
            raster_urls: (1..=10)
                .map(|d| format!("https://placehold.co/800x600?text=Rainfall+Raster+Day+{}", d))
                .collect(),
            interval_ms: 5000,
            loader_workers: 4,
        }
    }
}

impl LayerConfig {
    pub fn susceptibility_url(&self, class: SusceptibilityClass) -> &str {
        match class {
            SusceptibilityClass::High => &self.high_susceptibility_url,
            SusceptibilityClass::Medium => &self.medium_susceptibility_url,
            SusceptibilityClass::Low => &self.low_susceptibility_url,
        }
    }
}

/// Parses a config document.
pub fn parse_config(contents: &str) -> Result<DashboardConfig, DashboardError> {
    toml::from_str(contents).map_err(|e| DashboardError::Config(e.to_string()))
}

/// Loads and parses one config file.
///
/// # Errors
/// - `DashboardError::Io` - the file cannot be read.
/// - `DashboardError::Config` - the file is not valid config TOML.
pub fn load_config(path: &Path) -> Result<DashboardConfig, DashboardError> {
    let contents = fs::read_to_string(path)?;
    toml::from_str(&contents)
        .map_err(|e| DashboardError::Config(format!("{}: {}", path.display(), e)))
}

/// Applies `LSMON_TELEMETRY_URL` / `LSMON_FALLBACK_CSV_URL`. An empty
/// value clears the setting.
pub fn apply_env_overrides<F>(config: &mut DashboardConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("LSMON_TELEMETRY_URL") {
        config.telemetry.primary_url = Some(url).filter(|u| !u.trim().is_empty());
    }
    if let Some(url) = lookup("LSMON_FALLBACK_CSV_URL") {
        config.telemetry.fallback_csv_url = Some(url).filter(|u| !u.trim().is_empty());
    }
}

/// Full startup load: `.env`, then the config file (defaults when the
/// default path is absent), then environment overrides.
///
/// `explicit_path` (from the command line) wins over `LSMON_CONFIG`; an
/// explicitly named file that is missing is an error.
pub fn load_from_env(explicit_path: Option<&Path>) -> Result<DashboardConfig, DashboardError> {
    dotenv::dotenv().ok();

    let named = explicit_path
        .map(Path::to_path_buf)
        .or_else(|| env::var("LSMON_CONFIG").ok().map(Into::into));

    let mut config = match named {
        Some(path) => load_config(&path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            load_config(Path::new(DEFAULT_CONFIG_PATH))?
        }
        None => {
            info!("no {} found, using built-in defaults", DEFAULT_CONFIG_PATH);
            DashboardConfig::default()
        }
    };

    apply_env_overrides(&mut config, |key| env::var(key).ok());
    Ok(config)
}
