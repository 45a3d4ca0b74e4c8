//! Rainfall forecast animation.
//!
//! Ten daily forecast groups, each made of up to seven rainfall-bin
//! GeoJSON layers and one optional raster overlay. `catalog` (this file)
//! knows where every group lives, `sequencer` decides which group is on
//! screen, and `loader` fetches group contents on a worker pool.

pub mod loader;
pub mod sequencer;

use crate::render::Style;
use serde::Serialize;

pub const GROUP_COUNT: usize = 10;
pub const BINS_PER_GROUP: usize = 7;

/// Bin colors, lightest rainfall first.
pub const BIN_COLORS: [&str; BINS_PER_GROUP] =
    ["violet", "indigo", "blue", "green", "yellow", "orange", "red"];

/// South-west and north-east corners of the raster overlay, `[lat, lon]`.
pub const RASTER_BOUNDS: [[f64; 2]; 2] = [[5.0, 115.0], [21.0, 127.0]];
pub const RASTER_OPACITY: f64 = 0.6;

/// Where one day's layers come from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSources {
    /// 0-based day index.
    pub day: usize,
    pub bin_urls: Vec<String>,
    pub raster_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RasterOverlay {
    pub url: String,
    pub bounds: [[f64; 2]; 2],
    pub opacity: f64,
}

impl RasterOverlay {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            bounds: RASTER_BOUNDS,
            opacity: RASTER_OPACITY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ForecastCatalog {
    groups: Vec<GroupSources>,
}

/// Expands `{day}` (1-based, zero-padded to two digits) and `{bin}`
/// (1-based) in a URL template.
fn expand(template: &str, day: usize, bin: usize) -> String {
    template
        .replace("{day}", &format!("{:02}", day + 1))
        .replace("{bin}", &(bin + 1).to_string())
}

impl ForecastCatalog {
    /// Builds all ten groups from a bin URL template and the raster list.
    /// Raster URLs are reused round-robin when fewer than ten are given.
    pub fn from_template(bin_url_template: &str, raster_urls: &[String]) -> Self {
        let groups = (0..GROUP_COUNT)
            .map(|day| GroupSources {
                day,
                bin_urls: (0..BINS_PER_GROUP)
                    .map(|bin| expand(bin_url_template, day, bin))
                    .collect(),
                raster_url: (!raster_urls.is_empty())
                    .then(|| raster_urls[day % raster_urls.len()].clone()),
            })
            .collect();
        Self { groups }
    }

    /// Group for a day index, wrapping modulo the group count.
    pub fn group(&self, day: usize) -> &GroupSources {
        &self.groups[day % self.groups.len()]
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Line style for one rainfall bin.
pub fn bin_style(bin: usize) -> Style {
    Style {
        color: Some(BIN_COLORS[bin % BINS_PER_GROUP].to_string()),
        weight: Some(2.0),
        opacity: Some(0.7),
        interactive: true,
        ..Style::default()
    }
}
