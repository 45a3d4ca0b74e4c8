//! Rainfall-induced landslide warning tiers.
//!
//! Stations publish their warning level as free text in the telemetry
//! sheet: a number 1–3, the word "down" for a station that is offline, or a
//! spreadsheet error ("N/A", "#VALUE!") when the threshold formula could not
//! be evaluated. `classify` folds every possible value into exactly one
//! `WarningTier`; everything downstream (buffers, report badge) matches on
//! the tier instead of comparing strings.

use serde::Serialize;

/// Radius of the warning buffer drawn around a station, in meters.
pub const WARNING_BUFFER_RADIUS_M: f64 = 20_000.0;

/// Warning tiers, ordered by severity for the numeric levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WarningTier {
    /// No usable level (absent, unparsable, or a number outside 1–3).
    None,
    Level1,
    Level2,
    Level3,
    /// Station reported "down": show the marker only.
    Standby,
    /// Threshold formula failed ("n/a", "#value!").
    Unknown,
}

/// One buffer circle to be drawn around a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BufferLayer {
    /// Dashed ring with a faint fill.
    Outline { color: &'static str },
    /// Animated inner disc with a stronger fill.
    Pulse { color: &'static str },
}

/// Classifies a raw warning indicator.
///
/// The input is trimmed and lower-cased first, so `" DOWN "` and `"down"`
/// are the same. Numeric indicators may arrive as `"2"` from the CSV export
/// or as `"2.0"` when a JSON number was stringified; both are level 2.
pub fn classify(raw: Option<&str>) -> WarningTier {
    let Some(raw) = raw else {
        return WarningTier::None;
    };
    let normalized = raw.trim().to_lowercase();

    match normalized.as_str() {
        "down" => WarningTier::Standby,
        "n/a" | "#value!" => WarningTier::Unknown,
        other => match parse_level(other) {
            Some(1) => WarningTier::Level1,
            Some(2) => WarningTier::Level2,
            Some(3) => WarningTier::Level3,
            _ => WarningTier::None,
        },
    }
}

/// Leading integer of a cell: optional sign, then digits. Anything after
/// the digits is ignored, so "2.5" reads as 2.
fn parse_level(s: &str) -> Option<i64> {
    let (sign, rest) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    rest[..end].parse::<i64>().ok().map(|n| sign * n)
}

impl WarningTier {
    /// Display color for the numeric levels.
    pub fn color(&self) -> Option<&'static str> {
        match self {
            WarningTier::Level1 => Some("yellow"),
            WarningTier::Level2 => Some("orange"),
            WarningTier::Level3 => Some("red"),
            WarningTier::None | WarningTier::Standby | WarningTier::Unknown => None,
        }
    }

    /// Badge color in the combined report; anything that is not an active
    /// level reads as green.
    pub fn badge_color(&self) -> &'static str {
        self.color().unwrap_or("green")
    }

    /// Buffers to draw around the station for this tier, outermost first.
    pub fn buffer_plan(&self) -> Vec<BufferLayer> {
        match self {
            WarningTier::Level1 | WarningTier::Level2 | WarningTier::Level3 => {
                let color = self.color().unwrap_or("white");
                vec![BufferLayer::Outline { color }, BufferLayer::Pulse { color }]
            }
            WarningTier::Unknown => vec![BufferLayer::Outline { color: "white" }],
            WarningTier::Standby | WarningTier::None => Vec::new(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WarningTier::None => "No Warning",
            WarningTier::Level1 => "Level 1",
            WarningTier::Level2 => "Level 2",
            WarningTier::Level3 => "Level 3",
            WarningTier::Standby => "Station Down",
            WarningTier::Unknown => "Unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
