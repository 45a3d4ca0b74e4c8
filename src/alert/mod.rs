//! Warning-tier classification for weather-station telemetry.

pub mod warning;
