/// Integration tests for the forecast animation
///
/// Exercises the sequencer through the daemon's command path and directly
/// through its public API, covering manual stepping, timed playback,
/// stop/rewind and stale loader results.
///
/// Run with: cargo test --test forecast_animation

use lsmon_service::config::DashboardConfig;
use lsmon_service::daemon::{build_client, read_state, Daemon, ForecastCommand};
use lsmon_service::forecast::sequencer::{
    AnimationSequencer, ApplyOutcome, LoadItem, LoadResult, PlaybackState, DEFAULT_INTERVAL,
};
use lsmon_service::forecast::{ForecastCatalog, GROUP_COUNT};
use lsmon_service::ingestor::TelemetryIngestor;
use serde_json::json;
use std::time::{Duration, Instant};

fn sequencer() -> AnimationSequencer {
    AnimationSequencer::new(ForecastCatalog::from_template(
        "https://example.org/Daily_RF_Day{day}_Bin{bin}.geojson",
        &["https://example.org/raster.png".to_string()],
    ))
}

fn daemon() -> Daemon {
    let mut config = DashboardConfig::default();
    // Unroutable bins keep the loader busy without touching the internet.
    config.forecast.bin_url_template = "http://127.0.0.1:9/Day{day}_Bin{bin}.geojson".to_string();
    config.forecast.raster_urls = Vec::new();
    let client = build_client(1).expect("client");
    Daemon::with_ingestor(config, client, TelemetryIngestor::new(None, None))
}

#[test]
fn test_full_cycle_wraps_after_ten_days() {
    let mut seq = sequencer();
    let t0 = Instant::now();
    seq.play(t0);

    for n in 1..=GROUP_COUNT as u32 {
        assert!(seq.tick(t0 + DEFAULT_INTERVAL * n).is_some());
    }
    assert_eq!(seq.index(), 0);
    assert_eq!(seq.state(), PlaybackState::Playing);
}

#[test]
fn test_manual_stepping_then_play_keeps_group() {
    let mut seq = sequencer();
    let t0 = Instant::now();
    seq.next();
    seq.next();
    assert_eq!(seq.label(), "Day: 3");

    // A group is already on screen, so play only arms the timer.
    assert!(seq.play(t0).is_none());
    let request = seq.tick(t0 + DEFAULT_INTERVAL).expect("advances");
    assert_eq!(request.day, 3);
    assert_eq!(request.bin_urls.len(), 7);
    assert_eq!(request.bin_urls[6], "https://example.org/Daily_RF_Day04_Bin7.geojson");
}

#[test]
fn test_results_from_superseded_group_never_show() {
    let mut seq = sequencer();
    let t0 = Instant::now();
    let day_one = seq.play(t0).expect("initial group");
    let day_two = seq.tick(t0 + DEFAULT_INTERVAL).expect("second group");

    let late = LoadResult {
        token: day_one.token,
        day: day_one.day,
        item: LoadItem::Bin { bin: 0, result: Ok(json!({ "type": "FeatureCollection", "features": [] })) },
    };
    assert_eq!(seq.apply(late), ApplyOutcome::Stale);

    let fresh = LoadResult {
        token: day_two.token,
        day: day_two.day,
        item: LoadItem::Bin { bin: 5, result: Ok(json!({ "type": "FeatureCollection", "features": [] })) },
    };
    assert_eq!(seq.apply(fresh), ApplyOutcome::Applied);
    assert_eq!(seq.frame().day, Some(1));
    assert_eq!(seq.frame().layers.len(), 1);
    assert_eq!(seq.frame().layers[0].style.color.as_deref(), Some("orange"));
}

#[test]
fn test_daemon_commands_drive_sequencer() {
    let mut daemon = daemon();
    let now = Instant::now();

    daemon.handle_command(ForecastCommand::Next, now);
    daemon.handle_command(ForecastCommand::Next, now);
    daemon.handle_command(ForecastCommand::Prev, now);
    assert_eq!(daemon.sequencer().index(), 1);

    daemon.handle_command(ForecastCommand::SetInterval(Duration::from_millis(10)), now);
    assert_eq!(daemon.sequencer().interval(), Duration::from_millis(1000));

    daemon.handle_command(ForecastCommand::Play, now);
    daemon.handle_command(ForecastCommand::Pause, now);
    assert_eq!(daemon.sequencer().state(), PlaybackState::Paused);

    daemon.handle_command(ForecastCommand::Stop, now);
    daemon.step(now);

    let state = daemon.state();
    let state = read_state(&state);
    assert_eq!(state.forecast.state, PlaybackState::Stopped);
    assert_eq!(state.forecast.index, 0);
    assert!(state.forecast.frame.day.is_none());
}
