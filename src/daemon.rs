/// Core daemon implementation for the landslide early-warning service
///
/// This module implements the main daemon loop that:
/// 1. Loads hazard geometry (recorded landslides, susceptibility zones) once
/// 2. Refreshes station telemetry on its schedule, with CSV fallback
/// 3. Probes for connectivity while offline and refreshes on recovery
/// 4. Drives the forecast animation and applies loader results
/// 5. Publishes state for the HTTP endpoint to read
///
/// Network work never runs on the loop thread: telemetry jobs go to a
/// `TelemetryWorker` and forecast groups to the `ForecastLoader`, both
/// reporting back over channels. The endpoint reads through the shared
/// `Arc<RwLock<DashboardState>>` and sends forecast controls back over a
/// channel.

use crate::config::DashboardConfig;
use crate::forecast::loader::ForecastLoader;
use crate::forecast::sequencer::{
    AnimationSequencer, ApplyOutcome, GroupRequest, LoadResult, SequencerView,
};
use crate::forecast::ForecastCatalog;
use crate::geo::GeoPoint;
use crate::geo_index::GeoIndex;
use crate::ingest::geojson::{fetch_feature_collection, hazard_events, susceptibility_features};
use crate::ingestor::{
    JsonApiSource, RefreshOutcome, RefreshSchedule, SheetCsvSource, TelemetryEvent,
    TelemetryIngestor, TelemetryJob, TelemetryReport, TelemetrySource, TelemetryWorker,
};
use crate::model::{DashboardError, SusceptibilityClass, SusceptibilityFeature};
use crate::notice::{NoticeBoard, MSG_OFFLINE};
use crate::report::{compose, CombinedReport};
use crate::station_store::StationStore;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, warn};

/// Longest the loop waits for a command before re-checking its timers.
const LOOP_TICK: Duration = Duration::from_millis(250);

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Hazard geometry, loaded once at startup and read-only afterwards.
#[derive(Debug, Default)]
pub struct HazardLayers {
    pub events: GeoIndex,
    pub zones: HashMap<SusceptibilityClass, Vec<SusceptibilityFeature>>,
    /// Layers that could not be fetched or parsed at load time.
    pub failed_layers: usize,
}

/// Banner shown when some hazard layers are missing from the map.
pub fn layer_failure_message(failed: usize) -> String {
    format!("{} layers failed to load. Check network.", failed)
}

impl HazardLayers {
    /// Loads every layer. A layer that fails to load is logged, counted and
    /// left empty; the others are unaffected.
    pub fn load(client: &reqwest::blocking::Client, config: &DashboardConfig) -> Self {
        let mut layers = HazardLayers::default();

        match fetch_feature_collection(client, &config.layers.landslide_events_url) {
            Ok(features) => {
                layers.events = GeoIndex::new(hazard_events(features));
                info!(layer = "LIGTAS-LSDB", events = layers.events.len(), "loaded recorded landslides");
            }
            Err(e) => {
                error!(layer = "LIGTAS-LSDB", error = %e, "failed to load recorded landslides");
                layers.failed_layers += 1;
            }
        }

        for class in SusceptibilityClass::ALL {
            let url = config.layers.susceptibility_url(class);
            match fetch_feature_collection(client, url) {
                Ok(features) => {
                    let zones = susceptibility_features(class, features);
                    info!(layer = class.layer_name(), zones = zones.len(), "loaded susceptibility layer");
                    layers.zones.insert(class, zones);
                }
                Err(e) => {
                    error!(layer = class.layer_name(), error = %e, "failed to load susceptibility layer");
                    layers.failed_layers += 1;
                }
            }
        }

        layers
    }

    pub fn zones(&self, class: SusceptibilityClass) -> &[SusceptibilityFeature] {
        self.zones.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Everything the endpoint can see.
pub struct DashboardState {
    pub stations: StationStore,
    pub hazards: HazardLayers,
    pub notices: NoticeBoard,
    pub forecast: SequencerView,
    pub online: bool,
    pub nearby_radius_m: f64,
}

pub type SharedState = Arc<RwLock<DashboardState>>;

/// Reasons a report cannot be produced for a click.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("unknown susceptibility layer: {0}")]
    UnknownLayer(String),
    #[error("layer {layer} has no feature {index}")]
    UnknownFeature { layer: String, index: usize },
}

impl DashboardState {
    /// Builds the combined report for a click on feature `index` of
    /// `layer` at `point`.
    pub fn combined_report(
        &self,
        layer: &str,
        index: usize,
        point: &GeoPoint,
    ) -> Result<CombinedReport, ReportError> {
        let class = SusceptibilityClass::from_layer_name(layer)
            .ok_or_else(|| ReportError::UnknownLayer(layer.to_string()))?;
        let feature = self
            .hazards
            .zones(class)
            .get(index)
            .ok_or_else(|| ReportError::UnknownFeature { layer: layer.to_string(), index })?;

        let nearest = self.stations.nearest(point);
        let count = self.hazards.events.count_within_radius(point, self.nearby_radius_m);
        Ok(compose(class.layer_name(), &feature.properties, nearest, count))
    }
}

/// Poisoned locks are recovered: every writer leaves the state whole.
pub fn read_state(state: &SharedState) -> RwLockReadGuard<'_, DashboardState> {
    state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_state(state: &SharedState) -> RwLockWriteGuard<'_, DashboardState> {
    state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Forecast controls sent by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastCommand {
    Play,
    Pause,
    Stop,
    Next,
    Prev,
    SetInterval(Duration),
    Raster(bool),
}

// ---------------------------------------------------------------------------
// Daemon
// ---------------------------------------------------------------------------

pub struct Daemon {
    config: DashboardConfig,
    client: reqwest::blocking::Client,
    state: SharedState,
    telemetry: TelemetryWorker,
    telemetry_reports: Receiver<TelemetryReport>,
    telemetry_busy: bool,
    online: bool,
    schedule: RefreshSchedule,
    next_probe: Instant,
    notices: NoticeBoard,
    sequencer: AnimationSequencer,
    loader: ForecastLoader,
    load_results: Receiver<LoadResult>,
    commands_tx: Sender<ForecastCommand>,
    commands_rx: Receiver<ForecastCommand>,
}

/// Builds the blocking HTTP client used for every outbound request.
pub fn build_client(timeout_secs: u64) -> Result<reqwest::blocking::Client, DashboardError> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("lsmon_service/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| DashboardError::Config(format!("cannot build HTTP client: {}", e)))
}

/// Telemetry sources described by the config.
pub fn sources_from_config(
    client: &reqwest::blocking::Client,
    config: &DashboardConfig,
) -> (Option<Box<dyn TelemetrySource>>, Option<Box<dyn TelemetrySource>>) {
    let primary = config
        .telemetry
        .primary_url
        .as_deref()
        .map(|url| Box::new(JsonApiSource::new(client.clone(), url)) as Box<dyn TelemetrySource>);
    let fallback = config
        .telemetry
        .fallback_csv_url
        .as_deref()
        .map(|url| Box::new(SheetCsvSource::new(client.clone(), url)) as Box<dyn TelemetrySource>);
    (primary, fallback)
}

impl Daemon {
    /// Create a daemon reading telemetry from the configured URLs.
    pub fn new(config: DashboardConfig) -> Result<Self, DashboardError> {
        let client = build_client(config.http_timeout_secs)?;
        let (primary, fallback) = sources_from_config(&client, &config);
        Ok(Self::with_ingestor(config, client, TelemetryIngestor::new(primary, fallback)))
    }

    /// Create a daemon around an already-built ingestor.
    pub fn with_ingestor(
        config: DashboardConfig,
        client: reqwest::blocking::Client,
        ingestor: TelemetryIngestor,
    ) -> Self {
        let now = Instant::now();
        let catalog = ForecastCatalog::from_template(
            &config.forecast.bin_url_template,
            &config.forecast.raster_urls,
        );
        let mut sequencer = AnimationSequencer::new(catalog);
        sequencer.set_interval(Duration::from_millis(config.forecast.interval_ms), now);

        let (loader, load_results) = ForecastLoader::new(client.clone(), config.forecast.loader_workers);
        let (commands_tx, commands_rx) = channel();

        let state = Arc::new(RwLock::new(DashboardState {
            stations: StationStore::new(),
            hazards: HazardLayers::default(),
            notices: NoticeBoard::new(),
            forecast: sequencer.view(),
            online: true,
            nearby_radius_m: config.layers.nearby_radius_m,
        }));

        let sink = Arc::clone(&state);
        let (telemetry, telemetry_reports) = TelemetryWorker::new(ingestor, move |records| {
            write_state(&sink).stations.replace_snapshot(records)
        });

        Self {
            schedule: RefreshSchedule::new(
                Duration::from_secs(config.telemetry.refresh_interval_secs),
                now,
            ),
            next_probe: now,
            config,
            client,
            state,
            telemetry,
            telemetry_reports,
            telemetry_busy: false,
            online: true,
            notices: NoticeBoard::new(),
            sequencer,
            loader,
            load_results,
            commands_tx,
            commands_rx,
        }
    }

    /// Initialize daemon: load hazard geometry.
    pub fn initialize(&mut self) -> Result<(), DashboardError> {
        let hazards = HazardLayers::load(&self.client, &self.config);
        if hazards.events.is_empty() && hazards.zones.is_empty() {
            warn!("no hazard layers could be loaded; reports will be unavailable");
        }
        self.set_hazards(hazards);
        Ok(())
    }

    /// Installs hazard geometry, raising the missing-layers banner when
    /// any layer failed.
    pub fn set_hazards(&mut self, hazards: HazardLayers) {
        if hazards.failed_layers > 0 {
            self.notices.warning(&layer_failure_message(hazards.failed_layers), Utc::now());
        }
        write_state(&self.state).hazards = hazards;
        self.publish();
    }

    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    pub fn command_sender(&self) -> Sender<ForecastCommand> {
        self.commands_tx.clone()
    }

    pub fn sequencer(&self) -> &AnimationSequencer {
        &self.sequencer
    }

    // -----------------------------------------------------------------------
    // Telemetry
    // -----------------------------------------------------------------------

    fn submit_telemetry(&mut self, job: TelemetryJob) {
        self.telemetry.submit(job);
        self.telemetry_busy = true;
    }

    /// Folds finished telemetry jobs into the loop's state. The worker
    /// already swapped the snapshot; the state lock was held only for that.
    fn drain_telemetry(&mut self) {
        while let Ok(report) = self.telemetry_reports.try_recv() {
            self.telemetry_busy = false;
            self.notices.absorb(&report.notices);
            if report.online {
                self.notices.clear_message(MSG_OFFLINE);
            }
            self.online = report.online;

            match report.event {
                TelemetryEvent::Refreshed(outcome) if outcome.needs_render() => {
                    let generation = read_state(&self.state).stations.generation();
                    info!(generation, "station snapshot updated, warning layer rebuilt");
                }
                TelemetryEvent::Refreshed(RefreshOutcome::Applied { .. }) => {
                    info!("station snapshot unchanged")
                }
                TelemetryEvent::Refreshed(RefreshOutcome::Failed { offline }) => {
                    warn!(offline, "telemetry refresh failed")
                }
                TelemetryEvent::Probed { restored: true, at } => self.schedule.schedule_recovery(at),
                TelemetryEvent::Probed { restored: false, .. } => {}
            }
        }
    }

    /// Waits for queued telemetry jobs, then folds in and publishes their
    /// results.
    pub fn settle_telemetry(&mut self) {
        self.telemetry.wait_idle();
        self.drain_telemetry();
        self.publish();
    }

    // -----------------------------------------------------------------------
    // Forecast
    // -----------------------------------------------------------------------

    pub fn handle_command(&mut self, command: ForecastCommand, now: Instant) {
        info!(?command, "forecast command");
        let request = match command {
            ForecastCommand::Play => self.sequencer.play(now),
            ForecastCommand::Pause => {
                self.sequencer.pause();
                None
            }
            ForecastCommand::Stop => {
                self.sequencer.stop();
                None
            }
            ForecastCommand::Next => Some(self.sequencer.next()),
            ForecastCommand::Prev => Some(self.sequencer.prev()),
            ForecastCommand::SetInterval(interval) => {
                self.sequencer.set_interval(interval, now);
                None
            }
            ForecastCommand::Raster(enabled) => self.sequencer.set_raster(enabled),
        };
        self.dispatch(request);
    }

    fn dispatch(&self, request: Option<GroupRequest>) {
        if let Some(request) = request {
            self.loader.dispatch(request);
        }
    }

    fn drain_load_results(&mut self) {
        while let Ok(result) = self.load_results.try_recv() {
            if let ApplyOutcome::RasterFailed(frame) = self.sequencer.apply(result) {
                self.notices.warning(
                    &format!("Raster frame {} missing or failed to load.", frame),
                    Utc::now(),
                );
            }
        }
    }

    // -----------------------------------------------------------------------
    // Loop
    // -----------------------------------------------------------------------

    /// One pass of the loop: finished jobs, forecast timer, then at most one
    /// telemetry job (connectivity probe while offline, else the scheduled
    /// refresh), then publish. Never blocks on the network.
    pub fn step(&mut self, now: Instant) {
        self.drain_load_results();
        self.drain_telemetry();

        let request = self.sequencer.tick(now);
        self.dispatch(request);

        if !self.telemetry_busy {
            if !self.online && now >= self.next_probe {
                self.submit_telemetry(TelemetryJob::Probe { at: now });
                self.next_probe = now + Duration::from_secs(self.config.telemetry.probe_interval_secs);
            } else if self.schedule.is_due(now) {
                self.submit_telemetry(TelemetryJob::Refresh);
                self.schedule.mark_refreshed(now);
            }
        }

        self.publish();
    }

    fn publish(&self) {
        let mut state = write_state(&self.state);
        state.forecast = self.sequencer.view();
        state.notices = self.notices.clone();
        state.online = self.online;
    }

    /// How long the loop may wait before something is due.
    fn wait_budget(&self, now: Instant) -> Duration {
        let mut budget = LOOP_TICK;
        // A due refresh waits for the running job, so it is no deadline yet.
        if !self.telemetry_busy {
            budget = budget.min(self.schedule.next_deadline().saturating_duration_since(now));
        }
        if let Some(timer) = self.sequencer.timer() {
            budget = budget.min(timer.deadline.saturating_duration_since(now));
        }
        budget
    }

    /// Main daemon loop (runs indefinitely)
    pub fn run(&mut self) -> Result<(), DashboardError> {
        println!("🚀 Starting daemon loop...");
        println!("   Refresh interval: {} seconds", self.schedule.interval().as_secs());
        println!("   Forecast interval: {} ms", self.sequencer.interval().as_millis());

        loop {
            let now = Instant::now();
            self.step(now);

            match self.commands_rx.recv_timeout(self.wait_budget(now)) {
                Ok(command) => {
                    self.handle_command(command, Instant::now());
                    while let Ok(command) = self.commands_rx.try_recv() {
                        self.handle_command(command, Instant::now());
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                // The daemon holds a sender itself, so this only happens on teardown.
                Err(RecvTimeoutError::Disconnected) => return Ok(()),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
