/// Forecast animation state machine.
///
/// The sequencer owns everything about which forecast day is on screen:
/// playback state, the current index, the frame (bin layers and raster)
/// and the animation timer. It performs no I/O. Operations that need a new
/// group on screen return a `GroupRequest`; the daemon hands it to the
/// loader and feeds the loader's results back through `apply`.
///
/// ## Timer
///
/// The timer is a single owned deadline tagged with a generation. Every
/// arm bumps the generation, and cancelling drops the deadline, so a timer
/// handle captured before a pause/stop can never fire afterwards.
///
/// ## Stale results
///
/// Every display issues a fresh `RequestToken`. Results carrying an older
/// token belong to a group that is no longer shown and are discarded.

use super::{bin_style, ForecastCatalog, RasterOverlay, GROUP_COUNT};
use crate::model::DashboardError;
use crate::render::Style;
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(5000);
pub const MIN_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestToken(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    pub deadline: Instant,
    pub generation: u64,
}

/// Work for the loader: fetch these bins (and check the raster) for `day`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRequest {
    pub token: RequestToken,
    pub day: usize,
    pub bin_urls: Vec<String>,
    pub raster_url: Option<String>,
}

#[derive(Debug)]
pub enum LoadItem {
    Bin { bin: usize, result: Result<Value, DashboardError> },
    Raster { result: Result<(), DashboardError> },
}

/// One piece of a group, as reported by the loader.
#[derive(Debug)]
pub struct LoadResult {
    pub token: RequestToken,
    pub day: usize,
    pub item: LoadItem,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// Result for a group that has since been replaced or cleared.
    Stale,
    /// Bin failed to load; the rest of the group is unaffected.
    BinSkipped,
    /// Raster image is unavailable; carries the 1-based frame number.
    RasterFailed(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinLayer {
    pub bin: usize,
    pub style: Style,
    pub data: Value,
}

/// What is currently on screen.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Frame {
    pub day: Option<usize>,
    pub layers: Vec<BinLayer>,
    pub raster: Option<RasterOverlay>,
}

impl Frame {
    pub fn is_empty(&self) -> bool {
        self.day.is_none()
    }
}

/// Serializable view for the endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SequencerView {
    pub state: PlaybackState,
    pub index: usize,
    pub label: String,
    pub interval_ms: u64,
    pub raster_enabled: bool,
    pub frame: Frame,
}

pub struct AnimationSequencer {
    catalog: ForecastCatalog,
    state: PlaybackState,
    index: usize,
    interval: Duration,
    timer: Option<TimerHandle>,
    timer_generation: u64,
    frame: Frame,
    current_token: RequestToken,
    raster_enabled: bool,
}

impl AnimationSequencer {
    pub fn new(catalog: ForecastCatalog) -> Self {
        Self {
            catalog,
            state: PlaybackState::Stopped,
            index: 0,
            interval: DEFAULT_INTERVAL,
            timer: None,
            timer_generation: 0,
            frame: Frame::default(),
            current_token: RequestToken(0),
            raster_enabled: false,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn timer(&self) -> Option<TimerHandle> {
        self.timer
    }

    pub fn current_token(&self) -> RequestToken {
        self.current_token
    }

    pub fn raster_enabled(&self) -> bool {
        self.raster_enabled
    }

    /// "Day: N" label for the current index.
    pub fn label(&self) -> String {
        format!("Day: {}", self.index + 1)
    }

    pub fn view(&self) -> SequencerView {
        SequencerView {
            state: self.state,
            index: self.index,
            label: self.label(),
            interval_ms: self.interval.as_millis() as u64,
            raster_enabled: self.raster_enabled,
            frame: self.frame.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Timer
    // -----------------------------------------------------------------------

    fn arm(&mut self, now: Instant) {
        self.timer_generation += 1;
        self.timer = Some(TimerHandle {
            deadline: now + self.interval,
            generation: self.timer_generation,
        });
    }

    fn cancel_timer(&mut self) {
        self.timer = None;
    }

    // -----------------------------------------------------------------------
    // Display
    // -----------------------------------------------------------------------

    /// Clears the old group, issues a new token and describes the new one.
    fn show(&mut self, day: usize) -> GroupRequest {
        self.current_token = RequestToken(self.current_token.0 + 1);
        let sources = self.catalog.group(day).clone();

        self.frame = Frame {
            day: Some(day),
            layers: Vec::new(),
            raster: None,
        };
        if self.raster_enabled {
            self.frame.raster = sources.raster_url.as_deref().map(RasterOverlay::new);
        }

        debug!(day = day + 1, token = self.current_token.0, "showing forecast group");
        GroupRequest {
            token: self.current_token,
            day,
            bin_urls: sources.bin_urls,
            raster_url: if self.raster_enabled { sources.raster_url } else { None },
        }
    }

    fn clear(&mut self) {
        // Any in-flight results for the cleared group become stale.
        self.current_token = RequestToken(self.current_token.0 + 1);
        self.frame = Frame::default();
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Starts or resumes playback. Already playing is a no-op.
    pub fn play(&mut self, now: Instant) -> Option<GroupRequest> {
        if self.state == PlaybackState::Playing {
            return None;
        }

        self.state = PlaybackState::Playing;
        let request = self.frame.is_empty().then(|| self.show(self.index));
        self.arm(now);
        info!(day = self.index + 1, interval_ms = self.interval.as_millis() as u64, "forecast playing");
        request
    }

    /// Halts playback, keeping the current group on screen.
    pub fn pause(&mut self) {
        self.cancel_timer();
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    /// Halts playback, clears everything and rewinds to the first day.
    pub fn stop(&mut self) {
        self.cancel_timer();
        self.clear();
        self.state = PlaybackState::Stopped;
        self.index = 0;
    }

    pub fn next(&mut self) -> GroupRequest {
        self.step_manually((self.index + 1) % GROUP_COUNT)
    }

    pub fn prev(&mut self) -> GroupRequest {
        self.step_manually((self.index + GROUP_COUNT - 1) % GROUP_COUNT)
    }

    fn step_manually(&mut self, index: usize) -> GroupRequest {
        self.cancel_timer();
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Stopped;
        }
        self.index = index;
        self.show(index)
    }

    /// Advances when the armed timer has expired.
    pub fn tick(&mut self, now: Instant) -> Option<GroupRequest> {
        let handle = self.timer?;
        if now < handle.deadline {
            return None;
        }
        self.fire(handle, now)
    }

    /// Fires a specific timer handle. Handles from a cancelled or re-armed
    /// timer are ignored.
    pub fn fire(&mut self, handle: TimerHandle, now: Instant) -> Option<GroupRequest> {
        if self.state != PlaybackState::Playing || self.timer != Some(handle) {
            return None;
        }

        self.index = (self.index + 1) % GROUP_COUNT;
        let request = self.show(self.index);
        self.arm(now);
        Some(request)
    }

    /// Sets the frame interval, clamped to `MIN_INTERVAL`. While playing
    /// the timer is re-armed from `now` with the new interval.
    pub fn set_interval(&mut self, interval: Duration, now: Instant) {
        self.interval = interval.max(MIN_INTERVAL);
        if self.state == PlaybackState::Playing {
            self.arm(now);
        }
    }

    /// Turns the raster overlay on or off for the current group.
    ///
    /// Turning it on returns a request for the raster alone so the loader
    /// can report a missing image.
    pub fn set_raster(&mut self, enabled: bool) -> Option<GroupRequest> {
        self.raster_enabled = enabled;

        if !enabled {
            self.frame.raster = None;
            return None;
        }

        let day = self.frame.day?;
        let raster_url = self.catalog.group(day).raster_url.clone()?;
        self.frame.raster = Some(RasterOverlay::new(&raster_url));
        Some(GroupRequest {
            token: self.current_token,
            day,
            bin_urls: Vec::new(),
            raster_url: Some(raster_url),
        })
    }

    // -----------------------------------------------------------------------
    // Loader results
    // -----------------------------------------------------------------------

    pub fn apply(&mut self, result: LoadResult) -> ApplyOutcome {
        if result.token != self.current_token || self.frame.day != Some(result.day) {
            debug!(token = result.token.0, current = self.current_token.0, "discarding stale forecast result");
            return ApplyOutcome::Stale;
        }

        match result.item {
            LoadItem::Bin { bin, result: Ok(data) } => {
                self.frame.layers.push(BinLayer { bin, style: bin_style(bin), data });
                self.frame.layers.sort_by_key(|l| l.bin);
                ApplyOutcome::Applied
            }
            LoadItem::Bin { bin, result: Err(e) } => {
                warn!(day = result.day + 1, bin = bin + 1, error = %e, "forecast bin missing");
                ApplyOutcome::BinSkipped
            }
            LoadItem::Raster { result: Ok(()) } => ApplyOutcome::Applied,
            LoadItem::Raster { result: Err(e) } => {
                warn!(day = result.day + 1, error = %e, "raster frame failed to load");
                ApplyOutcome::RasterFailed(result.day + 1)
            }
        }
    }
}
