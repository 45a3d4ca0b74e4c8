/// Telemetry refresh: primary JSON source, CSV fallback, scheduling and
/// connectivity tracking.
///
/// One refresh tries the primary source, falls back to the sheet export
/// when the primary fails, and forwards whichever record set arrived to the
/// station store exactly once. When both fail the store keeps its last good
/// snapshot and the user gets a transient notice.

use crate::ingest::{sheet, telemetry};
use crate::model::{DashboardError, StationRecord};
use crate::notice::{NoticeBoard, MSG_DATA_CONNECTION_LOST, MSG_OFFLINE, MSG_RESTORED};
use crate::station_store::{SnapshotUpdate, StationStore};
use chrono::{DateTime, Utc};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use threadpool::ThreadPool;
use tracing::{debug, error, info, warn};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
pub const RECOVERY_REFRESH_DELAY: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Anything that can produce a full set of station records.
pub trait TelemetrySource: Send {
    fn name(&self) -> &str;

    fn fetch(&self) -> Result<Vec<StationRecord>, DashboardError>;

    /// Lightweight reachability check used while offline.
    fn probe(&self) -> Result<(), DashboardError> {
        self.fetch().map(|_| ())
    }
}

/// Primary source: JSON array of station objects.
pub struct JsonApiSource {
    client: reqwest::blocking::Client,
    url: String,
}

impl JsonApiSource {
    pub fn new(client: reqwest::blocking::Client, url: &str) -> Self {
        Self { client, url: url.to_string() }
    }
}

impl TelemetrySource for JsonApiSource {
    fn name(&self) -> &str {
        "telemetry-api"
    }

    fn fetch(&self) -> Result<Vec<StationRecord>, DashboardError> {
        telemetry::fetch_stations(&self.client, &self.url)
    }

    fn probe(&self) -> Result<(), DashboardError> {
        let response = self.client.head(&self.url).send()?;
        // Some script hosts reject HEAD; any response at all proves we are online.
        debug!(status = response.status().as_u16(), "connectivity probe answered");
        Ok(())
    }
}

/// Fallback source: the published sheet's CSV export.
pub struct SheetCsvSource {
    client: reqwest::blocking::Client,
    url: String,
}

impl SheetCsvSource {
    pub fn new(client: reqwest::blocking::Client, url: &str) -> Self {
        Self { client, url: url.to_string() }
    }
}

impl TelemetrySource for SheetCsvSource {
    fn name(&self) -> &str {
        "sheet-csv"
    }

    fn fetch(&self) -> Result<Vec<StationRecord>, DashboardError> {
        sheet::fetch_sheet(&self.client, &self.url)
    }
}

// ---------------------------------------------------------------------------
// Ingestor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Primary,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied { source: SourceKind, update: SnapshotUpdate },
    /// Nothing reached the store; the last good snapshot stays in place.
    Failed { offline: bool },
}

impl RefreshOutcome {
    /// True when markers and buffers must be rebuilt.
    pub fn needs_render(&self) -> bool {
        matches!(self, RefreshOutcome::Applied { update: SnapshotUpdate::Updated, .. })
    }
}

pub struct TelemetryIngestor {
    primary: Option<Box<dyn TelemetrySource>>,
    fallback: Option<Box<dyn TelemetrySource>>,
    online: bool,
}

impl TelemetryIngestor {
    pub fn new(
        primary: Option<Box<dyn TelemetrySource>>,
        fallback: Option<Box<dyn TelemetrySource>>,
    ) -> Self {
        Self { primary, fallback, online: true }
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Refreshes straight into a store.
    pub fn refresh(
        &mut self,
        store: &mut StationStore,
        notices: &mut NoticeBoard,
        now: DateTime<Utc>,
    ) -> RefreshOutcome {
        self.refresh_with(notices, now, |records| store.replace_snapshot(records))
    }

    /// Fetches with fallback and hands the records to `apply` at most once.
    ///
    /// The daemon passes a closure that takes the store's write lock, so the
    /// lock is held for the swap and not for the network round trips.
    pub fn refresh_with<F>(
        &mut self,
        notices: &mut NoticeBoard,
        now: DateTime<Utc>,
        apply: F,
    ) -> RefreshOutcome
    where
        F: FnOnce(Vec<StationRecord>) -> SnapshotUpdate,
    {
        let mut all_connectivity = true;

        if let Some(primary) = &self.primary {
            match primary.fetch() {
                Ok(records) => return self.applied(SourceKind::Primary, records, notices, apply),
                Err(e) => {
                    warn!(source = primary.name(), error = %e, "primary telemetry fetch failed, trying fallback");
                    all_connectivity &= e.is_connectivity();
                }
            }
        }

        let Some(fallback) = &self.fallback else {
            let e = DashboardError::MissingDependency("CSV fallback source".to_string());
            error!(error = %e, "no telemetry fallback configured");
            notices.error("Critical library missing: CSV fallback source", now);
            notices.warning(MSG_DATA_CONNECTION_LOST, now);
            return RefreshOutcome::Failed { offline: false };
        };

        match fallback.fetch() {
            Ok(records) => self.applied(SourceKind::Fallback, records, notices, apply),
            Err(e) => {
                warn!(source = fallback.name(), error = %e, "fallback telemetry fetch failed");
                all_connectivity &= e.is_connectivity();
                notices.warning(MSG_DATA_CONNECTION_LOST, now);

                if all_connectivity && self.online {
                    error!("both telemetry sources unreachable, marking service offline");
                    self.online = false;
                    notices.error(MSG_OFFLINE, now);
                }
                RefreshOutcome::Failed { offline: !self.online }
            }
        }
    }

    fn applied<F>(
        &mut self,
        source: SourceKind,
        records: Vec<StationRecord>,
        notices: &mut NoticeBoard,
        apply: F,
    ) -> RefreshOutcome
    where
        F: FnOnce(Vec<StationRecord>) -> SnapshotUpdate,
    {
        let count = records.len();
        let update = apply(records);
        info!(?source, stations = count, ?update, "telemetry refreshed");

        if !self.online {
            self.online = true;
            notices.clear_message(MSG_OFFLINE);
        }
        RefreshOutcome::Applied { source, update }
    }

    /// While offline, checks whether a source answers again. On the first
    /// success the offline notice is replaced by the "restored" warning and
    /// the schedule gets its recovery refresh.
    pub fn probe_connectivity(
        &mut self,
        notices: &mut NoticeBoard,
        schedule: &mut RefreshSchedule,
        now: DateTime<Utc>,
        at: Instant,
    ) -> bool {
        if self.online {
            return true;
        }
        let restored = self.probe(notices, now);
        if restored {
            schedule.schedule_recovery(at);
        }
        restored
    }

    /// Probes once while offline. True only when this call brought the
    /// service back online; the caller owns the recovery refresh.
    pub fn probe(&mut self, notices: &mut NoticeBoard, now: DateTime<Utc>) -> bool {
        if self.online {
            return false;
        }

        let Some(source) = self.primary.as_ref().or(self.fallback.as_ref()) else {
            return false;
        };

        match source.probe() {
            Ok(()) => {
                info!(source = source.name(), "connectivity restored");
                self.online = true;
                notices.clear_message(MSG_OFFLINE);
                notices.warning(MSG_RESTORED, now);
                true
            }
            Err(e) => {
                debug!(error = %e, "still offline");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// Work for the telemetry thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryJob {
    Refresh,
    /// Connectivity probe requested at `at`; a recovery refresh is timed
    /// from that instant.
    Probe { at: Instant },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryEvent {
    Refreshed(RefreshOutcome),
    Probed { restored: bool, at: Instant },
}

/// What a finished job sends back to the main loop.
#[derive(Debug, Clone)]
pub struct TelemetryReport {
    pub event: TelemetryEvent,
    pub online: bool,
    /// Notices raised while the job ran, to be absorbed by the loop's board.
    pub notices: NoticeBoard,
}

type ApplyFn = dyn Fn(Vec<StationRecord>) -> SnapshotUpdate + Send + Sync;

/// Runs refreshes and probes off the main loop.
///
/// A single pool thread owns the ingestor, so jobs run one at a time in
/// submission order. Records go straight to `apply`; everything else comes
/// back as a `TelemetryReport` on the receiver returned by `new`.
pub struct TelemetryWorker {
    pool: ThreadPool,
    ingestor: Arc<Mutex<TelemetryIngestor>>,
    apply: Arc<ApplyFn>,
    tx: Sender<TelemetryReport>,
}

impl TelemetryWorker {
    pub fn new<F>(ingestor: TelemetryIngestor, apply: F) -> (Self, Receiver<TelemetryReport>)
    where
        F: Fn(Vec<StationRecord>) -> SnapshotUpdate + Send + Sync + 'static,
    {
        let (tx, rx) = channel();
        let worker = Self {
            pool: ThreadPool::with_name("telemetry".to_string(), 1),
            ingestor: Arc::new(Mutex::new(ingestor)),
            apply: Arc::new(apply),
            tx,
        };
        (worker, rx)
    }

    /// Queues a job. Returns immediately.
    pub fn submit(&self, job: TelemetryJob) {
        debug!(?job, "queueing telemetry job");
        let ingestor = Arc::clone(&self.ingestor);
        let apply = Arc::clone(&self.apply);
        let tx = self.tx.clone();

        self.pool.execute(move || {
            let mut ingestor = ingestor.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let mut notices = NoticeBoard::new();
            let now = Utc::now();

            let event = match job {
                TelemetryJob::Refresh => {
                    TelemetryEvent::Refreshed(ingestor.refresh_with(&mut notices, now, |records| apply(records)))
                }
                TelemetryJob::Probe { at } => TelemetryEvent::Probed {
                    restored: ingestor.probe(&mut notices, now),
                    at,
                },
            };

            // Receiver gone means the daemon is shutting down.
            let _ = tx.send(TelemetryReport { event, online: ingestor.is_online(), notices });
        });
    }

    /// Blocks until every queued job has finished and reported.
    pub fn wait_idle(&self) {
        self.pool.join();
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// When the next telemetry refresh is due: immediately at startup, then on
/// a fixed interval, plus one extra refresh shortly after recovery.
#[derive(Debug, Clone)]
pub struct RefreshSchedule {
    interval: Duration,
    next_due: Instant,
    recovery_due: Option<Instant>,
}

impl RefreshSchedule {
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self { interval, next_due: start, recovery_due: None }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next_due || self.recovery_due.is_some_and(|t| now >= t)
    }

    /// Records a refresh attempt (successful or not) made at `now`.
    pub fn mark_refreshed(&mut self, now: Instant) {
        self.next_due = now + self.interval;
        self.recovery_due = None;
    }

    pub fn schedule_recovery(&mut self, now: Instant) {
        self.recovery_due = Some(now + RECOVERY_REFRESH_DELAY);
    }

    /// Earliest instant at which `is_due` turns true.
    pub fn next_deadline(&self) -> Instant {
        match self.recovery_due {
            Some(t) if t < self.next_due => t,
            _ => self.next_due,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StaticSource {
        result: fn() -> Result<Vec<StationRecord>, DashboardError>,
        calls: Arc<AtomicUsize>,
    }

    impl TelemetrySource for StaticSource {
        fn name(&self) -> &str {
            "static"
        }
        fn fetch(&self) -> Result<Vec<StationRecord>, DashboardError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    fn source(
        result: fn() -> Result<Vec<StationRecord>, DashboardError>,
    ) -> (Box<dyn TelemetrySource>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (Box::new(StaticSource { result, calls: Arc::clone(&calls) }), calls)
    }

    fn two_stations() -> Result<Vec<StationRecord>, DashboardError> {
        Ok(vec![
            StationRecord::new("A", GeoPoint::located(14.1, 121.1)).with_warning("1"),
            StationRecord::new("B", GeoPoint::located(14.5, 121.4)),
        ])
    }

    fn offline() -> Result<Vec<StationRecord>, DashboardError> {
        Err(DashboardError::Network("dns error".into()))
    }

    fn server_error() -> Result<Vec<StationRecord>, DashboardError> {
        Err(DashboardError::Http(500))
    }

    #[test]
    fn test_primary_success_skips_fallback() {
        let (primary, _) = source(two_stations);
        let (fallback, fallback_calls) = source(two_stations);
        let mut ingestor = TelemetryIngestor::new(Some(primary), Some(fallback));
        let mut store = StationStore::new();
        let mut notices = NoticeBoard::new();

        let outcome = ingestor.refresh(&mut store, &mut notices, Utc::now());
        assert_eq!(
            outcome,
            RefreshOutcome::Applied { source: SourceKind::Primary, update: SnapshotUpdate::Updated }
        );
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_fallback_applies_exactly_once() {
        let (primary, _) = source(server_error);
        let (fallback, _) = source(two_stations);
        let mut ingestor = TelemetryIngestor::new(Some(primary), Some(fallback));
        let mut notices = NoticeBoard::new();
        let applied = Cell::new(0);

        let outcome = ingestor.refresh_with(&mut notices, Utc::now(), |records| {
            applied.set(applied.get() + 1);
            assert_eq!(records.len(), 2);
            SnapshotUpdate::Updated
        });

        assert_eq!(applied.get(), 1);
        assert!(outcome.needs_render());
        assert!(notices.active(Utc::now()).is_empty());
    }

    #[test]
    fn test_both_failing_leaves_store_and_raises_warning() {
        let (primary, _) = source(server_error);
        let (fallback, _) = source(server_error);
        let mut ingestor = TelemetryIngestor::new(Some(primary), Some(fallback));
        let mut store = StationStore::new();
        store.replace_snapshot(two_stations().unwrap());
        let generation = store.generation();
        let mut notices = NoticeBoard::new();
        let now = Utc::now();

        let outcome = ingestor.refresh(&mut store, &mut notices, now);
        assert_eq!(outcome, RefreshOutcome::Failed { offline: false });
        assert_eq!(store.generation(), generation);
        assert_eq!(store.len(), 2);

        let active = notices.active(now);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].message, MSG_DATA_CONNECTION_LOST);
    }

    #[test]
    fn test_unchanged_snapshot_does_not_need_render() {
        let (primary, _) = source(two_stations);
        let mut ingestor = TelemetryIngestor::new(Some(primary), None);
        let mut store = StationStore::new();
        let mut notices = NoticeBoard::new();

        assert!(ingestor.refresh(&mut store, &mut notices, Utc::now()).needs_render());
        assert!(!ingestor.refresh(&mut store, &mut notices, Utc::now()).needs_render());
    }

    #[test]
    fn test_missing_fallback_is_persistent_error() {
        let (primary, _) = source(server_error);
        let mut ingestor = TelemetryIngestor::new(Some(primary), None);
        let mut store = StationStore::new();
        let mut notices = NoticeBoard::new();
        let now = Utc::now();

        ingestor.refresh(&mut store, &mut notices, now);
        let later = now + chrono::Duration::minutes(10);
        let messages: Vec<String> =
            notices.active(later).into_iter().map(|n| n.message).collect();
        assert_eq!(messages, ["Critical library missing: CSV fallback source"]);
    }

    #[test]
    fn test_transport_failures_mark_offline_then_probe_restores() {
        let (primary, _) = source(offline);
        let (fallback, _) = source(offline);
        let mut ingestor = TelemetryIngestor::new(Some(primary), Some(fallback));
        let mut store = StationStore::new();
        let mut notices = NoticeBoard::new();
        let now = Utc::now();

        let outcome = ingestor.refresh(&mut store, &mut notices, now);
        assert_eq!(outcome, RefreshOutcome::Failed { offline: true });
        assert!(!ingestor.is_online());
        assert!(notices.active(now).iter().any(|n| n.message == MSG_OFFLINE));

        // Swap in a reachable primary to simulate the network coming back.
        let (reachable, _) = source(two_stations);
        ingestor.primary = Some(reachable);

        let start = Instant::now();
        let mut schedule = RefreshSchedule::new(DEFAULT_REFRESH_INTERVAL, start);
        schedule.mark_refreshed(start);
        assert!(ingestor.probe_connectivity(&mut notices, &mut schedule, now, start));

        assert!(ingestor.is_online());
        let messages: Vec<String> = notices.active(now).into_iter().map(|n| n.message).collect();
        assert!(messages.contains(&MSG_RESTORED.to_string()));
        assert!(!messages.contains(&MSG_OFFLINE.to_string()));
        assert_eq!(schedule.next_deadline(), start + RECOVERY_REFRESH_DELAY);
    }

    #[test]
    fn test_schedule_startup_interval_and_recovery() {
        let start = Instant::now();
        let mut schedule = RefreshSchedule::new(DEFAULT_REFRESH_INTERVAL, start);
        assert!(schedule.is_due(start));

        schedule.mark_refreshed(start);
        assert!(!schedule.is_due(start + Duration::from_secs(59)));
        assert!(schedule.is_due(start + Duration::from_secs(60)));

        let restored_at = start + Duration::from_secs(10);
        schedule.schedule_recovery(restored_at);
        assert!(!schedule.is_due(restored_at + Duration::from_millis(1999)));
        assert!(schedule.is_due(restored_at + RECOVERY_REFRESH_DELAY));

        schedule.mark_refreshed(restored_at + RECOVERY_REFRESH_DELAY);
        assert_eq!(
            schedule.next_deadline(),
            restored_at + RECOVERY_REFRESH_DELAY + DEFAULT_REFRESH_INTERVAL
        );
    }

    #[test]
    fn test_worker_applies_off_thread_and_reports() {
        let (primary, calls) = source(two_stations);
        let ingestor = TelemetryIngestor::new(Some(primary), None);
        let store = Arc::new(Mutex::new(StationStore::new()));
        let sink = Arc::clone(&store);
        let (worker, reports) = TelemetryWorker::new(ingestor, move |records| {
            sink.lock().expect("store lock").replace_snapshot(records)
        });

        worker.submit(TelemetryJob::Refresh);
        worker.wait_idle();

        let report = reports.try_recv().expect("report");
        assert_eq!(
            report.event,
            TelemetryEvent::Refreshed(RefreshOutcome::Applied {
                source: SourceKind::Primary,
                update: SnapshotUpdate::Updated,
            })
        );
        assert!(report.online);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.lock().expect("store lock").len(), 2);
    }

    #[test]
    fn test_worker_probe_reports_restoration() {
        let (primary, _) = source(offline);
        let (fallback, _) = source(offline);
        let ingestor = TelemetryIngestor::new(Some(primary), Some(fallback));
        let (worker, reports) = TelemetryWorker::new(ingestor, |_| SnapshotUpdate::Updated);

        worker.submit(TelemetryJob::Refresh);
        let at = Instant::now();
        worker.submit(TelemetryJob::Probe { at });
        worker.wait_idle();

        let refreshed = reports.try_recv().expect("refresh report");
        assert_eq!(refreshed.event, TelemetryEvent::Refreshed(RefreshOutcome::Failed { offline: true }));
        assert!(refreshed.notices.active(Utc::now()).iter().any(|n| n.message == MSG_OFFLINE));

        let probed = reports.try_recv().expect("probe report");
        assert_eq!(probed.event, TelemetryEvent::Probed { restored: false, at });
        assert!(!probed.online);
    }
}
