// Control loop over all watched courts.
//
// Each tick: reload the watchlist, resume or calibrate newly referenced
// courts, drop removed ones, then run a poll cycle for every court that is
// due. Courts are checked one after another, so a court's cycles never
// overlap.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Duration;
use futures::FutureExt;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use docketwatch_common::ScheduleConfig;
use docketwatch_feeds::FeedSource;
use docketwatch_notify::Dispatcher;

use crate::checkpoint::{Checkpoint, Watermarks};
use crate::clock::Clock;
use crate::poll::{poll_source, PollError, PollOutcome};
use crate::state::SourceState;
use crate::watchlist::{RejectAll, Watchlist, WatchlistStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSettings {
    /// Expected cadence of court feed updates.
    pub scrape_interval: Duration,
    /// Sleep between ticks, and the base unit for backoff.
    pub check_interval: Duration,
    pub max_backoff: u32,
}

impl From<&ScheduleConfig> for ScheduleSettings {
    fn from(config: &ScheduleConfig) -> Self {
        Self {
            scrape_interval: config.scrape_interval(),
            check_interval: config.check_interval(),
            max_backoff: config.max_backoff,
        }
    }
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self::from(&ScheduleConfig::default())
    }
}

/// What one tick did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub paused: bool,
    pub added: Vec<String>,
    /// Added from a saved checkpoint rather than calibrated.
    pub resumed: Vec<String>,
    pub removed: Vec<String>,
    pub checked: Vec<String>,
    /// Checks that hit a retryable failure and were backed off.
    pub retrying: Vec<String>,
    /// Checks that failed for any other reason.
    pub failed: Vec<String>,
    pub dispatched: usize,
}

pub struct Scheduler {
    feeds: Arc<dyn FeedSource>,
    dispatcher: Dispatcher,
    store: Arc<dyn WatchlistStore>,
    clock: Arc<dyn Clock>,
    settings: ScheduleSettings,
    pause_file: Option<PathBuf>,
    checkpoint: Option<Checkpoint>,
    /// Watermarks from the last run, consumed as their courts are added.
    saved: Watermarks,
    /// Swapped wholesale on reload, never mutated.
    watchlist: Arc<Watchlist>,
    sources: BTreeMap<String, SourceState>,
}

impl Scheduler {
    pub fn new(
        feeds: Arc<dyn FeedSource>,
        dispatcher: Dispatcher,
        store: Arc<dyn WatchlistStore>,
        clock: Arc<dyn Clock>,
        settings: ScheduleSettings,
    ) -> Self {
        Self {
            feeds,
            dispatcher,
            store,
            clock,
            settings,
            pause_file: None,
            checkpoint: None,
            saved: Watermarks::new(),
            watchlist: Arc::new(Watchlist::default()),
            sources: BTreeMap::new(),
        }
    }

    pub fn with_pause_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.pause_file = Some(path.into());
        self
    }

    /// Resume from watermarks saved by a previous run and save them again
    /// after every tick. An unreadable checkpoint is ignored.
    pub fn with_checkpoint(mut self, checkpoint: Checkpoint) -> Self {
        match checkpoint.load() {
            Ok(saved) => {
                info!(
                    path = %checkpoint.path().display(),
                    courts = saved.len(),
                    "Loaded checkpoint"
                );
                self.saved = saved;
            }
            Err(e) => warn!(error = %e, "Failed to load checkpoint, recalibrating all courts"),
        }
        self.checkpoint = Some(checkpoint);
        self
    }

    pub fn source(&self, court: &str) -> Option<&SourceState> {
        self.sources.get(court)
    }

    pub fn sources(&self) -> impl Iterator<Item = &SourceState> {
        self.sources.values()
    }

    pub fn watchlist(&self) -> &Watchlist {
        &self.watchlist
    }

    pub async fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        if self.is_paused() {
            info!("Pause file present, skipping checks");
            report.paused = true;
            return report;
        }

        self.reload(&mut report).await;

        let now = self.clock.now();
        let due: Vec<String> = self
            .sources
            .values()
            .filter(|s| s.is_due(now))
            .map(|s| s.court.clone())
            .collect();

        // One snapshot for the whole tick.
        let watchlist = Arc::clone(&self.watchlist);
        for court in due {
            self.check(&court, &watchlist, &mut report).await;
        }

        self.save_checkpoint();
        report
    }

    /// Run until `shutdown` flips (or its sender goes away). An in-flight
    /// tick is abandoned rather than drained.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let pause = self
            .settings
            .check_interval
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(300));
        info!(
            sinks = ?self.dispatcher.sink_names(),
            check_every = ?pause,
            "Scheduler started"
        );

        loop {
            tokio::select! {
                report = self.tick() => {
                    debug!(?report, "Tick complete");
                }
                _ = shutdown.changed() => break,
            }
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!("Scheduler stopped");
    }

    async fn reload(&mut self, report: &mut TickReport) {
        match self.store.load() {
            Ok(watchlist) => self.watchlist = Arc::new(watchlist),
            Err(e) => warn!(error = %e, "Failed to reload watchlist, keeping previous snapshot"),
        }

        let wanted = self.watchlist.courts();

        let removed: Vec<String> = self
            .sources
            .keys()
            .filter(|court| !wanted.contains(*court))
            .cloned()
            .collect();
        for court in removed {
            self.sources.remove(&court);
            info!(court = %court, "Court no longer watched, dropping from schedule");
            report.removed.push(court);
        }

        for court in wanted {
            if self.sources.contains_key(&court) {
                continue;
            }
            if let Some(watermark) = self.saved.remove(&court) {
                let state = SourceState::resumed(court.as_str(), watermark, self.clock.now());
                info!(court = %court, watermark = %watermark, "Resuming from checkpoint");
                self.sources.insert(court.clone(), state);
                report.resumed.push(court.clone());
                report.added.push(court);
                continue;
            }
            let state = self.calibrate(&court).await;
            self.sources.insert(court.clone(), state);
            report.added.push(court);
        }
    }

    /// Poll once with nothing admitted and nothing dispatched, just to learn
    /// where the feed currently stands.
    async fn calibrate(&self, court: &str) -> SourceState {
        let now = self.clock.now();
        let noop = Dispatcher::noop();
        let result = guarded(poll_source(
            self.feeds.as_ref(),
            court,
            now,
            &RejectAll,
            &noop,
        ))
        .await;

        let watermark = match result {
            Ok(outcome) => outcome.watermark,
            Err(e) => {
                debug!(court, error = %e, "Calibration failed, starting from now");
                now
            }
        };

        let state = SourceState::calibrated(court, watermark, now, self.settings.scrape_interval);
        debug!(
            court,
            watermark = %state.watermark,
            next_due = %state.next_due,
            "Calibrated"
        );
        state
    }

    async fn check(&mut self, court: &str, filter: &Watchlist, report: &mut TickReport) {
        let Some(state) = self.sources.get_mut(court) else {
            return;
        };
        state.begin_check();
        let watermark = state.watermark;
        debug!(court, watermark = %watermark, "Checking");

        let result = guarded(poll_source(
            self.feeds.as_ref(),
            court,
            watermark,
            filter,
            &self.dispatcher,
        ))
        .await;

        let now = self.clock.now();
        let settings = self.settings;
        let Some(state) = self.sources.get_mut(court) else {
            return;
        };
        report.checked.push(court.to_string());

        match result {
            Ok(outcome) => {
                if let (true, Some(claimed)) = (outcome.corrected, outcome.claimed) {
                    warn!(
                        court,
                        claimed = %claimed,
                        latest = %outcome.watermark,
                        "Court is misreporting its update time, using newest entry"
                    );
                }
                state.record_success(outcome.watermark, now, settings.scrape_interval);
                report.dispatched += outcome.dispatched;
                info!(
                    court,
                    dispatched = outcome.dispatched,
                    partially_failed = outcome.partially_failed,
                    watermark = %state.watermark,
                    next_due = %state.next_due,
                    "Checked"
                );
            }
            Err(e) if e.is_retryable() => {
                state.record_transient_failure(now, settings.check_interval, settings.max_backoff);
                warn!(
                    court,
                    error = %e,
                    backoff = state.backoff,
                    next_due = %state.next_due,
                    "Feed unavailable, backing off"
                );
                report.retrying.push(court.to_string());
            }
            Err(e) => {
                state.record_internal_failure(now, settings.check_interval);
                error!(court, error = %e, next_due = %state.next_due, "Check failed");
                report.failed.push(court.to_string());
            }
        }
    }

    fn save_checkpoint(&self) {
        let Some(checkpoint) = &self.checkpoint else {
            return;
        };
        // Unclaimed entries are kept, so a tick that ran without a watchlist
        // doesn't erase them.
        let mut marks = self.saved.clone();
        marks.extend(self.sources.values().map(|s| (s.court.clone(), s.watermark)));
        if let Err(e) = checkpoint.save(&marks) {
            warn!(error = %e, "Failed to save checkpoint");
        }
    }

    fn is_paused(&self) -> bool {
        let Some(path) = &self.pause_file else {
            return false;
        };
        match std::fs::read_to_string(path) {
            Ok(content) => content
                .lines()
                .next()
                .is_some_and(|line| !line.trim().is_empty()),
            Err(_) => false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CheckError {
    #[error(transparent)]
    Poll(#[from] PollError),
    #[error("poll cycle panicked")]
    Panicked,
}

impl CheckError {
    fn is_retryable(&self) -> bool {
        match self {
            CheckError::Poll(e) => e.is_retryable(),
            CheckError::Panicked => false,
        }
    }
}

/// A panic inside one court's cycle becomes a non-retryable failure for
/// that court only.
async fn guarded(
    cycle: impl std::future::Future<Output = Result<PollOutcome, PollError>>,
) -> Result<PollOutcome, CheckError> {
    match AssertUnwindSafe(cycle).catch_unwind().await {
        Ok(result) => Ok(result?),
        Err(_) => Err(CheckError::Panicked),
    }
}
