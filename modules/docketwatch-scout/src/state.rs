use chrono::{DateTime, Duration, Utc};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcePhase {
    /// First contact: establishing the watermark without notifying.
    Calibrating,
    /// Waiting for `next_due`.
    Scheduled,
    /// A poll cycle is in flight.
    Checking,
}

/// Per-court polling state. `next_due` is never left in the past after an
/// update, and the watermark only moves forward once calibrated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceState {
    pub court: String,
    pub watermark: DateTime<Utc>,
    pub next_due: DateTime<Utc>,
    /// Multiplier applied to the check interval after transient failures.
    pub backoff: u32,
    pub phase: SourcePhase,
}

impl SourceState {
    /// A source that has just been calibrated against its feed.
    pub fn calibrated(
        court: impl Into<String>,
        watermark: DateTime<Utc>,
        now: DateTime<Utc>,
        scrape_interval: Duration,
    ) -> Self {
        let mut state = Self {
            court: court.into(),
            watermark,
            next_due: now,
            backoff: 1,
            phase: SourcePhase::Calibrating,
        };
        state.schedule_after_update(now, scrape_interval);
        state
    }

    /// A source picked up from a saved checkpoint: due straight away, so
    /// anything filed while we were down is reported on the first tick.
    pub fn resumed(
        court: impl Into<String>,
        watermark: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            court: court.into(),
            watermark,
            next_due: now,
            backoff: 1,
            phase: SourcePhase::Scheduled,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.phase == SourcePhase::Scheduled && now >= self.next_due
    }

    pub fn begin_check(&mut self) {
        self.phase = SourcePhase::Checking;
    }

    /// Feeds update on a roughly fixed cadence, so the next check is aimed
    /// one scrape interval after the last update.
    pub fn record_success(
        &mut self,
        watermark: DateTime<Utc>,
        now: DateTime<Utc>,
        scrape_interval: Duration,
    ) {
        self.watermark = self.watermark.max(watermark);
        self.backoff = 1;
        self.schedule_after_update(now, scrape_interval);
    }

    /// Network-class failure: push the next check out by the current
    /// multiplier, then double it for next time.
    pub fn record_transient_failure(
        &mut self,
        now: DateTime<Utc>,
        check_interval: Duration,
        max_backoff: u32,
    ) {
        let delay = check_interval * i32::try_from(self.backoff).unwrap_or(i32::MAX);
        self.next_due += delay;
        if self.next_due < now {
            self.next_due = now + delay;
        }
        self.backoff = self.backoff.saturating_mul(2).min(max_backoff.max(1));
        self.phase = SourcePhase::Scheduled;
        debug!(
            court = %self.court,
            backoff = self.backoff,
            next_due = %self.next_due,
            "Backing off"
        );
    }

    /// Anything else: try again one check interval from now, without
    /// touching the watermark or the backoff.
    pub fn record_internal_failure(&mut self, now: DateTime<Utc>, check_interval: Duration) {
        self.next_due = now + check_interval;
        self.phase = SourcePhase::Scheduled;
    }

    fn schedule_after_update(&mut self, now: DateTime<Utc>, scrape_interval: Duration) {
        self.next_due = self.watermark + scrape_interval;
        if self.next_due < now {
            self.next_due = now + scrape_interval;
        }
        self.phase = SourcePhase::Scheduled;
    }
}
