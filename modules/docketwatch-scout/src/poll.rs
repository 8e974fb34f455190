// One incremental poll of one court feed.
//
// Fetch, correct the feed's self-reported update time, walk entries newer
// than the watermark, filter, merge by link, and dispatch oldest first.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};

use docketwatch_feeds::{FeedError, FeedSource};
use docketwatch_notify::Dispatcher;

use crate::extractor::extract;
use crate::merge::{MergeBuffer, Merged};
use crate::watchlist::RecordFilter;

#[derive(Error, Debug)]
pub enum PollError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("feed for {court} has no update time and no dated entries")]
    MissingUpdateTime { court: String },
}

impl PollError {
    /// Retryable failures back off; the rest are retried after one check
    /// interval.
    pub fn is_retryable(&self) -> bool {
        match self {
            PollError::Feed(e) => e.is_retryable(),
            PollError::MissingUpdateTime { .. } => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    /// Feed update time after freshness correction. The caller's next
    /// watermark.
    pub watermark: DateTime<Utc>,
    /// What the feed itself claimed, if anything.
    pub claimed: Option<DateTime<Utc>>,
    /// The feed under-reported (or omitted) its update time.
    pub corrected: bool,
    /// Entries newer than the previous watermark.
    pub new_entries: usize,
    /// Records that passed the filter, after merging.
    pub dispatched: usize,
    /// Dispatched records with at least one failed sink.
    pub partially_failed: usize,
}

pub async fn poll_source(
    feeds: &dyn FeedSource,
    court: &str,
    watermark: DateTime<Utc>,
    filter: &dyn RecordFilter,
    dispatcher: &Dispatcher,
) -> Result<PollOutcome, PollError> {
    let feed = feeds.fetch(court).await?;
    let newest = feed.newest_entry_time();

    let (updated_at, corrected) = match (feed.updated, newest) {
        (Some(claimed), Some(latest)) if latest > claimed => {
            debug!(
                court,
                claimed = %claimed,
                latest = %latest,
                "Using newest entry over claimed update time"
            );
            (latest, true)
        }
        (Some(claimed), _) => (claimed, false),
        (None, Some(latest)) => {
            debug!(court, latest = %latest, "Feed has no update time, using newest entry");
            (latest, true)
        }
        (None, None) => {
            return Err(PollError::MissingUpdateTime {
                court: court.to_string(),
            })
        }
    };

    let mut outcome = PollOutcome {
        watermark: updated_at,
        claimed: feed.updated,
        corrected,
        new_entries: 0,
        dispatched: 0,
        partially_failed: 0,
    };

    if updated_at <= watermark {
        debug!(court, updated = %updated_at, "Feed not updated");
        return Ok(outcome);
    }

    let mut buffer = MergeBuffer::new();
    for entry in &feed.entries {
        let Some(filed_at) = entry.published else {
            debug!(court, entry = %entry.id, "Skipping undated entry");
            continue;
        };
        if filed_at <= watermark {
            break;
        }
        outcome.new_entries += 1;

        let mut record = extract(entry, filed_at);
        if !filter.admit(court, &mut record) {
            continue;
        }
        if buffer.push(record) == Merged::Duplicate {
            debug!(court, entry = %entry.id, "Dropping repeated title for same document");
        }
    }
    debug!(court, new_entries = outcome.new_entries, matched = buffer.len(), "Read new entries");

    for record in buffer.drain_chronological() {
        info!(
            court,
            case = %record.case,
            number = record.number,
            title = %record.title,
            "Reporting filing"
        );
        let report = dispatcher.dispatch(&record).await;
        outcome.dispatched += 1;
        if !report.all_ok() {
            outcome.partially_failed += 1;
        }
    }

    Ok(outcome)
}
