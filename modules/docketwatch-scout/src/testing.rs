// Test mocks for the polling engine.
//
// One mock per trait boundary:
// - ScriptedFeeds (FeedSource): per-court queue of responses
// - RecordingSink / NumberedOnlySink / FailingSink (NotifySink)
// - ManualClock (Clock): settable "now"
// - ScriptedWatchlist (WatchlistStore): swappable entries or a load error
//
// Plus builders for PACER-shaped feed entries.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use docketwatch_common::{ConfigError, FilingRecord, RawEntry, RawFeed, WatchEntry};
use docketwatch_feeds::{FeedError, FeedSource};
use docketwatch_notify::{Delivery, NotifySink, SinkError};

use crate::clock::Clock;
use crate::watchlist::{Watchlist, WatchlistStore};

// ---------------------------------------------------------------------------
// Time helpers
// ---------------------------------------------------------------------------

/// Fixed base instant for tests: Mon Oct 07 12:00:00 2013 UTC.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2013, 10, 7, 12, 0, 0).unwrap()
}

/// `base_time()` plus `m` minutes.
pub fn minute(m: i64) -> DateTime<Utc> {
    base_time() + Duration::minutes(m)
}

// ---------------------------------------------------------------------------
// Feed builders
// ---------------------------------------------------------------------------

pub fn feed(updated: Option<DateTime<Utc>>, entries: Vec<RawEntry>) -> RawFeed {
    RawFeed { updated, entries }
}

/// Start a PACER-style entry for the docket with the given numeric case id.
pub fn entry(pacer_num: u64) -> EntryBuilder {
    EntryBuilder {
        court: "ilnd".to_string(),
        pacer_num,
        case: "1:13-cv-04341-JRT".to_string(),
        case_name: "Prenda Law, Inc. v. Godfread et al".to_string(),
        title: "Order".to_string(),
        number: None,
        document: None,
        published: None,
    }
}

pub struct EntryBuilder {
    court: String,
    pacer_num: u64,
    case: String,
    case_name: String,
    title: String,
    number: Option<u32>,
    document: Option<String>,
    published: Option<DateTime<Utc>>,
}

impl EntryBuilder {
    pub fn court(mut self, court: &str) -> Self {
        self.court = court.to_string();
        self
    }

    pub fn case(mut self, case: &str, name: &str) -> Self {
        self.case = case.to_string();
        self.case_name = name.to_string();
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn number(mut self, number: u32) -> Self {
        self.number = Some(number);
        self
    }

    /// Override the document id in the link, e.g. to make two entries point
    /// at the same document.
    pub fn document(mut self, id: &str) -> Self {
        self.document = Some(id.to_string());
        self
    }

    pub fn filed(mut self, at: DateTime<Utc>) -> Self {
        self.published = Some(at);
        self
    }

    pub fn undated(mut self) -> Self {
        self.published = None;
        self
    }

    pub fn build(self) -> RawEntry {
        let host = format!("https://ecf.{}.uscourts.gov", self.court);
        let docket = format!("{host}/cgi-bin/DktRpt.pl?{}", self.pacer_num);

        let summary = match self.number {
            Some(number) => {
                let doc = self
                    .document
                    .unwrap_or_else(|| format!("{}{number:04}", self.pacer_num));
                format!(
                    r#"[{}] (<a href="{host}/doc1/{doc}?caseid={}&amp;de_seq_num={number}">{number}</a>)"#,
                    self.title, self.pacer_num
                )
            }
            None => format!("[{}]", self.title),
        };

        RawEntry {
            title: format!("{} {}", self.case, self.case_name),
            summary,
            link: docket.clone(),
            id: format!("{docket}&amp;seq={}", self.number.unwrap_or_default()),
            published: self.published,
        }
    }
}

pub fn watch(court: &str, number: u64, alias: &str) -> WatchEntry {
    WatchEntry {
        court: court.to_string(),
        number,
        alias: alias.to_string(),
    }
}

// ---------------------------------------------------------------------------
// ScriptedFeeds
// ---------------------------------------------------------------------------

/// Queued responses per court. Once a court's queue is exhausted its
/// standing feed (if any) is returned; otherwise the fetch fails.
#[derive(Default)]
pub struct ScriptedFeeds {
    queued: Mutex<HashMap<String, VecDeque<Result<RawFeed, FeedError>>>>,
    standing: Mutex<HashMap<String, RawFeed>>,
    fetches: Mutex<HashMap<String, usize>>,
}

impl ScriptedFeeds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_feed(&self, court: &str, feed: RawFeed) {
        self.push(court, Ok(feed));
    }

    pub fn push_error(&self, court: &str, error: FeedError) {
        self.push(court, Err(error));
    }

    /// Returned whenever nothing is queued for `court`.
    pub fn set_standing(&self, court: &str, feed: RawFeed) {
        self.standing
            .lock()
            .unwrap()
            .insert(court.to_string(), feed);
    }

    pub fn fetches(&self, court: &str) -> usize {
        self.fetches
            .lock()
            .unwrap()
            .get(court)
            .copied()
            .unwrap_or(0)
    }

    fn push(&self, court: &str, response: Result<RawFeed, FeedError>) {
        self.queued
            .lock()
            .unwrap()
            .entry(court.to_string())
            .or_default()
            .push_back(response);
    }
}

#[async_trait]
impl FeedSource for ScriptedFeeds {
    async fn fetch(&self, court: &str) -> docketwatch_feeds::Result<RawFeed> {
        *self
            .fetches
            .lock()
            .unwrap()
            .entry(court.to_string())
            .or_default() += 1;

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(court)
            .and_then(VecDeque::pop_front);
        if let Some(response) = queued {
            return response;
        }

        self.standing
            .lock()
            .unwrap()
            .get(court)
            .cloned()
            .ok_or_else(|| FeedError::Transport(format!("no scripted response for {court}")))
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

pub type Recorded = Arc<Mutex<Vec<FilingRecord>>>;

/// Accepts everything and keeps a copy.
pub struct RecordingSink {
    name: &'static str,
    records: Recorded,
}

impl RecordingSink {
    pub fn new(name: &'static str) -> (Self, Recorded) {
        let records = Recorded::default();
        (
            Self {
                name,
                records: records.clone(),
            },
            records,
        )
    }
}

#[async_trait]
impl NotifySink for RecordingSink {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn deliver(&self, record: &FilingRecord) -> Result<Delivery, SinkError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(Delivery::Delivered)
    }
}

/// Like `RecordingSink`, but keyed on the document number.
pub struct NumberedOnlySink {
    records: Recorded,
}

impl NumberedOnlySink {
    pub fn new() -> (Self, Recorded) {
        let records = Recorded::default();
        (
            Self {
                records: records.clone(),
            },
            records,
        )
    }
}

#[async_trait]
impl NotifySink for NumberedOnlySink {
    fn name(&self) -> &'static str {
        "numbered_only"
    }

    fn requires_document_number(&self) -> bool {
        true
    }

    async fn deliver(&self, record: &FilingRecord) -> Result<Delivery, SinkError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(Delivery::Delivered)
    }
}

/// Fails every delivery and counts attempts.
#[derive(Default)]
pub struct FailingSink {
    attempts: Arc<Mutex<usize>>,
}

impl FailingSink {
    pub fn new() -> (Self, Arc<Mutex<usize>>) {
        let attempts = Arc::new(Mutex::new(0));
        (
            Self {
                attempts: attempts.clone(),
            },
            attempts,
        )
    }
}

#[async_trait]
impl NotifySink for FailingSink {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn deliver(&self, _record: &FilingRecord) -> Result<Delivery, SinkError> {
        *self.attempts.lock().unwrap() += 1;
        Err(SinkError::Rejected {
            service: "failing",
            status: 500,
            body: "scripted failure".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// ManualClock
// ---------------------------------------------------------------------------

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// ---------------------------------------------------------------------------
// ScriptedWatchlist
// ---------------------------------------------------------------------------

pub struct ScriptedWatchlist {
    current: Mutex<Result<Vec<WatchEntry>, String>>,
}

impl ScriptedWatchlist {
    pub fn new(entries: Vec<WatchEntry>) -> Self {
        Self {
            current: Mutex::new(Ok(entries)),
        }
    }

    pub fn set(&self, entries: Vec<WatchEntry>) {
        *self.current.lock().unwrap() = Ok(entries);
    }

    /// Make subsequent loads fail until `set` is called again.
    pub fn break_with(&self, message: &str) {
        *self.current.lock().unwrap() = Err(message.to_string());
    }
}

impl WatchlistStore for ScriptedWatchlist {
    fn load(&self) -> Result<Watchlist, ConfigError> {
        match &*self.current.lock().unwrap() {
            Ok(entries) => Ok(Watchlist::from_entries(entries.clone())),
            Err(message) => Err(ConfigError::Invalid(message.clone())),
        }
    }
}
