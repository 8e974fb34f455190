// Watched cases and record filtering.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use tracing::debug;

use docketwatch_common::{ConfigError, FilingRecord, WatchEntry};

/// Snapshot of the cases of interest, keyed by court then by the numeric
/// case id from the docket link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Watchlist {
    cases: HashMap<String, HashMap<u64, String>>,
}

impl Watchlist {
    /// Later entries for the same (court, number) replace earlier aliases.
    pub fn from_entries(entries: impl IntoIterator<Item = WatchEntry>) -> Self {
        let mut cases: HashMap<String, HashMap<u64, String>> = HashMap::new();
        for entry in entries {
            cases
                .entry(entry.court)
                .or_default()
                .insert(entry.number, entry.alias);
        }
        Self { cases }
    }

    /// Every court with at least one watched case. These are the sources
    /// the scheduler polls.
    pub fn courts(&self) -> BTreeSet<String> {
        self.cases
            .iter()
            .filter(|(_, cases)| !cases.is_empty())
            .map(|(court, _)| court.clone())
            .collect()
    }

    pub fn lookup(&self, court: &str, number: u64) -> Option<&str> {
        self.cases
            .get(court)
            .and_then(|cases| cases.get(&number))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cases.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decides which extracted records from a source are of interest. May
/// rewrite the record (e.g. substitute a display alias).
pub trait RecordFilter: Send + Sync {
    fn admit(&self, source: &str, record: &mut FilingRecord) -> bool;
}

impl RecordFilter for Watchlist {
    fn admit(&self, source: &str, record: &mut FilingRecord) -> bool {
        match self.lookup(source, record.pacer_num) {
            Some(alias) => {
                if !alias.is_empty() {
                    record.case_name = alias.to_string();
                }
                true
            }
            None => false,
        }
    }
}

/// Admits nothing. Used for calibration and for courts with no entries.
pub struct RejectAll;

impl RecordFilter for RejectAll {
    fn admit(&self, _source: &str, _record: &mut FilingRecord) -> bool {
        false
    }
}

/// Where the watchlist comes from. Loaded again on every scheduler tick.
pub trait WatchlistStore: Send + Sync {
    fn load(&self) -> Result<Watchlist, ConfigError>;
}

/// JSON case list: `[{"court": "ilnd", "number": 284511, "name": "Prenda v. Godfread"}]`.
pub struct JsonCaseList {
    path: PathBuf,
}

impl JsonCaseList {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WatchlistStore for JsonCaseList {
    fn load(&self) -> Result<Watchlist, ConfigError> {
        let shown = self.path.display().to_string();
        let content = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: shown.clone(),
            source,
        })?;
        let entries: Vec<WatchEntry> =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: shown.clone(),
                message: e.to_string(),
            })?;
        let watchlist = Watchlist::from_entries(entries);
        debug!(path = %shown, cases = watchlist.len(), "Loaded case list");
        Ok(watchlist)
    }
}

/// Fixed watchlist, e.g. when no case list is configured.
#[derive(Default)]
pub struct StaticWatchlist(pub Watchlist);

impl WatchlistStore for StaticWatchlist {
    fn load(&self) -> Result<Watchlist, ConfigError> {
        Ok(self.0.clone())
    }
}
