use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder for a text field that could not be extracted from a feed entry.
pub const UNKNOWN_TEXT: &str = "?";

/// Placeholder document number. Not a real docket position.
pub const UNNUMBERED: u32 = 0;

// =============================================================================
// Feed shapes
// =============================================================================

/// One feed entry as delivered by a court, before field extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub title: String,
    /// HTML snippet (RSS `<description>`).
    pub summary: String,
    pub link: String,
    /// RSS `<guid>`; for court feeds this is the docket URL plus query noise.
    pub id: String,
    pub published: Option<DateTime<Utc>>,
}

/// A parsed court feed. Entries are in delivery order (newest first).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFeed {
    /// Self-reported "last updated" time. Courts are known to misreport it.
    pub updated: Option<DateTime<Utc>>,
    pub entries: Vec<RawEntry>,
}

impl RawFeed {
    /// Filed time of the most recent dated entry.
    pub fn newest_entry_time(&self) -> Option<DateTime<Utc>> {
        self.entries.iter().find_map(|e| e.published)
    }
}

// =============================================================================
// Watchlist
// =============================================================================

/// One case of interest. Unique per (court, number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEntry {
    pub court: String,
    /// Court-internal numeric case id (the `DktRpt.pl?NNN` query value).
    pub number: u64,
    /// Human-readable override for the case name. Empty means keep the
    /// feed-provided name.
    #[serde(rename = "name", default)]
    pub alias: String,
}

// =============================================================================
// Filing records
// =============================================================================

/// One notifiable filing, produced by the extractor and consumed by sinks
/// within a single poll cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilingRecord {
    pub court: String,
    /// Canonical four-part docket identifier, e.g. `1:13-cv-04341`.
    pub case: String,
    pub case_name: String,
    /// Filing category text. Merged records carry `A // B`.
    pub title: String,
    /// Document position within the docket; [`UNNUMBERED`] when unknown.
    pub number: u32,
    /// Document URL, or the docket URL when the document is unnumbered.
    pub link: String,
    pub docket_link: String,
    /// Court-internal numeric case id; 0 when the link carried none.
    pub pacer_num: u64,
    pub filed_at: DateTime<Utc>,
}

/// Stable cross-reference key (LREF) for correlating with an external archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossReference {
    pub key: String,
    /// False when the document number is unknown and the key points nowhere.
    pub reliable: bool,
}

/// Predicted public-archive (RECAP) locations for a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLinks {
    pub case_url: String,
    pub document_url: String,
    /// False when the document number is unknown.
    pub document_reliable: bool,
}

impl FilingRecord {
    pub fn is_numbered(&self) -> bool {
        self.number != UNNUMBERED
    }

    /// Key used to coalesce entries for the same document within one pass.
    pub fn merge_key(&self) -> &str {
        &self.link
    }

    pub fn cross_reference(&self) -> CrossReference {
        CrossReference {
            key: format!(
                "gov.uscourts.{}.{}.{}.0",
                self.court,
                self.case.replace(':', "-"),
                self.number
            ),
            reliable: self.is_numbered(),
        }
    }

    /// Archive URLs are predictable before the document is uploaded, so none
    /// of these are verified.
    pub fn archive_links(&self) -> ArchiveLinks {
        let archive_case = format!("gov.uscourts.{}.{}", self.court, self.pacer_num);
        ArchiveLinks {
            case_url: format!("https://archive.org/details/{archive_case}"),
            document_url: format!(
                "https://archive.org/download/{archive_case}/{archive_case}.{}.0.pdf",
                self.number
            ),
            document_reliable: self.is_numbered(),
        }
    }
}

impl fmt::Display for FilingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let xref = self.cross_reference();
        let archive = self.archive_links();
        writeln!(f, "Case: {} ({})", self.case_name, self.court)?;
        writeln!(f, "Docket: {}", self.case)?;
        if self.is_numbered() {
            writeln!(f, "Document #: {}", self.number)?;
        } else {
            writeln!(f, "Document #: {UNKNOWN_TEXT}")?;
        }
        writeln!(f, "Title: {}", self.title)?;
        writeln!(f, "Filed: {}", format_time(&self.filed_at))?;
        writeln!(f, "Link: {}", self.link)?;
        writeln!(f, "Docket link: {}", self.docket_link)?;
        if xref.reliable {
            writeln!(f, "LREF: {}", xref.key)?;
        }
        writeln!(f, "Archive: {}", archive.case_url)?;
        if archive.document_reliable {
            writeln!(f, "Archive document: {}", archive.document_url)?;
        }
        Ok(())
    }
}

/// `Thu Jan 01 00:00:00 1970 UTC`
pub fn format_time(dt: &DateTime<Utc>) -> String {
    dt.format("%a %b %d %H:%M:%S %Y UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(number: u32) -> FilingRecord {
        FilingRecord {
            court: "ilnd".to_string(),
            case: "1:13-cv-04341".to_string(),
            case_name: "Prenda Law, Inc. v. Godfread et al".to_string(),
            title: "Motion to Dismiss".to_string(),
            number,
            link: "https://ecf.ilnd.uscourts.gov/doc1/067112345".to_string(),
            docket_link: "https://ecf.ilnd.uscourts.gov/cgi-bin/DktRpt.pl?284511".to_string(),
            pacer_num: 284511,
            filed_at: Utc.with_ymd_and_hms(2013, 10, 7, 18, 30, 0).unwrap(),
        }
    }

    #[test]
    fn cross_reference_replaces_colon() {
        let xref = record(12).cross_reference();
        assert_eq!(xref.key, "gov.uscourts.ilnd.1-13-cv-04341.12.0");
        assert!(xref.reliable);
    }

    #[test]
    fn unnumbered_record_flags_derived_identifiers() {
        let r = record(UNNUMBERED);
        assert!(!r.cross_reference().reliable);
        assert!(!r.archive_links().document_reliable);
    }

    #[test]
    fn archive_links_use_pacer_number() {
        let links = record(7).archive_links();
        assert_eq!(
            links.case_url,
            "https://archive.org/details/gov.uscourts.ilnd.284511"
        );
        assert_eq!(
            links.document_url,
            "https://archive.org/download/gov.uscourts.ilnd.284511/gov.uscourts.ilnd.284511.7.0.pdf"
        );
    }

    #[test]
    fn display_omits_meaningless_keys_for_unnumbered() {
        let text = record(UNNUMBERED).to_string();
        assert!(text.contains("Document #: ?"));
        assert!(!text.contains("LREF"));
        assert!(!text.contains("Archive document"));
    }

    #[test]
    fn newest_entry_time_skips_undated() {
        let t = Utc.with_ymd_and_hms(2014, 7, 11, 22, 0, 0).unwrap();
        let feed = RawFeed {
            updated: None,
            entries: vec![
                RawEntry::default(),
                RawEntry {
                    published: Some(t),
                    ..Default::default()
                },
            ],
        };
        assert_eq!(feed.newest_entry_time(), Some(t));
    }

    #[test]
    fn format_time_is_utc_ctime_style() {
        let t = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(format_time(&t), "Thu Jan 01 00:00:00 1970 UTC");
    }

    #[test]
    fn watch_entry_alias_defaults_to_empty() {
        let e: WatchEntry = serde_json::from_str(r#"{"court": "cand", "number": 254869}"#).unwrap();
        assert_eq!(e.alias, "");
    }
}
