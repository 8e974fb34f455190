// Field extraction for court RSS entries.
//
// Each field is pulled out independently. A field whose pattern doesn't match
// stays `None` here and becomes a sentinel ("?" or 0) only when the record is
// built, so gaps can still be logged.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::debug;

use docketwatch_common::{FilingRecord, RawEntry, UNKNOWN_TEXT, UNNUMBERED};

use crate::text::{clean_text, unescape};

static DOCUMENT_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="([^"?]*)(?:\?[^"]*)?""#).unwrap());
static DOCUMENT_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">([0-9]+)<").unwrap());
static BRACKETED_TITLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(.+)\]").unwrap());
static COURT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"ecf\.([a-z]+)\.").unwrap());
static PACER_NUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"DktRpt\.pl\?([0-9]+)").unwrap());

/// Raw extraction result before sentinels are applied.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractedFields {
    pub court: Option<String>,
    pub case: Option<String>,
    pub case_name: Option<String>,
    pub title: Option<String>,
    pub number: Option<u32>,
    pub document_link: Option<String>,
    pub docket_link: Option<String>,
    pub pacer_num: Option<u64>,
}

impl ExtractedFields {
    pub fn from_entry(entry: &RawEntry) -> Self {
        let mut title_tokens = entry.title.split_whitespace();
        let case = title_tokens.next().and_then(canonical_case);
        let case_name = Some(clean_text(&title_tokens.collect::<Vec<_>>().join(" ")))
            .filter(|s| !s.is_empty());

        Self {
            court: capture(&COURT, &entry.link),
            case,
            case_name,
            title: capture(&BRACKETED_TITLE, &entry.summary)
                .map(|t| clean_text(&t))
                .filter(|t| !t.is_empty()),
            number: capture(&DOCUMENT_NUMBER, &entry.summary).and_then(|n| n.parse().ok()),
            document_link: capture(&DOCUMENT_LINK, &entry.summary)
                .map(|l| unescape(&l))
                .filter(|l| !l.is_empty()),
            docket_link: docket_link(entry),
            pacer_num: capture(&PACER_NUM, &entry.link).and_then(|n| n.parse().ok()),
        }
    }

    /// Names of the fields that failed to extract.
    pub fn gaps(&self) -> Vec<&'static str> {
        let mut gaps = Vec::new();
        if self.court.is_none() {
            gaps.push("court");
        }
        if self.case.is_none() {
            gaps.push("case");
        }
        if self.case_name.is_none() {
            gaps.push("case_name");
        }
        if self.title.is_none() {
            gaps.push("title");
        }
        if self.number.is_none() {
            gaps.push("number");
        }
        if self.docket_link.is_none() {
            gaps.push("docket_link");
        }
        if self.pacer_num.is_none() {
            gaps.push("pacer_num");
        }
        gaps
    }

    /// Apply sentinels and pick the record's primary link: the document
    /// itself when it is numbered, otherwise the docket.
    pub fn into_record(self, filed_at: DateTime<Utc>) -> FilingRecord {
        let unknown = || UNKNOWN_TEXT.to_string();
        let number = self.number.unwrap_or(UNNUMBERED);
        let docket_link = self.docket_link.unwrap_or_else(unknown);
        let link = match self.document_link {
            Some(doc) if number != UNNUMBERED => doc,
            _ => docket_link.clone(),
        };

        FilingRecord {
            court: self.court.unwrap_or_else(unknown),
            case: self.case.unwrap_or_else(unknown),
            case_name: self.case_name.unwrap_or_else(unknown),
            title: self.title.unwrap_or_else(unknown),
            number,
            link,
            docket_link,
            pacer_num: self.pacer_num.unwrap_or(0),
            filed_at,
        }
    }
}

/// Build a filing record from one feed entry. Never fails; missing fields
/// come back as sentinels.
pub fn extract(entry: &RawEntry, filed_at: DateTime<Utc>) -> FilingRecord {
    let fields = ExtractedFields::from_entry(entry);
    let gaps = fields.gaps();
    if !gaps.is_empty() {
        debug!(entry = %entry.id, missing = ?gaps, "Incomplete entry");
    }
    fields.into_record(filed_at)
}

fn capture(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// The entry id is the docket URL plus per-entry query parameters. Items
/// without a guid get a generated hash id from the parser; those fall back
/// to the entry link.
fn docket_link(entry: &RawEntry) -> Option<String> {
    let id_is_url = entry.id.starts_with("http://") || entry.id.starts_with("https://");
    let source = if id_is_url { &entry.id } else { &entry.link };
    let base = source.split('&').next().unwrap_or_default();
    Some(unescape(base)).filter(|s| !s.is_empty())
}

/// `1:13-cv-04341-JRT` becomes `1:13-cv-04341`: office, year, type and
/// sequence number, without judge initials or defendant suffixes.
fn canonical_case(token: &str) -> Option<String> {
    let normalized = token.replace(':', "-");
    let parts: Vec<&str> = normalized.split('-').take(4).collect();
    match parts.split_first() {
        Some((first, _)) if first.is_empty() => None,
        Some((first, rest)) if !rest.is_empty() => Some(format!("{first}:{}", rest.join("-"))),
        _ => Some(token.to_string()),
    }
}
