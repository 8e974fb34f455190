use docketwatch_common::{RawEntry, RawFeed};

use crate::error::{FeedError, Result};

/// Parse an RSS/Atom payload into the fields the poller depends on.
/// Entry order is preserved as delivered.
pub fn parse_feed(bytes: &[u8]) -> Result<RawFeed> {
    let feed = feed_rs::parser::parse(bytes).map_err(|e| FeedError::Format(e.to_string()))?;

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| RawEntry {
            title: entry.title.map(|t| t.content).unwrap_or_default(),
            summary: entry
                .summary
                .map(|t| t.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .unwrap_or_default(),
            link: entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default(),
            id: entry.id,
            published: entry.published.or(entry.updated),
        })
        .collect();

    Ok(RawFeed {
        updated: feed.updated,
        entries,
    })
}
