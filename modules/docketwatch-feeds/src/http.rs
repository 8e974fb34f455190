// Court RSS fetcher.
// One reqwest client shared across courts; every request is bounded by the
// configured timeout, and a hung connection surfaces as FeedError::Timeout.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use docketwatch_common::{FeedsConfig, RawFeed};

use crate::error::{FeedError, Result};
use crate::parse::parse_feed;
use crate::source::FeedSource;

pub struct HttpFeedSource {
    client: reqwest::Client,
    feeds: FeedsConfig,
    timeout: Duration,
}

impl HttpFeedSource {
    pub fn new(feeds: FeedsConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(feeds.user_agent.clone())
            .build()
            .map_err(|e| FeedError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            feeds,
            timeout,
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.client.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        Ok(resp.bytes().await?.to_vec())
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, court: &str) -> Result<RawFeed> {
        let url = self.feeds.feed_url(court);

        // reqwest's own timeout covers the request, but not a server that
        // trickles the body forever.
        let bytes = tokio::time::timeout(self.timeout, self.download(&url))
            .await
            .map_err(|_| FeedError::Timeout(self.timeout))?
            .map_err(|e| match e {
                FeedError::Timeout(_) => FeedError::Timeout(self.timeout),
                other => other,
            })?;

        let feed = parse_feed(&bytes)?;
        debug!(court, url, entries = feed.entries.len(), "feed: parsed successfully");
        Ok(feed)
    }
}
