use async_trait::async_trait;

use docketwatch_common::RawFeed;

use crate::error::Result;

/// Where court feeds come from. The HTTP implementation talks to the courts;
/// tests script responses per court.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch and parse the current feed for `court`. Must not hang past the
    /// implementation's timeout.
    async fn fetch(&self, court: &str) -> Result<RawFeed>;
}
