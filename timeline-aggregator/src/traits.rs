use crate::types::{RawFeedItem, RawFeedPayload, Result, Source};
use async_trait::async_trait;

/// Trait for retrieving a source's feed from the feed-to-JSON gateway
#[async_trait]
pub trait FeedGateway: Send + Sync {
    /// Fetch the current feed for one source. No retries.
    async fn fetch(&self, source: &Source) -> Result<RawFeedPayload>;
}

/// Predicate deciding which raw feed items become timeline items
///
/// Runs on the gateway's `RawFeedItem` before shaping, so a filter can use any
/// field the gateway sends (including ones a `NormalizedItem` drops, such as
/// `title` or secondary authors) if a structural reply flag ever shows up.
pub trait ItemFilter: Send + Sync {
    fn keep(&self, item: &RawFeedItem) -> bool;

    /// Name used in logs when an item is dropped
    fn filter_name(&self) -> String;
}
