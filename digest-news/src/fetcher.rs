//! Feed fetcher abstraction

use async_trait::async_trait;

use digest_core::FeedEntry;

use crate::error::NewsError;

/// Supplies raw entries for a single search query.
///
/// Implementations must not filter by date, language or history; that is
/// the candidate filter's job.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, query: &str) -> Result<Vec<FeedEntry>, NewsError>;
}
