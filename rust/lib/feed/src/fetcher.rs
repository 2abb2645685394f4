use std::sync::Arc;

use crate::error::FeedError;
use crate::model::FeedPage;

/// Source of feed pages for one query.
///
/// Implementations pass `page` through unchanged (the server owns page
/// size) and never retry; retry policy belongs to the caller.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync + 'static {
    /// Fetch page `page` (1-based).
    async fn fetch(&self, page: u32) -> Result<FeedPage, FeedError>;
}

#[async_trait::async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for Arc<T> {
    async fn fetch(&self, page: u32) -> Result<FeedPage, FeedError> {
        (**self).fetch(page).await
    }
}
