//! Consumer-facing search and image port.

use async_trait::async_trait;

use crate::domain::entities::{LoadedImage, PageResult, Photo};
use crate::domain::errors::FetchResult;

/// Port the list consumer talks to: metadata pages, images, prefetching.
#[async_trait]
pub trait PhotoSearchPort: Send + Sync {
    /// Fetches one page of search results.
    async fn search(&self, query: &str, page: u32) -> FetchResult<PageResult>;

    /// Resolves the image for `photo` from cache or network.
    async fn fetch_image(&self, photo: &Photo) -> FetchResult<LoadedImage>;

    /// Warms the cache for `photo` without waiting for the result.
    fn prefetch(&self, photo: &Photo);

    /// Cancels in-flight prefetches for the given URLs. Never fails.
    fn cancel_fetches(&self, urls: &[String]);
}
