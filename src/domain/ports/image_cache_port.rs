//! Port definition for image caching.

use std::sync::Arc;

/// Port for the decoded image cache, keyed by photo URL.
///
/// Implementations must be thread-safe. A cache may drop entries at any
/// time, so a miss never implies the image was not fetched before.
#[async_trait::async_trait]
pub trait ImageCachePort: Send + Sync {
    /// Attempts to get an image from the cache.
    async fn get(&self, key: &str) -> Option<Arc<image::DynamicImage>>;

    /// Stores an image in the cache, replacing any previous entry.
    async fn put(&self, key: String, image: Arc<image::DynamicImage>);

    /// Removes an image from the cache.
    async fn evict(&self, key: &str);

    /// Returns true if `key` is cached, without counting a hit or promoting it.
    ///
    /// Best effort: an entry may be reported missing while another task
    /// holds the cache for writing.
    fn contains(&self, key: &str) -> bool;

    /// Returns the number of cached images.
    ///
    /// Best effort, like [`Self::contains`]: reads as 0 while another task
    /// holds the cache for writing.
    fn len(&self) -> usize;

    /// Returns true if the cache is empty. Best effort, see [`Self::len`].
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears all images from the cache.
    async fn clear(&self);
}
