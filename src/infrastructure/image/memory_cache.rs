//! In-memory LRU image cache implementation.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::domain::ports::ImageCachePort;

/// Default maximum number of images to cache in memory.
pub const DEFAULT_CACHE_SIZE: usize = 200;

/// Callback invoked with the key of every entry the cache drops.
pub type EvictionHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Retention policy for [`MemoryImageCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Keep at most this many images, dropping the least recently used.
    Bounded(usize),
    /// Never evict on insert; only `evict`, `clear` and `purge` drop entries.
    Unbounded,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::Bounded(DEFAULT_CACHE_SIZE)
    }
}

/// In-memory cache for decoded images keyed by URL.
/// Thread-safe and optimized for frequent reads.
pub struct MemoryImageCache {
    cache: RwLock<LruCache<String, Arc<image::DynamicImage>>>,
    on_evict: Option<EvictionHook>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryImageCache {
    /// Creates a new cache with the given policy.
    #[must_use]
    pub fn new(policy: CachePolicy) -> Self {
        let cache = match policy {
            CachePolicy::Bounded(capacity) => {
                LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN))
            }
            CachePolicy::Unbounded => LruCache::unbounded(),
        };
        Self {
            cache: RwLock::new(cache),
            on_evict: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Creates a bounded cache with the given capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(CachePolicy::Bounded(capacity))
    }

    /// Installs a hook called with each dropped key.
    #[must_use]
    pub fn with_eviction_hook(mut self, hook: EvictionHook) -> Self {
        self.on_evict = Some(hook);
        self
    }

    /// Returns cache statistics. `size` is exact, unlike [`ImageCachePort::len`].
    #[allow(clippy::cast_precision_loss)]
    pub async fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            hit_rate,
            size: self.cache.read().await.len(),
        }
    }

    /// Peeks at an image without promoting it in the LRU.
    pub async fn peek(&self, key: &str) -> Option<Arc<image::DynamicImage>> {
        let cache = self.cache.read().await;
        cache.peek(key).cloned()
    }

    /// Drops every entry, as an external memory-pressure signal would.
    pub async fn purge(&self) {
        let dropped: Vec<String> = {
            let mut cache = self.cache.write().await;
            let keys: Vec<String> = cache.iter().map(|(k, _)| k.clone()).collect();
            cache.clear();
            keys
        };
        debug!(count = dropped.len(), "Purged memory image cache");
        for key in &dropped {
            self.notify_evicted(key);
        }
    }

    fn notify_evicted(&self, key: &str) {
        if let Some(hook) = &self.on_evict {
            hook(key);
        }
    }
}

impl Default for MemoryImageCache {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}

impl std::fmt::Debug for MemoryImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryImageCache")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of cached images.
    pub size: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} images, {:.1}% hit rate ({} hits, {} misses)",
            self.size, self.hit_rate, self.hits, self.misses
        )
    }
}

#[async_trait::async_trait]
impl ImageCachePort for MemoryImageCache {
    async fn get(&self, key: &str) -> Option<Arc<image::DynamicImage>> {
        let mut cache = self.cache.write().await;
        if let Some(img) = cache.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key, "Memory cache hit");
            Some(img.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key, "Memory cache miss");
            None
        }
    }

    async fn put(&self, key: String, image: Arc<image::DynamicImage>) {
        let displaced = {
            let mut cache = self.cache.write().await;
            debug!(key = %key, "Storing image in memory cache");
            cache.push(key.clone(), image)
        };
        if let Some((old_key, _)) = displaced
            && old_key != key
        {
            trace!(key = %old_key, "LRU evicted image");
            self.notify_evicted(&old_key);
        }
    }

    async fn evict(&self, key: &str) {
        let removed = self.cache.write().await.pop(key).is_some();
        if removed {
            debug!(key, "Evicted image from memory cache");
            self.notify_evicted(key);
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.cache.try_read().is_ok_and(|c| c.contains(key))
    }

    fn len(&self) -> usize {
        self.cache.try_read().map(|c| c.len()).unwrap_or(0)
    }

    async fn clear(&self) {
        self.cache.write().await.clear();
        debug!("Cleared memory image cache");
    }
}
