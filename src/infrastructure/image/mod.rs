//! Image handling infrastructure.
//!
//! This module provides:
//! - Memory caching with LRU eviction
//! - Deduplicated, cancellable image downloads
//! - The search/fetch coordinator behind the consumer port

pub mod fetch_coordinator;
pub mod memory_cache;

pub use fetch_coordinator::{DEFAULT_MAX_CONCURRENT_DOWNLOADS, FetchCoordinator};
pub use memory_cache::{CachePolicy, CacheStats, DEFAULT_CACHE_SIZE, EvictionHook, MemoryImageCache};
