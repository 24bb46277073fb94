//! Infrastructure layer with external service adapters.

/// Application configuration.
pub mod config;
/// Flickr search API adapter.
pub mod flickr;
/// HTTP transport.
pub mod http;
/// Image caching and download coordination.
pub mod image;

pub use config::{AppConfig, CliArgs, LogLevel, StorageManager};
pub use flickr::SearchEndpoint;
pub use http::ReqwestTransport;
pub use image::{CachePolicy, CacheStats, FetchCoordinator, MemoryImageCache};
