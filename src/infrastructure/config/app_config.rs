//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use super::args::CliArgs;
use crate::infrastructure::flickr::{DEFAULT_PER_PAGE, FLICKR_API_BASE};
use crate::infrastructure::http::DEFAULT_TIMEOUT_SECS;
use crate::infrastructure::image::{
    CachePolicy, DEFAULT_CACHE_SIZE, DEFAULT_MAX_CONCURRENT_DOWNLOADS,
};

pub(super) const APP_NAME: &str = "photo-search";
pub(super) const APP_QUALIFIER: &str = "io";
pub(super) const APP_ORGANIZATION: &str = "photo-search";

/// Largest page size the search API accepts.
pub const MAX_PER_PAGE: u32 = 500;

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, from `config.toml` overlaid with CLI flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log file path. Logs go to stderr when unset.
    #[serde(default)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Search endpoint configuration.
    #[serde(default)]
    pub search: SearchConfig,

    /// Image loading configuration.
    #[serde(default)]
    pub images: ImagesConfig,
}

/// Search endpoint configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Flickr API key.
    #[serde(default)]
    pub api_key: String,

    /// REST endpoint base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Results per page.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            per_page: default_per_page(),
        }
    }
}

/// Image loading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Maximum decoded images kept in memory; 0 keeps everything.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Maximum concurrent downloads.
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ImagesConfig {
    /// Returns the cache retention policy.
    #[must_use]
    pub const fn cache_policy(&self) -> CachePolicy {
        if self.cache_capacity == 0 {
            CachePolicy::Unbounded
        } else {
            CachePolicy::Bounded(self.cache_capacity)
        }
    }
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            max_concurrent_downloads: default_max_concurrent_downloads(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    FLICKR_API_BASE.to_string()
}

const fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

const fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_SIZE
}

const fn default_max_concurrent_downloads() -> usize {
    DEFAULT_MAX_CONCURRENT_DOWNLOADS
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(api_key) = &args.api_key {
            self.search.api_key.clone_from(api_key);
        }
        if let Some(per_page) = args.per_page {
            self.search.per_page = per_page;
        }
        if let Some(cache_capacity) = args.cache_capacity {
            self.images.cache_capacity = cache_capacity;
        }
    }

    /// Clamps values the services cannot run with into their valid range.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let per_page = self.search.per_page.clamp(1, MAX_PER_PAGE);
        if per_page != self.search.per_page {
            warn!(configured = self.search.per_page, used = per_page, "per_page out of range");
            self.search.per_page = per_page;
        }
        if self.images.max_concurrent_downloads == 0 {
            warn!("max_concurrent_downloads must be at least 1");
            self.images.max_concurrent_downloads = 1;
        }
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            log_level: LogLevel::Info,
            search: SearchConfig::default(),
            images: ImagesConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_config_sections() {
        let toml_content = r#"
            log_level = "debug"

            [search]
            api_key = "abc123"
            per_page = 25

            [images]
            cache_capacity = 0
        "#;

        let config: AppConfig = toml::from_str(toml_content).expect("Failed to parse config");

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.search.api_key, "abc123");
        assert_eq!(config.search.per_page, 25);
        assert_eq!(config.search.base_url, FLICKR_API_BASE);
        assert_eq!(config.images.cache_policy(), CachePolicy::Unbounded);
        assert_eq!(
            config.images.max_concurrent_downloads,
            DEFAULT_MAX_CONCURRENT_DOWNLOADS
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(
            config.images.cache_policy(),
            CachePolicy::Bounded(DEFAULT_CACHE_SIZE)
        );
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut config = AppConfig::default();
        config.search.api_key = "from-file".to_string();
        config.search.per_page = 30;

        let args = CliArgs::parse_from([
            "photo-search",
            "sunset",
            "--api-key",
            "from-cli",
            "--log-level",
            "trace",
        ]);
        config.merge_with_args(&args);

        assert_eq!(config.search.api_key, "from-cli");
        assert_eq!(config.search.per_page, 30);
        assert_eq!(config.log_level, LogLevel::Trace);
    }

    #[test]
    fn test_sanitized_clamps_page_size() {
        let mut config = AppConfig::default();
        config.search.per_page = 10_000;

        assert_eq!(config.sanitized().search.per_page, MAX_PER_PAGE);
    }
}
