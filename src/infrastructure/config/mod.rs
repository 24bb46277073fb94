//! Application configuration.

/// Configuration file model.
pub mod app_config;
/// Command-line arguments.
pub mod args;
/// Config file persistence.
pub mod storage;

pub use app_config::{AppConfig, ImagesConfig, LogLevel, SearchConfig};
pub use args::CliArgs;
pub use storage::{ConfigError, StorageManager};
