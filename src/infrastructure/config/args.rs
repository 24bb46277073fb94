use super::app_config::LogLevel;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments. Options left unset fall back to `config.toml`.
#[derive(Debug, Parser)]
#[command(
    name = "photo-search",
    version,
    about = "Search Flickr and stream the result images",
    long_about = None
)]
pub struct CliArgs {
    /// Free-text search query.
    pub query: String,

    /// Number of result pages to load.
    #[arg(short, long, default_value_t = 1)]
    pub pages: u32,

    /// Row width used to compute display heights.
    #[arg(long, value_name = "PX", default_value_t = 320.0)]
    pub row_width: f64,

    /// Prefetch every row before loading it.
    #[arg(long)]
    pub prefetch: bool,

    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Flickr API key.
    #[arg(long, env = "PHOTO_SEARCH_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Results per page.
    #[arg(long)]
    pub per_page: Option<u32>,

    /// Maximum decoded images kept in memory (0 keeps everything).
    #[arg(long)]
    pub cache_capacity: Option<usize>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,
}
