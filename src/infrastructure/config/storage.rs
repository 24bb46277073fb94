//! Locating, reading and persisting `config.toml`.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::app_config::{APP_NAME, APP_ORGANIZATION, APP_QUALIFIER, AppConfig};

const CONFIG_FILE: &str = "config.toml";
const DEFAULT_HEADER: &str = "# photo-search configuration\n\
# The API key may also come from PHOTO_SEARCH_API_KEY or --api-key.\n\n";

/// Errors raised while locating or writing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform has no per-user config directory.
    #[error("no per-user config directory on this platform")]
    NoConfigDir,
    /// Filesystem failure.
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration could not be serialized.
    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Reads and writes the configuration file in the project config directory.
#[derive(Debug, Clone)]
pub struct StorageManager {
    dir: PathBuf,
}

impl StorageManager {
    /// Uses the platform config directory for photo-search.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoConfigDir` if the platform has none.
    pub fn new() -> Result<Self, ConfigError> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| Self::at(dirs.config_dir()))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Uses `dir` as the config directory.
    #[must_use]
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the config directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file `load_config` reads for the given override.
    #[must_use]
    pub fn config_path(&self, path_override: Option<&Path>) -> PathBuf {
        path_override.map_or_else(|| self.dir.join(CONFIG_FILE), Path::to_path_buf)
    }

    /// Loads the configuration.
    ///
    /// A missing file is created with defaults. A file that fails to parse
    /// is left on disk untouched and defaults are returned.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or the default
    /// cannot be written.
    pub fn load_config(&self, path_override: Option<&Path>) -> Result<AppConfig, ConfigError> {
        let path = self.config_path(path_override);

        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "Writing default configuration");
                let config = AppConfig::default();
                write_config(&path, &config)?;
                return Ok(config);
            }
            Err(e) => return Err(e.into()),
        };

        let config = toml::from_str::<AppConfig>(&raw).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Ignoring unparsable configuration");
            AppConfig::default()
        });
        debug!(path = %path.display(), "Configuration loaded");
        Ok(config.sanitized())
    }

    /// Saves `config` as the default configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be written.
    pub fn save_config(&self, config: &AppConfig) -> Result<(), ConfigError> {
        write_config(&self.dir.join(CONFIG_FILE), config)
    }
}

/// Writes through a sibling temp file so readers never see a partial file.
fn write_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    let body = toml::to_string_pretty(config)?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    staged.write_all(DEFAULT_HEADER.as_bytes())?;
    staged.write_all(body.as_bytes())?;
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}
