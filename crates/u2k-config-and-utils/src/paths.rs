//! File system paths for url2kindle.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Directory name used under each XDG base directory.
const APP_DIR_NAME: &str = "url2kindle";
/// Configuration file name inside the config directory.
const CONFIG_FILE_NAME: &str = "config.json";
/// Log file name inside the cache directory.
const LOG_FILE_NAME: &str = "u2k.log";

/// Manages file system paths.
///
/// Follows the XDG base directory layout:
/// - config: `$XDG_CONFIG_HOME/url2kindle`
/// - data (the outbox): `$XDG_DATA_HOME/url2kindle`
/// - cache (logs): `$XDG_CACHE_HOME/url2kindle`
#[derive(Debug, Clone)]
pub struct Paths {
    config_dir: PathBuf,
    data_dir: PathBuf,
    cache_dir: PathBuf,
}

impl Paths {
    /// Resolve paths from the platform's base directories.
    pub fn new() -> CoreResult<Self> {
        let config_base = dirs::config_dir()
            .ok_or_else(|| CoreError::Path("Could not determine config directory".to_string()))?;
        let data_base = dirs::data_dir()
            .ok_or_else(|| CoreError::Path("Could not determine data directory".to_string()))?;
        let cache_base = dirs::cache_dir()
            .ok_or_else(|| CoreError::Path("Could not determine cache directory".to_string()))?;

        Ok(Self {
            config_dir: config_base.join(APP_DIR_NAME),
            data_dir: data_base.join(APP_DIR_NAME),
            cache_dir: cache_base.join(APP_DIR_NAME),
        })
    }

    /// Root every directory under a single base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self {
            config_dir: base_dir.join("config"),
            data_dir: base_dir.join("data"),
            cache_dir: base_dir.join("cache"),
        }
    }

    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    /// Get the config file path (`<config>/config.json`).
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// Directory holding pending outbox entries and the sweep lock token.
    pub fn outbox_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    pub fn logs_dir(&self) -> &PathBuf {
        &self.cache_dir
    }

    /// Get the log file path (`<cache>/u2k.log`).
    pub fn log_file(&self) -> PathBuf {
        self.cache_dir.join(LOG_FILE_NAME)
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.cache_dir)?;
        Ok(())
    }
}
