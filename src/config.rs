//! Cache location and expiry settings
//!
//! The cache lives in the application's platform data directory
//! (`~/.local/share/backers-little-helper/cache/` on Linux) unless a data
//! directory is given explicitly.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;

use crate::cache::{CacheStore, DEFAULT_NAMESPACE};
use crate::error::ConfigError;

/// Application name used for the data directory
const APP_NAME: &str = "backers-little-helper";

/// Comm-link news feed: 1 hour
pub const NEWS_TTL: Duration = Duration::from_secs(60 * 60);

/// Vehicle search results: 30 days
pub const VEHICLE_SEARCH_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Vehicle detail pages: 30 days
pub const VEHICLE_DETAILS_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Application-private root directory
    pub base_dir: PathBuf,
    /// Directory under `base_dir` holding cache records
    pub namespace: String,
}

impl CacheConfig {
    /// Uses `data_dir` if given, otherwise the platform data directory
    pub fn resolve(data_dir: Option<PathBuf>) -> Result<Self, ConfigError> {
        let base_dir = match data_dir {
            Some(dir) => dir,
            None => default_data_dir().ok_or(ConfigError::NoDataDir)?,
        };

        Ok(Self {
            base_dir,
            namespace: DEFAULT_NAMESPACE.to_string(),
        })
    }

    /// Full path of the cache directory
    pub fn cache_dir(&self) -> PathBuf {
        self.base_dir.join(&self.namespace)
    }

    /// Builds a filesystem-backed store for this configuration
    pub fn open_store(&self) -> CacheStore {
        CacheStore::on_disk(&self.base_dir).with_namespace(&self.namespace)
    }
}

/// Platform data directory for the application, if a home directory exists
pub fn default_data_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_dir().to_path_buf())
}
