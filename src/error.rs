//! Error types for cache internals and configuration.
//!
//! Cache errors never reach callers of the public store operations: reads
//! degrade to a miss and writes are logged and dropped. They exist so the
//! private helpers can use `?` and so the log line says what went wrong.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine a data directory; pass --data-dir or set RESPCACHE_DATA_DIR")]
    NoDataDir,
}

pub type Result<T> = std::result::Result<T, CacheError>;
