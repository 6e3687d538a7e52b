//! Expiring response cache
//!
//! Each key is stored as one JSON record `{"timestamp": <ms>, "data": <json>}`
//! under the store's namespace directory. Reads treat anything unusable
//! (missing, unreadable, corrupt, or older than the caller's max age) as a
//! miss; writes are best effort and never fail the caller.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::key::record_path;
use super::storage::{FsStorage, Storage};
use crate::error::Result;

/// Namespace directory used unless configured otherwise
pub const DEFAULT_NAMESPACE: &str = "cache";

/// On-disk record wrapping a cached payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord<T> {
    /// Milliseconds since the Unix epoch when the record was written
    pub timestamp: i64,
    /// The cached payload
    pub data: T,
}

impl<T> CacheRecord<T> {
    /// Age of the record at `now_millis`. Negative if written in the future.
    pub fn age_millis(&self, now_millis: i64) -> i64 {
        now_millis.saturating_sub(self.timestamp)
    }

    /// Whether the record is still usable under `max_age` (inclusive)
    pub fn is_fresh(&self, now_millis: i64, max_age: Duration) -> bool {
        let max_age_ms = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
        self.age_millis(now_millis) <= max_age_ms
    }

    /// Short human-readable age, e.g. "5m ago"
    pub fn age_display(&self, now_millis: i64) -> String {
        let minutes = self.age_millis(now_millis) / 60_000;
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}

/// Outcome of a cache read.
///
/// A missing entry, a stale entry and an unreadable entry all produce
/// `Absent`; callers cannot and need not tell them apart.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    Absent,
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Found(data) => Some(data),
            Lookup::Absent => None,
        }
    }
}

impl<T> From<Lookup<T>> for Option<T> {
    fn from(lookup: Lookup<T>) -> Self {
        lookup.into_option()
    }
}

/// Key/value cache with time-based expiry over a pluggable storage backend
///
/// The store keeps no entry state in memory. Concurrent writes to the same
/// key are not serialized: whichever write completes last wins.
#[derive(Clone)]
pub struct CacheStore {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    namespace: PathBuf,
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl CacheStore {
    /// Creates a store over `storage` using the default namespace and wall clock
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            clock: Arc::new(SystemClock),
            namespace: PathBuf::from(DEFAULT_NAMESPACE),
        }
    }

    /// Creates a filesystem-backed store rooted at `base_dir`
    pub fn on_disk(base_dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FsStorage::new(base_dir)))
    }

    /// Replaces the namespace directory records are kept in
    pub fn with_namespace(mut self, namespace: impl Into<PathBuf>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Replaces the time source used for timestamps and expiry checks
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn namespace(&self) -> &Path {
        &self.namespace
    }

    /// Relative storage path for `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        record_path(&self.namespace, key)
    }

    /// Returns the payload stored for `key` if it is no older than `max_age`.
    ///
    /// Stale records are left in place; they are overwritten by the next
    /// `set` for the same key.
    pub async fn get<T: DeserializeOwned>(&self, key: &str, max_age: Duration) -> Lookup<T> {
        match self.load::<T>(key).await {
            Ok(Some(record)) => {
                if record.is_fresh(self.clock.now_millis(), max_age) {
                    debug!(key, "Cache hit");
                    Lookup::Found(record.data)
                } else {
                    debug!(key, "Cache expired");
                    Lookup::Absent
                }
            }
            Ok(None) => {
                debug!(key, "Cache miss");
                Lookup::Absent
            }
            Err(e) => {
                warn!(key, error = %e, "Error reading cache, treating as miss");
                Lookup::Absent
            }
        }
    }

    /// Stores `payload` under `key`, replacing any previous record.
    ///
    /// Failures are logged and otherwise ignored; the next `get` simply misses.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, payload: &T) {
        match self.try_set(key, payload).await {
            Ok(()) => info!(key, "Cache saved"),
            Err(e) => warn!(key, error = %e, "Error writing cache"),
        }
    }

    /// Reads the raw record for `key` regardless of its age
    pub async fn inspect(&self, key: &str) -> Option<CacheRecord<Value>> {
        match self.load::<Value>(key).await {
            Ok(record) => record,
            Err(e) => {
                warn!(key, error = %e, "Error reading cache record");
                None
            }
        }
    }

    /// Returns the cached payload for `key`, or runs `producer` and caches its result.
    ///
    /// The producer runs at most once and only on a miss. Its error is returned
    /// unchanged and nothing is cached. Concurrent calls for the same key are
    /// not de-duplicated.
    pub async fn fetch_with_cache<T, E, F, Fut>(
        &self,
        key: &str,
        max_age: Duration,
        producer: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if let Lookup::Found(cached) = self.get(key, max_age).await {
            return Ok(cached);
        }

        debug!(key, "Fetching fresh data");
        let fresh = producer().await?;
        self.set(key, &fresh).await;
        Ok(fresh)
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<CacheRecord<T>>> {
        let path = self.path_for(key);
        if !self.storage.exists(&path).await? {
            return Ok(None);
        }

        let contents = self.storage.read_text(&path).await?;
        let record: CacheRecord<T> = serde_json::from_str(&contents)?;
        Ok(Some(record))
    }

    async fn try_set<T: Serialize + ?Sized>(&self, key: &str, payload: &T) -> Result<()> {
        // Recursive creation succeeds on an existing directory; any other
        // failure surfaces from the write below
        if let Err(e) = self.storage.make_dir(&self.namespace, true).await {
            debug!(error = %e, "Could not create cache directory");
        }

        let record = CacheRecord {
            timestamp: self.clock.now_millis(),
            data: payload,
        };
        let json = serde_json::to_string(&record)?;

        self.storage.write_text(&self.path_for(key), &json).await?;
        Ok(())
    }
}
