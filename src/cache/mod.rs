//! Cache module for storing API responses on disk
//!
//! Responses are persisted one JSON file per key under a namespace directory
//! and read back only while younger than a caller-chosen max age. Cache
//! failures never surface: a broken cache behaves like an empty one.

mod clock;
mod key;
mod storage;
mod store;

pub use clock::{Clock, SystemClock};
pub use key::{record_path, storage_id};
pub use storage::{FsStorage, MemoryStorage, Storage};
pub use store::{CacheRecord, CacheStore, Lookup, DEFAULT_NAMESPACE};
