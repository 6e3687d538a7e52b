//! Storage adapters backing the cache store
//!
//! The store only needs four primitives: an existence check, whole-file
//! text reads and writes, and directory creation. Paths passed to an adapter
//! are relative to its application-private root.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Backend the cache store reads and writes through
#[async_trait]
pub trait Storage: Send + Sync {
    /// Whether a storage unit exists at `path`
    async fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Reads the full contents of `path` as UTF-8 text
    async fn read_text(&self, path: &Path) -> io::Result<String>;

    /// Replaces the contents of `path` with `contents`
    async fn write_text(&self, path: &Path, contents: &str) -> io::Result<()>;

    /// Creates the directory at `path`, including parents when `recursive` is set
    async fn make_dir(&self, path: &Path, recursive: bool) -> io::Result<()>;
}

/// Filesystem storage rooted at a base directory
#[derive(Debug, Clone)]
pub struct FsStorage {
    base_dir: PathBuf,
}

impl FsStorage {
    /// Creates storage rooted at `base_dir`. The directory is created lazily.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Root directory all relative paths are resolved against
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.base_dir.join(path)
    }
}

/// Sequence for temp file names, so concurrent writers never share one
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

fn temp_path_for(target: &Path) -> PathBuf {
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    target.with_extension(format!("{}.{}.tmp", std::process::id(), seq))
}

#[async_trait]
impl Storage for FsStorage {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        fs::try_exists(self.resolve(path)).await
    }

    async fn read_text(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(self.resolve(path)).await
    }

    async fn write_text(&self, path: &Path, contents: &str) -> io::Result<()> {
        let target = self.resolve(path);

        // Write atomically via temp file so readers never see a partial record
        let temp_path = temp_path_for(&target);
        let mut file = fs::File::create(&temp_path).await?;
        let written = async {
            file.write_all(contents.as_bytes()).await?;
            file.sync_all().await
        }
        .await;
        drop(file);

        let result = match written {
            Ok(()) => fs::rename(&temp_path, &target).await,
            Err(err) => Err(err),
        };
        if result.is_err() {
            let _ = fs::remove_file(&temp_path).await;
        }
        result
    }

    async fn make_dir(&self, path: &Path, recursive: bool) -> io::Result<()> {
        let dir = self.resolve(path);
        if recursive {
            fs::create_dir_all(dir).await
        } else {
            fs::create_dir(dir).await
        }
    }
}

/// In-memory storage, useful for tests and throwaway caches
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<HashMap<PathBuf, String>>,
    dirs: Mutex<HashSet<PathBuf>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw contents stored at `path`, if any
    pub fn contents(&self, path: &Path) -> Option<String> {
        lock(&self.files).get(path).cloned()
    }

    /// Stores raw text at `path`, bypassing the cache record format
    pub fn insert_raw(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        lock(&self.files).insert(path.into(), contents.into());
    }

    /// Whether `make_dir` has been called for `path`
    pub fn has_dir(&self, path: &Path) -> bool {
        lock(&self.dirs).contains(path)
    }

    /// Number of stored units
    pub fn len(&self) -> usize {
        lock(&self.files).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // Every critical section is a single map operation
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        Ok(lock(&self.files).contains_key(path))
    }

    async fn read_text(&self, path: &Path) -> io::Result<String> {
        lock(&self.files).get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such entry: {}", path.display()),
            )
        })
    }

    async fn write_text(&self, path: &Path, contents: &str) -> io::Result<()> {
        lock(&self.files).insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    async fn make_dir(&self, path: &Path, recursive: bool) -> io::Result<()> {
        let mut dirs = lock(&self.dirs);
        if !recursive && dirs.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("directory exists: {}", path.display()),
            ));
        }
        dirs.insert(path.to_path_buf());
        Ok(())
    }
}
