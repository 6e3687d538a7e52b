//! Cache key sanitization
//!
//! Logical cache keys are free-form strings chosen by callers. On disk each key
//! becomes a file stem, so anything outside `[A-Za-z0-9]` is replaced with `_`.
//! Existing cache directories depend on this exact mapping.

use std::path::{Path, PathBuf};

/// File extension used for every storage unit
const RECORD_EXTENSION: &str = "json";

/// Converts a logical key into its on-disk storage id.
///
/// Replacement happens per UTF-16 code unit: each unit outside `[A-Za-z0-9]`
/// becomes one `_`, so a character outside the Basic Multilingual Plane
/// (an emoji, say) turns into `__`. This matches ids already on disk.
/// Distinct keys that differ only in those characters collide (`"a/b"` and
/// `"a_b"` share a unit).
pub fn storage_id(key: &str) -> String {
    key.encode_utf16()
        .map(|unit| match u8::try_from(unit) {
            Ok(byte) if byte.is_ascii_alphanumeric() => char::from(byte),
            _ => '_',
        })
        .collect()
}

/// Relative path of the storage unit for `key` inside `namespace`
pub fn record_path(namespace: &Path, key: &str) -> PathBuf {
    namespace.join(format!("{}.{}", storage_id(key), RECORD_EXTENSION))
}
