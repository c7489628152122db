//! Short-lived keyed store for generated documents and flash notices.
//!
//! [`ExpiringStore::get`] reads an entry and leaves it in place;
//! [`ExpiringStore::take`] removes it. Entries older than the TTL are never
//! returned and are dropped by [`ExpiringStore::purge_expired`].

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Stem used when the upload has no usable file name.
const DEFAULT_STEM: &str = "salida";

struct Entry<T> {
    value: T,
    created_at: DateTime<Utc>,
}

/// In-memory map with a time-to-live per entry.
pub struct ExpiringStore<T> {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry<T>>>,
}

impl<T> ExpiringStore<T> {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ttl: Duration::from_std(ttl).unwrap_or(Duration::MAX),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry<T>>> {
        // A panic while holding the lock leaves the map itself consistent.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_expired(&self, entry: &Entry<T>, now: DateTime<Utc>) -> bool {
        now - entry.created_at > self.ttl
    }

    /// Store a value, replacing any previous entry under `key`.
    pub fn insert(&self, key: impl Into<String>, value: T) {
        self.lock().insert(
            key.into(),
            Entry {
                value,
                created_at: Utc::now(),
            },
        );
    }

    /// Store a value under a fresh random key and return the key.
    pub fn insert_new(&self, value: T) -> String {
        let key = Uuid::new_v4().simple().to_string();
        self.insert(key.clone(), value);
        key
    }

    /// Return a copy of a live entry, keeping it stored.
    pub fn get(&self, key: &str) -> Option<T>
    where
        T: Clone,
    {
        let entries = self.lock();
        let entry = entries.get(key)?;
        if self.is_expired(entry, Utc::now()) {
            None
        } else {
            Some(entry.value.clone())
        }
    }

    /// Remove and return a live entry.
    pub fn take(&self, key: &str) -> Option<T> {
        let entry = self.lock().remove(key)?;
        if self.is_expired(&entry, Utc::now()) {
            None
        } else {
            Some(entry.value)
        }
    }

    /// Drop expired entries, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !self.is_expired(entry, now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Download names
// =============================================================================

/// Download file name for an upload: `{stem}-{YYYYmmdd-HHMMSS}-{random}.json`.
///
/// The random suffix keeps simultaneous uploads of the same file apart.
pub fn download_filename(upload_name: Option<&str>) -> String {
    let stem = upload_name
        .and_then(sanitize_download_name)
        .and_then(|name| {
            Path::new(&name)
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_STEM.to_string());

    let timestamp = Utc::now().format("%Y%m%d-%H%M%S");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}.json", stem, timestamp, &suffix[..8])
}

/// Reduce a requested name to its last path segment.
///
/// Returns `None` for empty names and `.`/`..`.
pub fn sanitize_download_name(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or("").trim();
    match base {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}
