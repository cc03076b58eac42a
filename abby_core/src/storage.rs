//! Pluggable persistence for sticky assignments and flag decisions.
//!
//! [`StorageAdapter`] is the seam that lets the same assignment algorithm run
//! identically in any host environment. Browser-persistent and cookie-backed
//! adapters live with the per-framework adapter packages; this crate ships the
//! implementations that make sense server-side: an in-memory map and a no-op
//! adapter for contexts with no persistence at all (e.g., server-side
//! rendering before hydration).
use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Options for a storage write.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetOptions {
    /// Expire the value after this many days. `None` means no expiry.
    pub expires_in_days: Option<u32>,
}

/// Capability interface for sticky-assignment persistence.
///
/// Operations are atomic per key; callers need no external coordination. The
/// assignment engine never branches on the concrete implementation.
pub trait StorageAdapter: Send + Sync {
    /// Read a value. Returns `None` when the key is absent, expired, or the
    /// adapter has no persistence context.
    fn get(&self, project_id: &str, key: &str) -> Option<String>;

    /// Write a value. A no-op when the adapter has no persistence context.
    fn set(&self, project_id: &str, key: &str, value: &str, options: SetOptions);

    /// Delete a value. Used for explicit assignment resets.
    fn remove(&self, project_id: &str, key: &str);
}

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

/// In-memory storage for server-only contexts.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<(String, String), StoredValue>>,
}

impl MemoryStorage {
    /// Create an empty in-memory storage.
    pub fn new() -> MemoryStorage {
        MemoryStorage::default()
    }

    fn get_at(&self, project_id: &str, key: &str, now: DateTime<Utc>) -> Option<String> {
        let entries = self
            .entries
            .lock()
            .expect("thread holding storage lock should not panic");
        let stored = entries.get(&(project_id.to_owned(), key.to_owned()))?;
        if let Some(expires_at) = stored.expires_at {
            if now >= expires_at {
                return None;
            }
        }
        Some(stored.value.clone())
    }
}

impl StorageAdapter for MemoryStorage {
    fn get(&self, project_id: &str, key: &str) -> Option<String> {
        self.get_at(project_id, key, Utc::now())
    }

    fn set(&self, project_id: &str, key: &str, value: &str, options: SetOptions) {
        let expires_at = options
            .expires_in_days
            .map(|days| Utc::now() + Duration::days(days as i64));
        let mut entries = self
            .entries
            .lock()
            .expect("thread holding storage lock should not panic");
        entries.insert(
            (project_id.to_owned(), key.to_owned()),
            StoredValue {
                value: value.to_owned(),
                expires_at,
            },
        );
    }

    fn remove(&self, project_id: &str, key: &str) {
        let mut entries = self
            .entries
            .lock()
            .expect("thread holding storage lock should not panic");
        entries.remove(&(project_id.to_owned(), key.to_owned()));
    }
}

/// No-op adapter for contexts without any persistence.
///
/// Reads return `None` and writes are dropped, so every evaluation draws
/// fresh. That is acceptable only in the narrow pre-hydration window.
pub struct NullStorage;

impl StorageAdapter for NullStorage {
    fn get(&self, _project_id: &str, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _project_id: &str, _key: &str, _value: &str, _options: SetOptions) {}

    fn remove(&self, _project_id: &str, _key: &str) {}
}
