use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Arc, Mutex},
};

use crate::error::{Error, Result};

/// Table of per-key exclusive sections
///
/// Work on one key is serialized; different keys proceed in parallel. The
/// table lock is only held while looking up the entry, never during `f`.
///
/// Entries are never removed: a waiter may still hold the `Arc` of an entry,
/// and replacing it would admit a second holder for the same key. The table
/// grows by one empty mutex per distinct account or role ever touched.
pub(crate) struct LockTable<K> {
    entries: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for LockTable<K> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> LockTable<K> {
    fn entry(&self, key: &K) -> Result<Arc<Mutex<()>>> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::lock_error("Failed to acquire lock table"))?;
        Ok(entries.entry(key.clone()).or_default().clone())
    }

    /// Run `f` while holding the section for `key`
    pub fn with<R>(&self, key: &K, f: impl FnOnce() -> Result<R>) -> Result<R> {
        let entry = self.entry(key)?;
        let _guard = entry
            .lock()
            .map_err(|_| Error::lock_error("Failed to acquire key lock"))?;
        f()
    }
}
