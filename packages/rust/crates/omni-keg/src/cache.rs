//! In-process dex cache keyed by store identity.
//!
//! Avoids re-reading the dex artifacts when the same keg is opened repeatedly
//! within one process. Entries are refreshed after each index run via
//! [`crate::Keg::sync_cache`].

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::dex::Dex;
use crate::error::KegResult;
use crate::store::NodeStore;

/// Shared map of `store name -> Dex`.
#[derive(Debug, Default)]
pub struct DexCache {
    entries: Mutex<HashMap<String, Dex>>,
}

impl DexCache {
    /// Empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Dex>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached dex for `store`, loading from its artifacts on a miss.
    ///
    /// # Errors
    ///
    /// Propagates [`Dex::load`] failures; failed loads are not cached.
    pub fn load(&self, store: &dyn NodeStore) -> KegResult<Dex> {
        let key = store.name();
        if let Some(cached) = self.lock().get(key) {
            debug!(keg = key, "dex cache hit");
            return Ok(cached.clone());
        }
        let dex = Dex::load(store)?;
        debug!(keg = key, nodes = dex.len(), "dex cache insert");
        self.lock().insert(key.to_string(), dex.clone());
        Ok(dex)
    }

    /// Cached dex without loading.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Dex> {
        self.lock().get(key).cloned()
    }

    /// Replace the entry for `key`.
    pub fn put(&self, key: impl Into<String>, dex: Dex) {
        self.lock().insert(key.into(), dex);
    }

    /// Drop one entry. Returns whether it was present.
    pub fn invalidate(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Drop every entry, returning how many were cached.
    pub fn clear(&self) -> usize {
        let mut entries = self.lock();
        let count = entries.len();
        entries.clear();
        count
    }

    /// Number of cached kegs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
