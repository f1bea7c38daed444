//! De-duplicating resource caches.
//!
//! A cache maps a canonical key to the registry index of the object created
//! for it. `find` and `save` are separate calls, so the get-or-create
//! sequence is only race-free under the single-writer contract of
//! [`PdfWriter`](super::PdfWriter), which owns its caches exclusively.

use std::collections::HashMap;

/// Canonical key to registry index map with hit/miss logging.
#[derive(Debug, Clone)]
pub struct ResourceCache {
    name: &'static str,
    table: HashMap<String, usize>,
}

impl ResourceCache {
    /// Create an empty cache; `name` only appears in log output.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            table: HashMap::new(),
        }
    }

    /// Look up a key.
    pub fn find(&self, key: &str) -> Option<usize> {
        let found = self.table.get(key).copied();
        if found.is_some() {
            log::trace!("{} cache hit: {}", self.name, key);
        }
        found
    }

    /// Store an index, replacing any previous one, and return it.
    pub fn save(&mut self, key: impl Into<String>, index: usize) -> usize {
        let key = key.into();
        log::trace!("{} cache store: {}", self.name, key);
        self.table.insert(key, index);
        index
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
