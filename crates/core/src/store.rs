// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Local key-value persistence used by the change queue.
//!
//! The queue only needs get/set/delete and a prefix scan to reload itself.
//! [`MemoryStore`] keeps everything in process and can be given a byte quota
//! to behave like browser local storage; [`crate::sqlite::SqliteStore`] is the
//! durable implementation.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Key-value persistence collaborator.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a value.
    ///
    /// Implementations with limited space return [`Error::StorageFull`] so the
    /// caller can evict and retry.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Removes a key. Removing a missing key is not an error.
    fn delete(&mut self, key: &str) -> Result<()>;

    /// All keys starting with `prefix`, sorted.
    fn keys(&self, prefix: &str) -> Result<Vec<String>>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        (**self).delete(key)
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        (**self).keys(prefix)
    }
}

/// In-process store with an optional byte quota.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that refuses writes once keys plus values exceed
    /// `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        MemoryStore { entries: BTreeMap::new(), quota_bytes: Some(quota_bytes) }
    }

    /// Bytes used by keys and values.
    pub fn used_bytes(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if let Some(quota) = self.quota_bytes {
            let current = self.entries.get(key).map_or(0, |old| key.len() + old.len());
            let after = self.used_bytes() - current + key.len() + value.len();
            if after > quota {
                return Err(Error::StorageFull);
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self.entries.keys().filter(|k| k.starts_with(prefix)).cloned().collect())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
