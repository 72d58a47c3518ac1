// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Registry of unresolved conflicts.
//!
//! Holds at most one conflict per record. Resolving starts with [`take`],
//! which removes the conflict under the lock: of two concurrent attempts only
//! one gets it, the other sees `None` and treats the conflict as already
//! resolved.
//!
//! [`take`]: ConflictRegistry::take

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::detect::Conflict;
use crate::record::RecordId;

/// Thread-safe map of record id to its outstanding conflict.
#[derive(Debug, Default)]
pub struct ConflictRegistry {
    conflicts: Mutex<BTreeMap<RecordId, Conflict>>,
}

impl ConflictRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<RecordId, Conflict>> {
        self.conflicts.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers a conflict, returning the one it replaced.
    pub fn open(&self, conflict: Conflict) -> Option<Conflict> {
        self.lock().insert(conflict.record_id.clone(), conflict)
    }

    /// Removes and returns the conflict so the caller can resolve it.
    pub fn take(&self, id: &RecordId) -> Option<Conflict> {
        self.lock().remove(id)
    }

    /// Drops the conflict because a newer local change replaced it.
    pub fn supersede(&self, id: &RecordId) -> bool {
        let removed = self.lock().remove(id).is_some();
        if removed {
            tracing::debug!(record = %id, "conflict superseded by a newer local change");
        }
        removed
    }

    pub fn get(&self, id: &RecordId) -> Option<Conflict> {
        self.lock().get(id).cloned()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Ids with an outstanding conflict, sorted.
    pub fn record_ids(&self) -> Vec<RecordId> {
        self.lock().keys().cloned().collect()
    }
}

#[cfg(test)]
#[path = "conflicts_tests.rs"]
mod tests;
