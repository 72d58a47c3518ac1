// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Local change queue for edits made while offline.
//!
//! Holds at most one pending entry per record. A newer edit replaces the
//! queued one; an edit older than what is queued is dropped as stale. Each
//! entry is written through to a [`KeyValueStore`] under `queue/<record id>`
//! so the queue survives a restart, but the in-memory copy is authoritative:
//! store failures are logged and reported, never fatal.
//!
//! When the queue is full (by entry count or because the store ran out of
//! space) the lowest-priority entry is evicted, oldest first.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::clock::Timestamp;
use crate::error::{Error, Result};
use crate::record::{Fields, RecordId};
use crate::store::KeyValueStore;

/// Key prefix of persisted queue entries.
pub const QUEUE_PREFIX: &str = "queue/";

/// Explicit priority hint for a queued change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    /// Safety-relevant records (stop-work NCRs, incident reports).
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            _ => Err(Error::InvalidPriority(s.to_string())),
        }
    }
}

/// A pending local modification awaiting transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub record_id: RecordId,
    /// Proposed field values, partial or complete.
    pub fields: Fields,
    /// When the local edit was made.
    pub timestamp: Timestamp,
    #[serde(default)]
    pub priority: Priority,
    /// Insertion order, assigned by the queue.
    #[serde(default)]
    pub seq: u64,
    /// Snapshot of the record the edit started from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<Fields>,
    /// Failed remote writes so far.
    #[serde(default)]
    pub attempts: u32,
    /// The remote refused this change; skipped until retried.
    #[serde(default)]
    pub rejected: bool,
}

impl ChangeEntry {
    pub fn new(record_id: RecordId, fields: Fields, timestamp: Timestamp) -> Self {
        ChangeEntry {
            record_id,
            fields,
            timestamp,
            priority: Priority::default(),
            seq: 0,
            base: None,
            attempts: 0,
            rejected: false,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_base(mut self, base: Fields) -> Self {
        self.base = Some(base);
        self
    }
}

/// What [`ChangeQueue::enqueue`] did with the incoming entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// First pending change for the record.
    Inserted,
    /// Replaced an older pending change for the record.
    Replaced,
    /// Older than the queued change; discarded.
    Stale,
}

/// Result of an enqueue, including anything lost to make room.
#[derive(Debug)]
pub struct EnqueueReport {
    pub outcome: EnqueueOutcome,
    /// Entries dropped to make room, in eviction order.
    pub evicted: Vec<ChangeEntry>,
    /// Eviction notice and store failures, in the order they happened.
    pub warnings: Vec<Error>,
}

impl EnqueueReport {
    fn new(outcome: EnqueueOutcome) -> Self {
        EnqueueReport { outcome, evicted: Vec::new(), warnings: Vec::new() }
    }

    /// The latest warning; a failed store write comes after the eviction
    /// notice.
    pub fn warning(&self) -> Option<&Error> {
        self.warnings.last()
    }

    /// Whether the incoming change is now pending.
    pub fn accepted(&self) -> bool {
        self.outcome != EnqueueOutcome::Stale
    }
}

/// Coalescing, persistent queue of pending changes.
pub struct ChangeQueue<S> {
    store: S,
    entries: BTreeMap<RecordId, ChangeEntry>,
    capacity: usize,
    next_seq: u64,
}

impl<S: KeyValueStore> ChangeQueue<S> {
    /// Opens a queue over `store`, reloading any persisted entries.
    ///
    /// Entries that no longer parse are logged and skipped.
    pub fn open(store: S, capacity: usize) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for key in store.keys(QUEUE_PREFIX)? {
            let Some(raw) = store.get(&key)? else {
                continue;
            };
            match serde_json::from_str::<ChangeEntry>(&raw) {
                Ok(entry) => {
                    entries.insert(entry.record_id.clone(), entry);
                }
                Err(e) => tracing::warn!(key = %key, error = %e, "skipping unreadable queue entry"),
            }
        }

        let next_seq = entries.values().map(|e| e.seq).max().unwrap_or(0) + 1;
        if !entries.is_empty() {
            tracing::debug!(count = entries.len(), "reloaded pending changes");
        }

        Ok(ChangeQueue { store, entries, capacity: capacity.max(1), next_seq })
    }

    /// Adds a change, coalescing with any pending change for the same record.
    pub fn enqueue(&mut self, mut entry: ChangeEntry) -> EnqueueReport {
        let id = entry.record_id.clone();

        let outcome = match self.entries.get(&id) {
            Some(existing) if existing.timestamp > entry.timestamp => {
                tracing::debug!(
                    record = %id,
                    queued = existing.timestamp,
                    incoming = entry.timestamp,
                    "dropping stale change"
                );
                return EnqueueReport::new(EnqueueOutcome::Stale);
            }
            Some(existing) => {
                if entry.base.is_none() {
                    entry.base = existing.base.clone();
                }
                EnqueueOutcome::Replaced
            }
            None => EnqueueOutcome::Inserted,
        };

        entry.seq = self.next_seq;
        self.next_seq += 1;
        entry.attempts = 0;
        entry.rejected = false;

        let mut report = EnqueueReport::new(outcome);
        if outcome == EnqueueOutcome::Inserted && self.entries.len() >= self.capacity {
            if let Some(evicted) = self.evict_one(&id, None) {
                report.evicted.push(evicted);
            }
        }

        let result = self.persist_with_eviction(&entry, &mut report);
        self.entries.insert(id, entry);

        if !report.evicted.is_empty() {
            let evicted = report.evicted.iter().map(|e| e.record_id.clone()).collect();
            report.warnings.push(Error::StorageExhausted { evicted });
        }
        if let Err(e) = result {
            tracing::warn!(error = %e, "queue entry kept in memory only");
            report.warnings.push(e);
        }
        report
    }

    /// Writes `entry`, evicting entries that rank below it while the store
    /// reports full.
    ///
    /// If the entry still does not fit once nothing below it is left, the
    /// entries evicted for it are put back.
    fn persist_with_eviction(&mut self, entry: &ChangeEntry, report: &mut EnqueueReport) -> Result<()> {
        let rank = (entry.priority, entry.seq);
        let mut freed = Vec::new();
        let result = loop {
            match self.persist(entry) {
                Err(Error::StorageFull) => match self.evict_one(&entry.record_id, Some(rank)) {
                    Some(evicted) => freed.push(evicted),
                    None => break Err(Error::StorageFull),
                },
                other => break other,
            }
        };

        if result.is_err() && !freed.is_empty() {
            tracing::warn!(
                record = %entry.record_id,
                restored = freed.len(),
                "change does not fit in storage, restoring evicted changes"
            );
            for evicted in freed.drain(..) {
                self.persist_or_warn(&evicted);
                self.entries.insert(evicted.record_id.clone(), evicted);
            }
        }
        report.evicted.extend(freed);
        result
    }

    /// Removes the lowest-priority, oldest entry other than `keep`, if it
    /// ranks below `ceiling`.
    fn evict_one(&mut self, keep: &RecordId, ceiling: Option<(Priority, u64)>) -> Option<ChangeEntry> {
        let victim = self
            .entries
            .values()
            .filter(|e| &e.record_id != keep)
            .min_by_key(|e| (e.priority, e.seq))
            .filter(|e| ceiling.is_none_or(|rank| (e.priority, e.seq) < rank))
            .map(|e| e.record_id.clone())?;

        let evicted = self.entries.remove(&victim)?;
        self.unpersist(&victim);
        tracing::warn!(
            record = %victim,
            priority = %evicted.priority,
            "queue full, evicted pending change"
        );
        Some(evicted)
    }

    /// Removes the pending change for `id`.
    pub fn dequeue(&mut self, id: &RecordId) -> Option<ChangeEntry> {
        let entry = self.entries.remove(id)?;
        self.unpersist(id);
        Some(entry)
    }

    /// Removes the entry only if it is still the one that was sent.
    ///
    /// Returns false when a newer edit replaced it while the write was in
    /// flight; that edit stays queued.
    pub fn confirm(&mut self, id: &RecordId, seq: u64) -> bool {
        match self.entries.get(id) {
            Some(entry) if entry.seq == seq => {
                self.dequeue(id);
                true
            }
            _ => false,
        }
    }

    /// Records a failed write. A rejected entry is kept but skipped by
    /// [`pending`](Self::pending) until [`retry`](Self::retry).
    pub fn mark_failed(&mut self, id: &RecordId, rejected: bool) -> bool {
        let Some(entry) = self.entries.get_mut(id) else {
            return false;
        };
        entry.attempts += 1;
        entry.rejected |= rejected;
        let entry = entry.clone();
        self.persist_or_warn(&entry);
        true
    }

    /// Makes a rejected entry eligible for sending again.
    pub fn retry(&mut self, id: &RecordId) -> bool {
        let Some(entry) = self.entries.get_mut(id) else {
            return false;
        };
        entry.rejected = false;
        entry.attempts = 0;
        let entry = entry.clone();
        self.persist_or_warn(&entry);
        true
    }

    pub fn get(&self, id: &RecordId) -> Option<&ChangeEntry> {
        self.entries.get(id)
    }

    /// All entries, highest priority first, then by insertion order.
    pub fn peek_all(&self) -> Vec<ChangeEntry> {
        let mut entries: Vec<ChangeEntry> = self.entries.values().cloned().collect();
        entries.sort_by_key(|e| (Reverse(e.priority), e.seq));
        entries
    }

    /// Entries eligible for an automatic pass, in send order.
    pub fn pending(&self) -> Vec<ChangeEntry> {
        self.peek_all().into_iter().filter(|e| !e.rejected).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Drops every pending change.
    pub fn clear(&mut self) {
        let ids: Vec<RecordId> = self.entries.keys().cloned().collect();
        self.entries.clear();
        for id in &ids {
            self.unpersist(id);
        }
    }

    fn persist(&mut self, entry: &ChangeEntry) -> Result<()> {
        let json = serde_json::to_string(entry)?;
        self.store.set(&entry_key(&entry.record_id), &json)
    }

    fn persist_or_warn(&mut self, entry: &ChangeEntry) {
        if let Err(e) = self.persist(entry) {
            tracing::warn!(record = %entry.record_id, error = %e, "failed to persist queue entry");
        }
    }

    fn unpersist(&mut self, id: &RecordId) {
        if let Err(e) = self.store.delete(&entry_key(id)) {
            tracing::warn!(record = %id, error = %e, "failed to delete queue entry");
        }
    }
}

fn entry_key(id: &RecordId) -> String {
    format!("{QUEUE_PREFIX}{id}")
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
