// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote store abstraction.
//!
//! The engine only needs to fetch the current remote version of a record and
//! write a new one. [`MemoryRemote`] is an in-process implementation with
//! failure injection, used by tests and demos.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use sitesync_core::{ClockSource, Fields, Record, RecordId, SystemClock, Timestamp};

/// Error type for remote operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Transient: network down, timeout, server overloaded. Retried.
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// The remote refused the write. Not retried.
    #[error("remote rejected write: {0}")]
    Rejected(String),
}

impl RemoteError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, RemoteError::Unavailable(_))
    }
}

/// Result type for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Acknowledgement of an accepted write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteConfirmation {
    /// Remote last-modified time of the stored version.
    pub updated_at: Timestamp,
}

/// Remote persistence collaborator.
pub trait RemoteStore: Send + Sync {
    /// Fetches the current remote version, `None` if the record does not exist.
    fn fetch(
        &self,
        id: &RecordId,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<Option<Record>>> + Send + '_>>;

    /// Stores `fields` as the new remote version of the record.
    fn write(
        &self,
        id: &RecordId,
        fields: &Fields,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<WriteConfirmation>> + Send + '_>>;
}

impl<R: RemoteStore + ?Sized> RemoteStore for Arc<R> {
    fn fetch(
        &self,
        id: &RecordId,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<Option<Record>>> + Send + '_>> {
        (**self).fetch(id)
    }

    fn write(
        &self,
        id: &RecordId,
        fields: &Fields,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<WriteConfirmation>> + Send + '_>> {
        (**self).write(id, fields)
    }
}

/// In-memory remote store.
///
/// Clones share state, so a test can keep a handle to inspect writes after
/// handing the store to an engine. Writes replace the record's fields and
/// stamp it from the clock.
#[derive(Clone)]
pub struct MemoryRemote {
    inner: Arc<Mutex<MemoryRemoteState>>,
    clock: Arc<dyn ClockSource>,
}

#[derive(Default)]
struct MemoryRemoteState {
    records: BTreeMap<RecordId, Record>,
    /// Accepted writes in arrival order.
    writes: Vec<(RecordId, Fields)>,
    /// Fetched ids in arrival order.
    fetches: Vec<RecordId>,
    /// Errors returned by the next calls, one per call.
    scripted: VecDeque<RemoteError>,
    /// Records whose writes are always rejected.
    read_only: BTreeSet<RecordId>,
    unavailable: bool,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn ClockSource>) -> Self {
        MemoryRemote { inner: Arc::new(Mutex::new(MemoryRemoteState::default())), clock }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryRemoteState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seeds or overwrites a record, as if another device had written it.
    pub fn insert(&self, record: Record) {
        self.lock().records.insert(record.id.clone(), record);
    }

    pub fn record(&self, id: &RecordId) -> Option<Record> {
        self.lock().records.get(id).cloned()
    }

    /// Accepted writes in arrival order.
    pub fn writes(&self) -> Vec<(RecordId, Fields)> {
        self.lock().writes.clone()
    }

    /// Fetched ids in arrival order.
    pub fn fetches(&self) -> Vec<RecordId> {
        self.lock().fetches.clone()
    }

    /// Makes the next call (fetch or write) fail with `error`.
    pub fn fail_next(&self, error: RemoteError) {
        self.lock().scripted.push_back(error);
    }

    /// Rejects every write to `id`.
    pub fn set_read_only(&self, id: RecordId) {
        self.lock().read_only.insert(id);
    }

    /// Fails every call as unavailable until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    fn check_failure(state: &mut MemoryRemoteState) -> RemoteResult<()> {
        if let Some(error) = state.scripted.pop_front() {
            return Err(error);
        }
        if state.unavailable {
            return Err(RemoteError::Unavailable("remote is offline".to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteStore for MemoryRemote {
    fn fetch(
        &self,
        id: &RecordId,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<Option<Record>>> + Send + '_>> {
        let id = id.clone();
        Box::pin(async move {
            let mut state = self.lock();
            state.fetches.push(id.clone());
            Self::check_failure(&mut state)?;
            Ok(state.records.get(&id).cloned())
        })
    }

    fn write(
        &self,
        id: &RecordId,
        fields: &Fields,
    ) -> Pin<Box<dyn Future<Output = RemoteResult<WriteConfirmation>> + Send + '_>> {
        let id = id.clone();
        let fields = fields.clone();
        Box::pin(async move {
            let now = self.clock.now_ms();
            let mut state = self.lock();
            Self::check_failure(&mut state)?;
            if state.read_only.contains(&id) {
                return Err(RemoteError::Rejected(format!("{id} is read-only")));
            }

            // keep remote versions strictly increasing even under a frozen clock
            let updated_at = state.records.get(&id).map_or(now, |r| now.max(r.updated_at + 1));
            state.writes.push((id.clone(), fields.clone()));
            state.records.insert(id.clone(), Record::new(id, updated_at, fields));
            Ok(WriteConfirmation { updated_at })
        })
    }
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
