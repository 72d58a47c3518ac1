// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: helpers are shared across scenario files, and not every
// file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]
#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::Arc;

pub use serde_json::json;
pub use sitesync::{
    ChangeEntry, ConnectivitySignal, Fields, KeyValueStore, ManualClock, MemoryRemote, MemoryStore,
    NetworkObserver, Priority, Record, RecordId, ResolutionChoice, ResolutionStrategy, SyncConfig,
    SyncEngine, SyncOutcome, SyncState, SyncStatus, Timestamp,
};
pub use tempfile::TempDir;

pub fn id(s: &str) -> RecordId {
    RecordId::parse(s).unwrap()
}

pub fn fields(value: serde_json::Value) -> Fields {
    sitesync_core::fields_from_value(value).unwrap()
}

pub fn record(record_id: &str, updated_at: Timestamp, value: serde_json::Value) -> Record {
    Record::new(id(record_id), updated_at, fields(value))
}

pub fn change(record_id: &str, timestamp: Timestamp, value: serde_json::Value) -> ChangeEntry {
    ChangeEntry::new(id(record_id), fields(value), timestamp)
}

/// A device: engine, its network observer and a shared clock, talking to an
/// in-memory remote.
pub struct Device<S: KeyValueStore> {
    pub engine: SyncEngine<MemoryRemote, S>,
    pub remote: MemoryRemote,
    pub observer: Arc<NetworkObserver>,
    pub clock: ManualClock,
}

pub fn device(strategy: ResolutionStrategy) -> Device<MemoryStore> {
    device_with(SyncConfig { strategy, ..SyncConfig::default() }, MemoryStore::new(), MemoryRemote::new())
}

pub fn device_with<S: KeyValueStore>(config: SyncConfig, store: S, remote: MemoryRemote) -> Device<S> {
    let clock = ManualClock::new(1_000);
    let observer = Arc::new(NetworkObserver::new(Arc::new(clock.clone())));
    let engine = SyncEngine::new(&config, remote.clone(), store, Arc::clone(&observer)).unwrap();
    Device { engine, remote, observer, clock }
}

impl<S: KeyValueStore> Device<S> {
    pub fn go_online(&self) {
        self.observer.report(&ConnectivitySignal::online().with_effective_type("4g"));
    }

    pub fn go_offline(&self) {
        self.observer.report(&ConnectivitySignal::offline());
    }

    pub fn remote_fields(&self, record_id: &str) -> Fields {
        self.remote.record(&id(record_id)).unwrap().fields
    }
}

/// Runs an async scenario body on a fresh current-thread runtime.
pub fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(future)
}
