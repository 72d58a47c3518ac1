// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! sitesync-core: building blocks for offline-first record sync
//!
//! This crate provides the synchronous pieces of the sync layer: records,
//! conflict detection and resolution, the coalescing change queue and its
//! key-value stores, connectivity classification, and the sync status view.
//! The async engine that drives them lives in the `sitesync` crate.

pub mod clock;
pub mod conflicts;
pub mod detect;
pub mod error;
pub mod network;
pub mod queue;
pub mod record;
pub mod resolve;
pub mod sqlite;
pub mod status;
pub mod store;

pub use clock::{format_timestamp, ClockSource, ManualClock, SystemClock, Timestamp};
pub use conflicts::ConflictRegistry;
pub use detect::{auto_merge, detect_conflict, Conflict, FieldDiff};
pub use error::{Error, ErrorKind, Result};
pub use network::{ConnectionQuality, ConnectivitySignal, NetworkEvent, NetworkEventKind, NetworkState};
pub use queue::{ChangeEntry, ChangeQueue, EnqueueOutcome, EnqueueReport, Priority};
pub use record::{fields_from_value, Fields, Record, RecordId};
pub use resolve::{
    apply_choice, merge_versions, resolve_conflict, Precedence, PrecedenceRules, Resolution,
    ResolutionChoice, ResolutionStrategy, Side,
};
pub use sqlite::SqliteStore;
pub use status::{StatusError, SyncState, SyncStatus};
pub use store::{KeyValueStore, MemoryStore};
