// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! sitesync: offline-first sync runtime
//!
//! Queues local edits while the device is offline and reconciles them with
//! the remote store when it comes back, detecting and resolving conflicts
//! per record.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Engine    │────►│ RemoteStore │────►│   Remote    │
//! │(SyncEngine) │◄────│   (trait)   │◄────│   Backend   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!    │     ▲  │
//!    │     │  └──────────────► ConflictPrompt ──► UI
//!    ▼     │
//! ┌─────────────┐     ┌─────────────┐
//! │ ChangeQueue │     │  Network    │
//! │ (KV store)  │     │  Observer   │
//! └─────────────┘     └─────────────┘
//! ```
//!
//! # Features
//!
//! - Coalescing change queue persisted through a key-value store
//! - Field-level conflict detection with auto-merge of disjoint edits
//! - Last-write-wins, server-wins, local-wins or manual resolution
//! - Capped exponential backoff for an unavailable remote
//! - Single-flight sync passes triggered by reconnects and a timer
//! - Status published on a watch channel
//!
//! The building blocks live in `sitesync-core` and are re-exported here.

pub mod backoff;
pub mod config;
pub mod engine;
pub mod error;
pub mod manual;
pub mod observer;
pub mod remote;

pub use backoff::Backoff;
pub use config::{QueueConfig, RetryConfig, SyncConfig, CONFIG_FILE_NAME};
pub use engine::{PassSummary, ResolveOutcome, SyncEngine, SyncOutcome};
pub use error::{SyncError, SyncResult};
pub use manual::{manual_channel, ConflictPrompt, ManualResolver, PromptReceiver};
pub use observer::NetworkObserver;
pub use remote::{MemoryRemote, RemoteError, RemoteResult, RemoteStore, WriteConfirmation};

pub use sitesync_core::{
    ChangeEntry, ClockSource, Conflict, ConnectionQuality, ConnectivitySignal, EnqueueOutcome,
    EnqueueReport, Error, ErrorKind, FieldDiff, Fields, KeyValueStore, ManualClock, MemoryStore,
    NetworkEvent, NetworkEventKind, NetworkState, Precedence, Priority, Record, RecordId,
    ResolutionChoice, ResolutionStrategy, Side, SqliteStore, StatusError, SyncState, SyncStatus,
    SystemClock, Timestamp,
};
