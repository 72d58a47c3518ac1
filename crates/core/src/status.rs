// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only sync status snapshot for presentation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::clock::Timestamp;
use crate::error::{Error, ErrorKind};
use crate::network::ConnectionQuality;
use crate::record::RecordId;

/// The last error a sync pass ran into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusError {
    pub kind: ErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<RecordId>,
    pub message: String,
}

impl From<&Error> for StatusError {
    fn from(err: &Error) -> Self {
        StatusError { kind: err.kind(), record_id: err.record_id().cloned(), message: err.to_string() }
    }
}

/// Derived view of the sync layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Queued changes, including rejected ones awaiting retry.
    pub pending_count: usize,
    pub is_syncing: bool,
    pub last_error: Option<StatusError>,
    pub last_synced_at: Option<Timestamp>,
    pub online: bool,
    pub quality: ConnectionQuality,
    pub unresolved_conflicts: usize,
}

impl SyncStatus {
    /// Coarse summary, most urgent condition first.
    pub fn state(&self) -> SyncState {
        if !self.online {
            SyncState::Offline
        } else if self.is_syncing {
            SyncState::Syncing
        } else if self.last_error.is_some() || self.unresolved_conflicts > 0 {
            SyncState::Error
        } else if self.pending_count > 0 {
            SyncState::Pending
        } else {
            SyncState::Synced
        }
    }
}

/// Coarse sync state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Offline,
    Syncing,
    Synced,
    Pending,
    Error,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Offline => "offline",
            SyncState::Syncing => "syncing",
            SyncState::Synced => "synced",
            SyncState::Pending => "pending",
            SyncState::Error => "error",
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
