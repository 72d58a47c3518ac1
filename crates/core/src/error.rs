// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for sitesync-core operations.

use thiserror::Error;

use crate::record::RecordId;

/// All possible errors that can occur in sitesync-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("network unavailable\n  hint: queued changes are kept and retried when the device is back online")]
    NetworkUnavailable,

    #[error("remote rejected write for {record_id}: {reason}")]
    RemoteRejected { record_id: RecordId, reason: String },

    #[error("conflict on {0} is waiting for a manual decision")]
    ConflictUnresolved(RecordId),

    #[error("local queue storage exhausted: evicted {} pending change(s): {}", .evicted.len(), join_ids(.evicted))]
    StorageExhausted { evicted: Vec<RecordId> },

    #[error("local storage is full")]
    StorageFull,

    #[error("invalid resolution strategy: '{0}'\n  hint: valid strategies are: last-write-wins, server-wins, local-wins, manual")]
    InvalidStrategy(String),

    #[error("invalid priority: '{0}'\n  hint: valid priorities are: low, normal, high, critical")]
    InvalidPriority(String),

    #[error("invalid precedence: '{0}'\n  hint: valid precedences are: local, remote, newer")]
    InvalidPrecedence(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Coarse classification used by the sync status surface.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NetworkUnavailable => ErrorKind::NetworkUnavailable,
            Error::RemoteRejected { .. } => ErrorKind::RemoteRejected,
            Error::ConflictUnresolved(_) => ErrorKind::ConflictUnresolved,
            Error::StorageExhausted { .. } | Error::StorageFull => ErrorKind::StorageExhausted,
            _ => ErrorKind::Internal,
        }
    }

    /// The record this error is about, if it concerns a single record.
    pub fn record_id(&self) -> Option<&RecordId> {
        match self {
            Error::RemoteRejected { record_id, .. } => Some(record_id),
            Error::ConflictUnresolved(id) => Some(id),
            Error::StorageExhausted { evicted } => match evicted.as_slice() {
                [only] => Some(only),
                _ => None,
            },
            _ => None,
        }
    }
}

fn join_ids(ids: &[RecordId]) -> String {
    ids.iter().map(RecordId::as_str).collect::<Vec<_>>().join(", ")
}

/// Error taxonomy exposed to status consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NetworkUnavailable,
    RemoteRejected,
    ConflictUnresolved,
    StorageExhausted,
    Internal,
}

/// A specialized Result type for sitesync-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
