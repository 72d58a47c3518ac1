// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Collapsing a [`Conflict`] into one record.
//!
//! Resolution rules:
//! - LastWriteWins: the strictly newer side wins wholesale; ties go to local
//! - ServerWins / LocalWins: the named side wins wholesale
//! - Manual: nothing is picked; the caller must ask a human
//!
//! [`merge_versions`] is the field-level alternative used when both sides
//! should contribute: configured precedence per field path first, then local
//! when non-null, else remote. Nested objects merge recursively.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::detect::Conflict;
use crate::error::{Error, Result};
use crate::record::{Fields, Record};

/// Named policy used to collapse a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStrategy {
    /// Newer timestamp wins; ties go to local.
    #[default]
    LastWriteWins,
    /// Remote version always wins.
    ServerWins,
    /// Local version always wins.
    LocalWins,
    /// Wait for a human decision.
    Manual,
}

impl ResolutionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStrategy::LastWriteWins => "last-write-wins",
            ResolutionStrategy::ServerWins => "server-wins",
            ResolutionStrategy::LocalWins => "local-wins",
            ResolutionStrategy::Manual => "manual",
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResolutionStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "last-write-wins" | "lww" => Ok(ResolutionStrategy::LastWriteWins),
            "server-wins" | "remote-wins" => Ok(ResolutionStrategy::ServerWins),
            "local-wins" | "client-wins" => Ok(ResolutionStrategy::LocalWins),
            "manual" => Ok(ResolutionStrategy::Manual),
            _ => Err(Error::InvalidStrategy(s.to_string())),
        }
    }
}

/// Which version a resolution kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Local,
    Remote,
    /// Both sides contributed fields.
    Merged,
}

/// Outcome of [`resolve_conflict`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved { winner: Side, record: Record },
    /// Manual strategy: no automatic decision was made.
    AwaitingInput,
}

impl Resolution {
    pub fn record(&self) -> Option<&Record> {
        match self {
            Resolution::Resolved { record, .. } => Some(record),
            Resolution::AwaitingInput => None,
        }
    }
}

/// Applies `strategy` to `conflict`.
pub fn resolve_conflict(conflict: &Conflict, strategy: ResolutionStrategy) -> Resolution {
    let winner = match strategy {
        ResolutionStrategy::LastWriteWins => {
            if conflict.remote.updated_at > conflict.local.updated_at {
                Side::Remote
            } else {
                Side::Local
            }
        }
        ResolutionStrategy::ServerWins => Side::Remote,
        ResolutionStrategy::LocalWins => Side::Local,
        ResolutionStrategy::Manual => return Resolution::AwaitingInput,
    };

    let record = match winner {
        Side::Remote => conflict.remote.clone(),
        _ => conflict.local.clone(),
    };
    Resolution::Resolved { winner, record }
}

/// A human decision for a manual conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "choice", content = "fields")]
pub enum ResolutionChoice {
    KeepLocal,
    KeepRemote,
    /// Fields assembled by the caller, e.g. from a merge editor.
    Merged(Fields),
}

/// Turns a manual decision into the resolved record.
///
/// A merged record is stamped with the newer of the two timestamps.
pub fn apply_choice(conflict: &Conflict, choice: &ResolutionChoice) -> (Side, Record) {
    match choice {
        ResolutionChoice::KeepLocal => (Side::Local, conflict.local.clone()),
        ResolutionChoice::KeepRemote => (Side::Remote, conflict.remote.clone()),
        ResolutionChoice::Merged(fields) => {
            let updated_at = conflict.local.updated_at.max(conflict.remote.updated_at);
            (Side::Merged, Record::new(conflict.record_id.clone(), updated_at, fields.clone()))
        }
    }
}

/// Which side a field-level merge prefers for one field path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precedence {
    Local,
    Remote,
    /// The side with the newer record timestamp; ties go to local.
    Newer,
}

impl FromStr for Precedence {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Precedence::Local),
            "remote" | "server" => Ok(Precedence::Remote),
            "newer" => Ok(Precedence::Newer),
            _ => Err(Error::InvalidPrecedence(s.to_string())),
        }
    }
}

/// Per-field precedence, keyed by dotted path (`location.notes`).
pub type PrecedenceRules = BTreeMap<String, Precedence>;

/// Field-level merge of two versions.
///
/// For every field whose values differ: a rule for the field path decides;
/// without one, local wins when non-null, else remote. Two object values are
/// merged recursively with the same rules instead of being replaced.
pub fn merge_versions(local: &Record, remote: &Record, rules: &PrecedenceRules) -> Fields {
    let local_is_newer = local.updated_at >= remote.updated_at;
    merge_fields(&local.fields, &remote.fields, rules, "", local_is_newer)
}

fn merge_fields(
    local: &Fields,
    remote: &Fields,
    rules: &PrecedenceRules,
    prefix: &str,
    local_is_newer: bool,
) -> Fields {
    let mut merged = Fields::new();
    let names = local.keys().chain(remote.keys().filter(|name| !local.contains_key(*name)));

    for name in names {
        let path = if prefix.is_empty() { name.clone() } else { format!("{prefix}.{name}") };
        let local_value = local.get(name).unwrap_or(&Value::Null);
        let remote_value = remote.get(name).unwrap_or(&Value::Null);

        let value = if local_value == remote_value {
            local_value.clone()
        } else if let Some(rule) = rules.get(&path) {
            let take_local = match rule {
                Precedence::Local => true,
                Precedence::Remote => false,
                Precedence::Newer => local_is_newer,
            };
            if take_local { local_value.clone() } else { remote_value.clone() }
        } else if let (Value::Object(l), Value::Object(r)) = (local_value, remote_value) {
            Value::Object(merge_fields(l, r, rules, &path, local_is_newer))
        } else if !local_value.is_null() {
            local_value.clone()
        } else {
            remote_value.clone()
        };

        merged.insert(name.clone(), value);
    }

    merged
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
