// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Conflict detection between a local and a remote version of a record.
//!
//! A newer timestamp alone never makes a conflict. Two versions only conflict
//! when both sides changed the same field to different values:
//!
//! - identical field maps: no conflict, whatever the timestamps say
//! - disjoint changed-field sets: no conflict, the sides are auto-mergeable
//! - overlapping changed fields with differing values: a [`Conflict`] whose
//!   diff lists exactly those fields
//!
//! The changed-field set of a side is computed against the `base` version the
//! local edit started from. Without a base there is nothing to compare to, so
//! every differing field counts as changed on both sides.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::clock::Timestamp;
use crate::record::{Fields, Record, RecordId};

/// Local and remote values of one conflicting field.
///
/// A field missing on one side is reported as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDiff {
    pub local: Value,
    pub remote: Value,
}

/// A detected disagreement between two versions of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub record_id: RecordId,
    pub local: Record,
    pub remote: Record,
    /// Field name to the two disagreeing values.
    pub diff: BTreeMap<String, FieldDiff>,
}

impl Conflict {
    pub fn local_timestamp(&self) -> Timestamp {
        self.local.updated_at
    }

    pub fn remote_timestamp(&self) -> Timestamp {
        self.remote.updated_at
    }

    /// Names of the conflicting fields, sorted.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.diff.keys().map(String::as_str)
    }
}

/// Decides whether `local` and `remote` disagree in a way that needs resolving.
///
/// Returns `None` when the versions are equal or only touched disjoint fields.
pub fn detect_conflict(local: &Record, remote: &Record, base: Option<&Fields>) -> Option<Conflict> {
    if local.fields == remote.fields {
        return None;
    }

    let local_changed = changed_fields(&local.fields, &remote.fields, base);
    let remote_changed = changed_fields(&remote.fields, &local.fields, base);

    let diff: BTreeMap<String, FieldDiff> = local_changed
        .intersection(&remote_changed)
        .filter_map(|name| {
            let local_value = field_or_null(&local.fields, name);
            let remote_value = field_or_null(&remote.fields, name);
            (local_value != remote_value).then(|| {
                (
                    name.clone(),
                    FieldDiff { local: local_value.clone(), remote: remote_value.clone() },
                )
            })
        })
        .collect();

    if diff.is_empty() {
        return None;
    }

    Some(Conflict { record_id: local.id.clone(), local: local.clone(), remote: remote.clone(), diff })
}

/// Combines two versions whose changes do not overlap.
///
/// Starts from the remote fields and writes over them every field the local
/// side changed. When the changes do overlap the local value is taken, so
/// callers should only use this after [`detect_conflict`] returned `None`.
pub fn auto_merge(local: &Record, remote: &Record, base: Option<&Fields>) -> Fields {
    let mut merged = remote.fields.clone();
    for name in changed_fields(&local.fields, &remote.fields, base) {
        match local.fields.get(&name) {
            Some(value) => {
                merged.insert(name, value.clone());
            }
            None => {
                merged.remove(&name);
            }
        }
    }
    merged
}

/// Fields `side` changed: against `base` when known, otherwise every field on
/// which `side` and `other` differ.
fn changed_fields(side: &Fields, other: &Fields, base: Option<&Fields>) -> BTreeSet<String> {
    let reference = base.unwrap_or(other);
    side.keys()
        .chain(reference.keys())
        .filter(|name| field_or_null(side, name) != field_or_null(reference, name))
        .cloned()
        .collect()
}

fn field_or_null<'a>(fields: &'a Fields, name: &str) -> &'a Value {
    fields.get(name).unwrap_or(&Value::Null)
}

#[cfg(test)]
#[path = "detect_tests.rs"]
mod tests;
