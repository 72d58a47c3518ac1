// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Records: one persisted business entity as a field mapping.
//!
//! A record is deliberately opaque to this crate. An inspection, an NCR and a
//! site instruction all look the same here: an id, a last-modified stamp and a
//! JSON object of domain fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::clock::Timestamp;
use crate::error::{Error, Result};

/// Domain fields of a record.
pub type Fields = serde_json::Map<String, Value>;

/// Identifier of a record, e.g. `inspections:42`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Parses an identifier, rejecting empty or whitespace-only input.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("record id must not be empty".to_string()));
        }
        Ok(RecordId(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RecordId::parse(s)
    }
}

/// One version of a business entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    /// Last-modified time of this version.
    pub updated_at: Timestamp,
    #[serde(default)]
    pub fields: Fields,
}

impl Record {
    pub fn new(id: RecordId, updated_at: Timestamp, fields: Fields) -> Self {
        Record { id, updated_at, fields }
    }

    /// Looks up a field, treating a missing field as `null`.
    pub fn field(&self, name: &str) -> &Value {
        self.fields.get(name).unwrap_or(&Value::Null)
    }

    /// Returns a copy with `changes` written over this record's fields.
    pub fn overlaid(&self, changes: &Fields, updated_at: Timestamp) -> Record {
        let mut fields = self.fields.clone();
        for (name, value) in changes {
            fields.insert(name.clone(), value.clone());
        }
        Record { id: self.id.clone(), updated_at, fields }
    }
}

/// Converts a JSON value into a field map.
///
/// Only objects are accepted; anything else is an input error.
pub fn fields_from_value(value: Value) -> Result<Fields> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidInput(format!("record fields must be a JSON object, got {other}"))),
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
