// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync configuration.
//!
//! Read from a TOML file (conventionally `sitesync.toml`). Every key is
//! optional:
//!
//! ```toml
//! strategy = "last-write-wins"
//! sync_interval_secs = 60
//!
//! [queue]
//! capacity = 500
//!
//! [retry]
//! max_retries = 5
//! initial_delay_ms = 200
//! max_delay_ms = 30000
//!
//! [precedence]
//! "status" = "remote"
//! "location.notes" = "local"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use sitesync_core::{PrecedenceRules, ResolutionStrategy};

use crate::error::{SyncError, SyncResult};

/// Conventional file name for the configuration.
pub const CONFIG_FILE_NAME: &str = "sitesync.toml";

/// Top-level sync configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Strategy applied to detected conflicts.
    #[serde(default)]
    pub strategy: ResolutionStrategy,
    /// Seconds between periodic passes while online. 0 disables them.
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    /// Field path to preferred side for suggested merges.
    #[serde(default, skip_serializing_if = "PrecedenceRules::is_empty")]
    pub precedence: PrecedenceRules,
}

/// Change queue limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of pending (coalesced) changes.
    #[serde(default = "default_queue_capacity")]
    pub capacity: usize,
}

/// Backoff for remote calls that fail with the remote unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_sync_interval_secs() -> u64 {
    60
}

fn default_queue_capacity() -> usize {
    500
}

fn default_max_retries() -> u32 {
    5
}

fn default_initial_delay_ms() -> u64 {
    200
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            strategy: ResolutionStrategy::default(),
            sync_interval_secs: default_sync_interval_secs(),
            queue: QueueConfig::default(),
            retry: RetryConfig::default(),
            precedence: PrecedenceRules::new(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig { capacity: default_queue_capacity() }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl SyncConfig {
    /// Loads configuration from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> SyncResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(SyncConfig::default());
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_toml_str(&content)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> SyncResult<Self> {
        let config: SyncConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.queue.capacity == 0 {
            return Err(SyncError::Config("queue.capacity must be greater than 0".to_string()));
        }
        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            return Err(SyncError::Config(format!(
                "retry.initial_delay_ms ({}) must not exceed retry.max_delay_ms ({})",
                self.retry.initial_delay_ms, self.retry.max_delay_ms
            )));
        }
        if let Some(path) = self.precedence.keys().find(|p| p.split('.').any(str::is_empty)) {
            return Err(SyncError::Config(format!("invalid precedence field path '{path}'")));
        }
        Ok(())
    }

    /// Serializes to TOML.
    pub fn to_toml_string(&self) -> SyncResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| SyncError::Config(format!("failed to serialize config: {e}")))
    }

    /// Interval between periodic passes, if enabled.
    pub fn sync_interval(&self) -> Option<Duration> {
        (self.sync_interval_secs > 0).then(|| Duration::from_secs(self.sync_interval_secs))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
