// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use sitesync_core::Precedence;
use tempfile::TempDir;
use yare::parameterized;

#[test]
fn empty_document_yields_defaults() {
    let config = SyncConfig::from_toml_str("").unwrap();
    assert_eq!(config, SyncConfig::default());
    assert_eq!(config.strategy, ResolutionStrategy::LastWriteWins);
    assert_eq!(config.sync_interval_secs, 60);
    assert_eq!(config.queue.capacity, 500);
    assert_eq!(config.retry.max_retries, 5);
    assert_eq!(config.retry.initial_delay_ms, 200);
    assert_eq!(config.retry.max_delay_ms, 30_000);
}

#[test]
fn full_document() {
    let config = SyncConfig::from_toml_str(
        r#"
strategy = "manual"
sync_interval_secs = 0

[queue]
capacity = 20

[retry]
max_retries = 2

[precedence]
"status" = "remote"
"location.notes" = "local"
"#,
    )
    .unwrap();

    assert_eq!(config.strategy, ResolutionStrategy::Manual);
    assert_eq!(config.sync_interval(), None);
    assert_eq!(config.queue.capacity, 20);
    assert_eq!(config.retry.max_retries, 2);
    assert_eq!(config.retry.initial_delay_ms, 200);
    assert_eq!(config.precedence["status"], Precedence::Remote);
    assert_eq!(config.precedence["location.notes"], Precedence::Local);
}

#[parameterized(
    zero_capacity = { "[queue]\ncapacity = 0" },
    inverted_delays = { "[retry]\ninitial_delay_ms = 5000\nmax_delay_ms = 100" },
    empty_path_segment = { "[precedence]\n\"location.\" = \"local\"" },
)]
fn invalid_values_rejected(doc: &str) {
    assert!(matches!(SyncConfig::from_toml_str(doc), Err(SyncError::Config(_))));
}

#[parameterized(
    unknown_strategy = { "strategy = \"coin-flip\"" },
    unknown_precedence = { "[precedence]\nstatus = \"whoever\"" },
    wrong_type = { "sync_interval_secs = \"often\"" },
)]
fn malformed_documents_rejected(doc: &str) {
    assert!(matches!(SyncConfig::from_toml_str(doc), Err(SyncError::Toml(_))));
}

#[test]
fn missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let config = SyncConfig::load(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
    assert_eq!(config, SyncConfig::default());
}

#[test]
fn load_round_trips_through_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);

    let mut config = SyncConfig::default();
    config.strategy = ResolutionStrategy::ServerWins;
    config.precedence.insert("location.notes".to_string(), Precedence::Newer);
    std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();

    assert_eq!(SyncConfig::load(&path).unwrap(), config);
}

#[test]
fn sync_interval_duration() {
    let config = SyncConfig::default();
    assert_eq!(config.sync_interval(), Some(Duration::from_secs(60)));
}
