// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Pending changes survive a restart of the app.

#![allow(clippy::unwrap_used)]

use super::common::*;
use sitesync::{SqliteStore, CONFIG_FILE_NAME};

#[tokio::test]
async fn queued_changes_survive_restart() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("data").join("sync.db");
    let remote = MemoryRemote::new();

    {
        let device = device_with(SyncConfig::default(), SqliteStore::open(&db).unwrap(), remote.clone());
        device.engine.record_change(change("a", 1, json!({"x": 1})).with_priority(Priority::High));
        device.engine.record_change(change("b", 2, json!({"x": 2})));
        device.engine.record_change(change("b", 3, json!({"x": 3})));
        assert_eq!(device.engine.status().pending_count, 2);
    }

    let device = device_with(SyncConfig::default(), SqliteStore::open(&db).unwrap(), remote.clone());
    let pending = device.engine.pending();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].record_id, id("a"));
    assert_eq!(pending[1].fields["x"], json!(3));

    device.go_online();
    device.engine.sync_now().await;

    assert_eq!(device.remote_fields("b")["x"], json!(3));
    assert!(device.engine.pending().is_empty());

    // confirmed changes are gone from disk too
    let reopened = device_with(SyncConfig::default(), SqliteStore::open(&db).unwrap(), remote);
    assert!(reopened.engine.pending().is_empty());
}

#[test]
fn config_file_drives_engine_settings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(
        &path,
        r#"
strategy = "server-wins"
sync_interval_secs = 0

[queue]
capacity = 2
"#,
    )
    .unwrap();

    let config = SyncConfig::load(&path).unwrap();
    let device = device_with(config, MemoryStore::new(), MemoryRemote::new());
    assert_eq!(device.engine.strategy(), ResolutionStrategy::ServerWins);

    device.engine.record_change(change("a", 1, json!({})));
    device.engine.record_change(change("b", 2, json!({})));
    let report = device.engine.record_change(change("c", 3, json!({})));
    assert_eq!(report.evicted.len(), 1);
    assert_eq!(device.engine.pending().len(), 2);
}
