// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Working offline and coming back online.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]

use super::common::*;
use sitesync::EnqueueOutcome;

#[tokio::test(start_paused = true)]
async fn reconnect_runs_one_pass_over_all_changes_in_priority_order() {
    let device = device(ResolutionStrategy::LastWriteWins);
    device.engine.record_change(change("inspection:1", 1, json!({"result": "pass"})));
    device
        .engine
        .record_change(change("ncr:9", 2, json!({"stop_work": true})).with_priority(Priority::Critical));
    device
        .engine
        .record_change(change("photo:3", 3, json!({"caption": "east wall"})).with_priority(Priority::Low));
    assert_eq!(device.engine.status().state(), SyncState::Offline);

    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let engine = device.engine.clone();
    let task = tokio::spawn(async move {
        engine
            .run(async {
                let _ = stopped.await;
            })
            .await;
    });
    tokio::task::yield_now().await;
    assert!(device.remote.fetches().is_empty());

    let mut status = device.engine.subscribe_status();
    device.go_online();
    status.wait_for(|s| s.pending_count == 0 && !s.is_syncing).await.unwrap();

    // every change fetched exactly once: a single pass
    assert_eq!(device.remote.fetches(), vec![id("ncr:9"), id("inspection:1"), id("photo:3")]);
    let written: Vec<RecordId> = device.remote.writes().into_iter().map(|(id, _)| id).collect();
    assert_eq!(written, vec![id("ncr:9"), id("inspection:1"), id("photo:3")]);
    assert_eq!(device.engine.status().state(), SyncState::Synced);

    stop.send(()).unwrap();
    task.await.unwrap();
}

#[test]
fn repeated_edits_coalesce_to_the_latest() {
    let device = device(ResolutionStrategy::LastWriteWins);

    device.engine.record_change(change("si:4", 10, json!({"title": "draft"})));
    let report = device.engine.record_change(change("si:4", 15, json!({"title": "final"})));
    assert_eq!(report.outcome, EnqueueOutcome::Replaced);

    let stale = device.engine.record_change(change("si:4", 12, json!({"title": "older"})));
    assert_eq!(stale.outcome, EnqueueOutcome::Stale);

    let pending = device.engine.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].fields["title"], json!("final"));
    assert_eq!(pending[0].timestamp, 15);
    assert_eq!(device.engine.status().pending_count, 1);
}

#[tokio::test]
async fn failure_of_one_record_does_not_block_others() {
    let device = device(ResolutionStrategy::LastWriteWins);
    device.remote.set_read_only(id("ncr:1"));
    device.engine.record_change(change("ncr:1", 1, json!({"title": "x"})).with_priority(Priority::High));
    device.engine.record_change(change("ncr:2", 2, json!({"title": "y"})));
    device.go_online();

    let outcome = device.engine.sync_now().await;

    assert!(matches!(outcome, SyncOutcome::Completed(s) if s.failed == 1 && s.written == 1));
    assert_eq!(device.remote_fields("ncr:2")["title"], json!("y"));

    let status = device.engine.status();
    assert_eq!(status.pending_count, 1);
    assert_eq!(status.state(), SyncState::Error);
}

#[tokio::test(start_paused = true)]
async fn outage_keeps_changes_queued_until_the_remote_returns() {
    let device = device(ResolutionStrategy::LastWriteWins);
    device.engine.record_change(change("a", 1, json!({"x": 1})));
    device.remote.set_unavailable(true);
    device.go_online();

    assert!(matches!(device.engine.sync_now().await, SyncOutcome::Interrupted(_)));
    assert_eq!(device.engine.status().pending_count, 1);

    device.remote.set_unavailable(false);
    assert!(matches!(device.engine.sync_now().await, SyncOutcome::Completed(s) if s.written == 1));
    assert_eq!(device.engine.status().pending_count, 0);
}
