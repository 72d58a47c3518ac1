// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Manual conflict resolution with a UI answering prompts.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]

use super::common::*;
use sitesync::{ErrorKind, ResolveOutcome, Side};

fn conflicted_device() -> Device<MemoryStore> {
    let device = device(ResolutionStrategy::Manual);
    device.remote.insert(record("ncr:1", 12, json!({"title": "B", "status": "open"})));
    device.engine.record_change(
        change("ncr:1", 10, json!({"title": "A"}))
            .with_base(fields(json!({"title": "orig", "status": "open"}))),
    );
    device.engine.record_change(change("ncr:2", 11, json!({"title": "unrelated"})));
    device
}

#[tokio::test]
async fn conflict_blocks_only_its_record() {
    let device = conflicted_device();
    device.go_online();

    let outcome = device.engine.sync_now().await;

    assert!(matches!(outcome, SyncOutcome::Completed(s) if s.conflicts == 1 && s.written == 1));
    assert_eq!(device.remote_fields("ncr:2")["title"], json!("unrelated"));
    assert_eq!(device.remote_fields("ncr:1")["title"], json!("B"));

    let status = device.engine.status();
    assert_eq!(status.unresolved_conflicts, 1);
    assert_eq!(status.pending_count, 1);
    assert_eq!(status.last_error.unwrap().kind, ErrorKind::ConflictUnresolved);
}

#[tokio::test]
async fn ui_answer_is_applied_on_the_next_pass() {
    let device = conflicted_device();
    let mut prompts = device.engine.take_prompts().unwrap();
    device.go_online();
    device.engine.sync_now().await;

    let ui = tokio::spawn(async move {
        let prompt = prompts.recv().await.unwrap();
        assert_eq!(prompt.conflict.diff["title"].local, json!("A"));
        assert_eq!(prompt.conflict.diff["title"].remote, json!("B"));
        let mut merged = prompt.suggested.clone();
        merged.insert("title".to_string(), json!("A / B"));
        prompt.respond(ResolutionChoice::Merged(merged))
    });
    assert!(ui.await.unwrap());

    let outcome = device.engine.sync_now().await;

    assert!(matches!(outcome, SyncOutcome::Completed(s) if s.written == 1 && s.conflicts == 0));
    similar_asserts::assert_eq!(
        device.remote_fields("ncr:1"),
        fields(json!({"title": "A / B", "status": "open"}))
    );
    assert_eq!(device.engine.status().state(), SyncState::Synced);
}

#[tokio::test]
async fn racing_resolutions_settle_once() {
    let device = conflicted_device();
    device.go_online();
    device.engine.sync_now().await;

    let a = device.engine.clone();
    let b = device.engine.clone();
    let first = tokio::spawn(async move { a.resolve(&id("ncr:1"), ResolutionChoice::KeepLocal).await });
    let second = tokio::spawn(async move { b.resolve(&id("ncr:1"), ResolutionChoice::KeepRemote).await });
    let outcomes = [first.await.unwrap(), second.await.unwrap()];

    let winners: Vec<&ResolveOutcome> =
        outcomes.iter().filter(|o| **o != ResolveOutcome::AlreadyResolved).collect();
    assert_eq!(winners.len(), 1);
    assert!(device.engine.unresolved().is_empty());

    let expected = match winners[0] {
        ResolveOutcome::Applied(Side::Local) => "A",
        ResolveOutcome::Applied(Side::Remote) => "B",
        other => panic!("unexpected outcome {other:?}"),
    };
    assert_eq!(device.remote_fields("ncr:1")["title"], json!(expected));
}

#[tokio::test]
async fn editing_again_supersedes_the_conflict() {
    let device = conflicted_device();
    device.go_online();
    device.engine.sync_now().await;
    assert_eq!(device.engine.unresolved(), vec![id("ncr:1")]);

    // user re-edits after seeing the remote version
    device.engine.record_change(
        change("ncr:1", 20, json!({"title": "C"})).with_base(fields(json!({"title": "B", "status": "open"}))),
    );
    assert!(device.engine.unresolved().is_empty());

    let outcome = device.engine.sync_now().await;
    assert!(matches!(outcome, SyncOutcome::Completed(s) if s.conflicts == 0));
    assert_eq!(device.remote_fields("ncr:1")["title"], json!("C"));
}
