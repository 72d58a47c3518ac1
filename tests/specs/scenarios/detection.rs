// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Conflict detection and automatic resolution, end to end.
//!
//! Reference scenario: local `{title: "A", status: "open"}`@10 against remote
//! `{title: "B", status: "open"}`@12, both edited from
//! `{title: "orig", status: "open"}`.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]

use super::common::*;
use sitesync_core::{detect_conflict, resolve_conflict, Resolution};
use yare::parameterized;

fn base() -> Fields {
    fields(json!({"title": "orig", "status": "open"}))
}

#[parameterized(
    same_timestamp = { 10, 10 },
    local_newer = { 20, 10 },
    remote_newer = { 10, 20 },
)]
fn identical_fields_never_conflict(local_at: Timestamp, remote_at: Timestamp) {
    let local = record("ncr:1", local_at, json!({"title": "A", "status": "open"}));
    let remote = record("ncr:1", remote_at, json!({"title": "A", "status": "open"}));

    assert!(detect_conflict(&local, &remote, Some(&base())).is_none());
    assert!(detect_conflict(&local, &remote, None).is_none());
}

#[parameterized(
    same_timestamp = { 10, 10 },
    local_newer = { 20, 10 },
    remote_newer = { 10, 20 },
)]
fn disjoint_changes_never_conflict(local_at: Timestamp, remote_at: Timestamp) {
    let local = record("ncr:1", local_at, json!({"title": "A", "status": "open"}));
    let remote = record("ncr:1", remote_at, json!({"title": "orig", "status": "closed"}));

    assert!(detect_conflict(&local, &remote, Some(&base())).is_none());
}

#[test]
fn overlapping_changes_conflict_on_exactly_those_fields() {
    let local = record("ncr:1", 10, json!({"title": "A", "status": "open", "owner": "kim"}));
    let remote = record("ncr:1", 12, json!({"title": "B", "status": "open", "owner": "lee"}));
    let base = fields(json!({"title": "orig", "status": "open", "owner": "ash"}));

    let conflict = detect_conflict(&local, &remote, Some(&base)).unwrap();
    assert_eq!(conflict.fields().collect::<Vec<_>>(), vec!["owner", "title"]);
    assert_eq!(conflict.local_timestamp(), 10);
    assert_eq!(conflict.remote_timestamp(), 12);
}

#[parameterized(
    last_write_wins = { ResolutionStrategy::LastWriteWins, "B" },
    server_wins = { ResolutionStrategy::ServerWins, "B" },
    local_wins = { ResolutionStrategy::LocalWins, "A" },
)]
fn reference_scenario_resolves_per_strategy(strategy: ResolutionStrategy, title: &str) {
    let local = record("ncr:1", 10, json!({"title": "A", "status": "open"}));
    let remote = record("ncr:1", 12, json!({"title": "B", "status": "open"}));

    let conflict = detect_conflict(&local, &remote, Some(&base())).unwrap();
    assert_eq!(conflict.fields().collect::<Vec<_>>(), vec!["title"]);

    let Resolution::Resolved { record, .. } = resolve_conflict(&conflict, strategy) else {
        panic!("{strategy} should resolve on its own");
    };
    similar_asserts::assert_eq!(record.fields, fields(json!({"title": title, "status": "open"})));
}

#[test]
fn server_wins_always_yields_remote() {
    for (local_at, remote_at) in [(1, 2), (2, 1), (5, 5)] {
        let local = record("x", local_at, json!({"v": "local"}));
        let remote = record("x", remote_at, json!({"v": "remote"}));
        let conflict = detect_conflict(&local, &remote, None).unwrap();

        let resolution = resolve_conflict(&conflict, ResolutionStrategy::ServerWins);
        assert_eq!(resolution.record().unwrap().fields, remote.fields);
    }
}

#[test]
fn last_write_wins_tie_goes_to_local() {
    let local = record("x", 7, json!({"v": "local"}));
    let remote = record("x", 7, json!({"v": "remote"}));
    let conflict = detect_conflict(&local, &remote, None).unwrap();

    let resolution = resolve_conflict(&conflict, ResolutionStrategy::LastWriteWins);
    assert_eq!(resolution.record().unwrap().fields, local.fields);
}

#[test]
fn manual_never_picks_a_default() {
    let local = record("x", 1, json!({"v": "local"}));
    let remote = record("x", 2, json!({"v": "remote"}));
    let conflict = detect_conflict(&local, &remote, None).unwrap();

    assert_eq!(resolve_conflict(&conflict, ResolutionStrategy::Manual), Resolution::AwaitingInput);
}

#[parameterized(
    last_write_wins = { ResolutionStrategy::LastWriteWins, "B" },
    server_wins = { ResolutionStrategy::ServerWins, "B" },
    local_wins = { ResolutionStrategy::LocalWins, "A" },
)]
fn reference_scenario_through_the_engine(strategy: ResolutionStrategy, title: &str) {
    block_on(async {
        let device = device(strategy);
        device.remote.insert(record("ncr:1", 12, json!({"title": "B", "status": "open"})));
        device.engine.record_change(change("ncr:1", 10, json!({"title": "A"})).with_base(base()));
        device.go_online();

        let outcome = device.engine.sync_now().await;

        assert!(matches!(outcome, SyncOutcome::Completed(s) if s.resolved == 1));
        similar_asserts::assert_eq!(
            device.remote_fields("ncr:1"),
            fields(json!({"title": title, "status": "open"}))
        );
        assert_eq!(device.engine.status().state(), SyncState::Synced);
    });
}
