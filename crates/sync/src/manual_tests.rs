// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use serde_json::json;
use sitesync_core::{detect_conflict, fields_from_value, Record};

fn conflict(id: &str) -> Conflict {
    let id = RecordId::parse(id).unwrap();
    let local = Record::new(id.clone(), 1, fields_from_value(json!({"title": "A"})).unwrap());
    let remote = Record::new(id, 2, fields_from_value(json!({"title": "B"})).unwrap());
    detect_conflict(&local, &remote, None).unwrap()
}

#[tokio::test]
async fn answer_round_trip() {
    let (resolver, mut prompts) = manual_channel(4);
    assert!(resolver.prompt(conflict("ncr:1"), Fields::new()));

    let id = RecordId::parse("ncr:1").unwrap();
    assert!(resolver.is_awaiting(&id));
    assert!(resolver.take_answers().is_empty());

    let prompt = prompts.recv().await.unwrap();
    assert_eq!(prompt.record_id(), &id);
    assert!(prompt.respond(ResolutionChoice::KeepRemote));

    assert_eq!(resolver.take_answers(), vec![(id.clone(), ResolutionChoice::KeepRemote)]);
    assert!(!resolver.is_awaiting(&id));
}

#[tokio::test]
async fn dismissed_prompt_is_forgotten() {
    let (resolver, mut prompts) = manual_channel(4);
    resolver.prompt(conflict("ncr:1"), Fields::new());

    drop(prompts.recv().await.unwrap());

    assert!(resolver.take_answers().is_empty());
    assert!(!resolver.is_awaiting(&RecordId::parse("ncr:1").unwrap()));
}

#[tokio::test]
async fn forgotten_prompt_cannot_be_answered() {
    let (resolver, mut prompts) = manual_channel(4);
    resolver.prompt(conflict("ncr:1"), Fields::new());
    resolver.forget(&RecordId::parse("ncr:1").unwrap());

    let prompt = prompts.recv().await.unwrap();
    assert!(!prompt.respond(ResolutionChoice::KeepLocal));
}

#[test]
fn full_or_closed_channel_reports_failure() {
    let (resolver, prompts) = manual_channel(1);
    assert!(resolver.prompt(conflict("a"), Fields::new()));
    assert!(!resolver.prompt(conflict("b"), Fields::new()));
    assert!(!resolver.is_awaiting(&RecordId::parse("b").unwrap()));

    drop(prompts);
    assert!(!resolver.prompt(conflict("c"), Fields::new()));
}
