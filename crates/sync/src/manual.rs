// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Hand-off of manual conflicts to a human.
//!
//! For each conflict the engine cannot settle on its own it sends a
//! [`ConflictPrompt`] down an mpsc channel and moves on to other records. The
//! UI answers with [`ConflictPrompt::respond`]; the engine collects answers at
//! the start of its next pass.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::{mpsc, oneshot};

use sitesync_core::{Conflict, Fields, RecordId, ResolutionChoice};

/// Receiving end handed to the UI.
pub type PromptReceiver = mpsc::Receiver<ConflictPrompt>;

/// A conflict waiting for a human decision.
#[derive(Debug)]
pub struct ConflictPrompt {
    pub conflict: Conflict,
    /// Field-level merge proposal the UI can offer as a starting point.
    pub suggested: Fields,
    responder: oneshot::Sender<ResolutionChoice>,
}

impl ConflictPrompt {
    pub fn record_id(&self) -> &RecordId {
        &self.conflict.record_id
    }

    /// Sends the decision back. Returns false if the engine no longer waits
    /// for it (the conflict was superseded or resolved elsewhere).
    pub fn respond(self, choice: ResolutionChoice) -> bool {
        self.responder.send(choice).is_ok()
    }
}

/// Engine side of the prompt channel.
pub struct ManualResolver {
    prompts: mpsc::Sender<ConflictPrompt>,
    awaiting: Mutex<BTreeMap<RecordId, oneshot::Receiver<ResolutionChoice>>>,
}

/// Creates a resolver and the receiver the UI reads prompts from.
pub fn manual_channel(capacity: usize) -> (ManualResolver, PromptReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ManualResolver { prompts: tx, awaiting: Mutex::new(BTreeMap::new()) }, rx)
}

impl ManualResolver {
    fn lock(&self) -> MutexGuard<'_, BTreeMap<RecordId, oneshot::Receiver<ResolutionChoice>>> {
        self.awaiting.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sends a prompt for `conflict`. Returns false if it could not be
    /// delivered; the conflict stays open and is prompted again later.
    pub fn prompt(&self, conflict: Conflict, suggested: Fields) -> bool {
        let id = conflict.record_id.clone();
        let (responder, answer) = oneshot::channel();
        let prompt = ConflictPrompt { conflict, suggested, responder };

        match self.prompts.try_send(prompt) {
            Ok(()) => {
                self.lock().insert(id.clone(), answer);
                tracing::debug!(record = %id, "conflict sent for manual resolution");
                true
            }
            Err(e) => {
                tracing::warn!(record = %id, error = %e, "could not deliver conflict prompt");
                false
            }
        }
    }

    /// Whether a prompt for `id` is out and unanswered.
    pub fn is_awaiting(&self, id: &RecordId) -> bool {
        self.lock().contains_key(id)
    }

    /// Collects decisions that have arrived.
    ///
    /// Prompts dropped without an answer are forgotten so the conflict gets
    /// prompted again.
    pub fn take_answers(&self) -> Vec<(RecordId, ResolutionChoice)> {
        let mut awaiting = self.lock();
        let mut answers = Vec::new();
        awaiting.retain(|id, answer| match answer.try_recv() {
            Ok(choice) => {
                answers.push((id.clone(), choice));
                false
            }
            Err(oneshot::error::TryRecvError::Empty) => true,
            Err(oneshot::error::TryRecvError::Closed) => {
                tracing::debug!(record = %id, "conflict prompt dismissed");
                false
            }
        });
        answers
    }

    /// Stops waiting for an answer about `id`.
    pub fn forget(&self, id: &RecordId) {
        self.lock().remove(id);
    }
}

#[cfg(test)]
#[path = "manual_tests.rs"]
mod tests;
