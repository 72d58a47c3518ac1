// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The sync engine.
//!
//! Owns the change queue, the conflict registry and the status view, and
//! drives sync passes against a [`RemoteStore`]. One engine per device or
//! session; clones are cheap handles to the same engine.
//!
//! A pass walks pending changes in priority order. For each one it fetches
//! the remote version, rebuilds the full local version (base or remote
//! fields with the pending edit on top) and then:
//!
//! - writes it when the remote has no such record
//! - confirms it without writing when the remote already matches
//! - writes the auto-merge when both sides changed disjoint fields
//! - otherwise applies the configured strategy; `manual` parks the conflict
//!   and prompts a human while the pass moves on
//!
//! Only one pass runs at a time. The pass stops early if the device goes
//! offline or the remote stays unavailable after backoff; unconfirmed changes
//! stay queued either way.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};

use sitesync_core::{
    apply_choice, auto_merge, detect_conflict, format_timestamp, merge_versions, resolve_conflict,
    ChangeEntry, ChangeQueue, Conflict, ConflictRegistry, EnqueueReport, Error, Fields,
    KeyValueStore, NetworkEvent, NetworkEventKind, PrecedenceRules, Priority, Record, RecordId,
    Resolution, ResolutionChoice, ResolutionStrategy, Side, StatusError, SyncStatus, Timestamp,
};

use crate::backoff::Backoff;
use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::manual::{manual_channel, ManualResolver, PromptReceiver};
use crate::observer::NetworkObserver;
use crate::remote::{RemoteError, RemoteStore};

const PROMPT_CAPACITY: usize = 64;

/// Counts of what a pass did with each pending change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Local version written as is.
    pub written: usize,
    /// Auto-merge of disjoint changes written.
    pub merged: usize,
    /// Remote already matched; nothing written.
    pub unchanged: usize,
    /// Conflict settled by an automatic strategy.
    pub resolved: usize,
    /// Conflict parked for manual resolution.
    pub conflicts: usize,
    /// Skipped because a manual conflict is still open.
    pub skipped: usize,
    /// Rejected or undeliverable.
    pub failed: usize,
}

impl PassSummary {
    /// Changes the pass sent to the remote, successfully or not.
    pub fn attempted(&self) -> usize {
        self.written + self.merged + self.unchanged + self.resolved + self.conflicts + self.failed
    }
}

/// Result of [`SyncEngine::sync_now`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Every pending change was attempted.
    Completed(PassSummary),
    /// Stopped early: offline or the remote stayed unavailable.
    Interrupted(PassSummary),
    /// Another pass was already running.
    Coalesced,
    /// Offline; no pass started.
    Offline,
}

/// Result of [`SyncEngine::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The decision reached the remote (or needed no write).
    Applied(Side),
    /// Decided locally; the write is queued for a later pass.
    Queued(Side),
    /// No open conflict for the record, e.g. another caller resolved it.
    AlreadyResolved,
}

/// What happened to one pending change.
enum EntryOutcome {
    Written,
    Merged,
    Unchanged,
    Resolved,
    Conflicted,
    Rejected(Error),
    Unavailable(Error),
}

/// Handle to a sync engine.
pub struct SyncEngine<R, S> {
    inner: Arc<EngineInner<R, S>>,
}

impl<R, S> Clone for SyncEngine<R, S> {
    fn clone(&self) -> Self {
        SyncEngine { inner: Arc::clone(&self.inner) }
    }
}

struct EngineInner<R, S> {
    remote: R,
    queue: Mutex<ChangeQueue<S>>,
    conflicts: ConflictRegistry,
    observer: Arc<NetworkObserver>,
    manual: ManualResolver,
    prompts: Mutex<Option<PromptReceiver>>,
    strategy: ResolutionStrategy,
    precedence: PrecedenceRules,
    backoff: Backoff,
    sync_interval: Option<Duration>,
    syncing: AtomicBool,
    last_error: Mutex<Option<StatusError>>,
    last_synced_at: Mutex<Option<Timestamp>>,
    status: watch::Sender<SyncStatus>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Clears the in-flight flag when a pass ends, even if it is cancelled.
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<R: RemoteStore, S: KeyValueStore> SyncEngine<R, S> {
    /// Creates an engine, reloading any changes persisted in `store`.
    pub fn new(
        config: &SyncConfig,
        remote: R,
        store: S,
        observer: Arc<NetworkObserver>,
    ) -> SyncResult<Self> {
        config.validate()?;
        let queue = ChangeQueue::open(store, config.queue.capacity)?;
        let (manual, prompts) = manual_channel(PROMPT_CAPACITY);
        let (status, _) = watch::channel(SyncStatus::default());

        let engine = SyncEngine {
            inner: Arc::new(EngineInner {
                remote,
                queue: Mutex::new(queue),
                conflicts: ConflictRegistry::new(),
                observer,
                manual,
                prompts: Mutex::new(Some(prompts)),
                strategy: config.strategy,
                precedence: config.precedence.clone(),
                backoff: Backoff::from(&config.retry),
                sync_interval: config.sync_interval(),
                syncing: AtomicBool::new(false),
                last_error: Mutex::new(None),
                last_synced_at: Mutex::new(None),
                status,
            }),
        };
        engine.publish();
        Ok(engine)
    }

    fn queue(&self) -> MutexGuard<'_, ChangeQueue<S>> {
        lock(&self.inner.queue)
    }

    fn now(&self) -> Timestamp {
        self.inner.observer.clock().now_ms()
    }

    /// Takes the receiver of manual conflict prompts. Only the first call
    /// gets it.
    pub fn take_prompts(&self) -> Option<PromptReceiver> {
        lock(&self.inner.prompts).take()
    }

    pub fn strategy(&self) -> ResolutionStrategy {
        self.inner.strategy
    }

    pub fn observer(&self) -> &Arc<NetworkObserver> {
        &self.inner.observer
    }

    /// Queues a local change. A pending manual conflict on the same record is
    /// superseded by it.
    pub fn record_change(&self, entry: ChangeEntry) -> EnqueueReport {
        let id = entry.record_id.clone();
        let report = self.queue().enqueue(entry);

        if report.accepted() && self.inner.conflicts.supersede(&id) {
            self.inner.manual.forget(&id);
        }
        self.note_enqueue(&report);
        self.publish();
        report
    }

    /// Surfaces an eviction or store failure from an enqueue as the last error.
    fn note_enqueue(&self, report: &EnqueueReport) {
        if let Some(warning) = report.warning() {
            *lock(&self.inner.last_error) = Some(StatusError::from(warning));
        }
    }

    /// Makes a rejected change eligible for the next pass.
    pub fn retry(&self, id: &RecordId) -> bool {
        let retried = self.queue().retry(id);
        if retried {
            let mut last_error = lock(&self.inner.last_error);
            if last_error.as_ref().is_some_and(|e| e.record_id.as_ref() == Some(id)) {
                *last_error = None;
            }
            drop(last_error);
            self.publish();
        }
        retried
    }

    /// Pending changes in send order, rejected ones included.
    pub fn pending(&self) -> Vec<ChangeEntry> {
        self.queue().peek_all()
    }

    pub fn conflict(&self, id: &RecordId) -> Option<Conflict> {
        self.inner.conflicts.get(id)
    }

    /// Records with an open manual conflict.
    pub fn unresolved(&self) -> Vec<RecordId> {
        self.inner.conflicts.record_ids()
    }

    /// Current status snapshot.
    pub fn status(&self) -> SyncStatus {
        self.publish();
        self.inner.status.borrow().clone()
    }

    /// Receiver that always holds the latest status.
    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status.subscribe()
    }

    fn publish(&self) {
        let network = self.inner.observer.state();
        let next = SyncStatus {
            pending_count: self.queue().len(),
            is_syncing: self.inner.syncing.load(Ordering::SeqCst),
            last_error: lock(&self.inner.last_error).clone(),
            last_synced_at: *lock(&self.inner.last_synced_at),
            online: network.online,
            quality: network.quality,
            unresolved_conflicts: self.inner.conflicts.len(),
        };
        self.inner.status.send_if_modified(|status| {
            if *status == next {
                return false;
            }
            *status = next;
            true
        });
    }

    fn set_last_error(&self, error: Option<&Error>) {
        *lock(&self.inner.last_error) = error.map(StatusError::from);
    }

    /// Runs one sync pass now, unless one is already running.
    pub async fn sync_now(&self) -> SyncOutcome {
        if self.inner.syncing.swap(true, Ordering::SeqCst) {
            tracing::debug!("sync pass already in flight");
            return SyncOutcome::Coalesced;
        }
        let guard = PassGuard(&self.inner.syncing);
        self.publish();

        let outcome = self.pass().await;

        drop(guard);
        self.publish();
        outcome
    }

    async fn pass(&self) -> SyncOutcome {
        if !self.inner.observer.is_online() {
            tracing::debug!("offline, skipping sync pass");
            return SyncOutcome::Offline;
        }

        for (id, choice) in self.inner.manual.take_answers() {
            self.settle(&id, &choice);
        }

        let entries = self.queue().pending();
        tracing::info!(pending = entries.len(), "sync pass started");
        let mut summary = PassSummary::default();
        let mut pass_error = None;

        for queued in entries {
            if !self.inner.observer.is_online() {
                tracing::info!(?summary, "went offline, abandoning sync pass");
                self.set_last_error(Some(&Error::NetworkUnavailable));
                return SyncOutcome::Interrupted(summary);
            }
            if self.inner.conflicts.contains(&queued.record_id) {
                self.reprompt(&queued.record_id);
                summary.skipped += 1;
                continue;
            }
            // the change may have been replaced or confirmed since the snapshot
            let Some(entry) = self.queue().get(&queued.record_id).cloned() else {
                continue;
            };
            if entry.rejected {
                continue;
            }

            match self.push(&entry).await {
                EntryOutcome::Written => summary.written += 1,
                EntryOutcome::Merged => summary.merged += 1,
                EntryOutcome::Unchanged => summary.unchanged += 1,
                EntryOutcome::Resolved => summary.resolved += 1,
                EntryOutcome::Conflicted => summary.conflicts += 1,
                EntryOutcome::Rejected(e) => {
                    summary.failed += 1;
                    pass_error = Some(e);
                }
                EntryOutcome::Unavailable(e) => {
                    summary.failed += 1;
                    tracing::warn!(?summary, "remote unavailable, abandoning sync pass");
                    self.set_last_error(Some(&e));
                    return SyncOutcome::Interrupted(summary);
                }
            }
            self.publish();
        }

        let error = pass_error.or_else(|| {
            self.inner.conflicts.record_ids().into_iter().next().map(Error::ConflictUnresolved)
        });
        self.set_last_error(error.as_ref());
        let synced_at = self.now();
        *lock(&self.inner.last_synced_at) = Some(synced_at);

        tracing::info!(
            synced_at = %format_timestamp(synced_at),
            written = summary.written,
            merged = summary.merged,
            unchanged = summary.unchanged,
            resolved = summary.resolved,
            conflicts = summary.conflicts,
            skipped = summary.skipped,
            failed = summary.failed,
            "sync pass finished"
        );
        SyncOutcome::Completed(summary)
    }

    /// Sends one pending change.
    async fn push(&self, entry: &ChangeEntry) -> EntryOutcome {
        let id = &entry.record_id;
        let remote = &self.inner.remote;
        tracing::debug!(record = %id, seq = entry.seq, priority = %entry.priority, "syncing change");

        let current = match self.inner.backoff.run(move || remote.fetch(id)).await {
            Ok(current) => current,
            Err(e) => return self.failed(entry, e),
        };

        let Some(current) = current else {
            return self.write(entry, &entry.fields, EntryOutcome::Written).await;
        };

        let base = entry.base.as_ref();
        let start = match base {
            Some(base) => Record::new(id.clone(), current.updated_at, base.clone()),
            None => current.clone(),
        };
        let local = start.overlaid(&entry.fields, entry.timestamp);

        if local.fields == current.fields {
            self.queue().confirm(id, entry.seq);
            return EntryOutcome::Unchanged;
        }

        let Some(conflict) = detect_conflict(&local, &current, base) else {
            let merged = auto_merge(&local, &current, base);
            if merged == current.fields {
                self.queue().confirm(id, entry.seq);
                return EntryOutcome::Unchanged;
            }
            let outcome =
                if merged == local.fields { EntryOutcome::Written } else { EntryOutcome::Merged };
            return self.write(entry, &merged, outcome).await;
        };

        match resolve_conflict(&conflict, self.inner.strategy) {
            Resolution::Resolved { winner, record } => {
                tracing::info!(
                    record = %id,
                    ?winner,
                    strategy = %self.inner.strategy,
                    fields = ?conflict.fields().collect::<Vec<_>>(),
                    "conflict resolved"
                );
                if record.fields == current.fields {
                    self.queue().confirm(id, entry.seq);
                    return EntryOutcome::Resolved;
                }
                self.write(entry, &record.fields, EntryOutcome::Resolved).await
            }
            Resolution::AwaitingInput => {
                tracing::info!(
                    record = %id,
                    fields = ?conflict.fields().collect::<Vec<_>>(),
                    "conflict awaiting manual resolution"
                );
                let suggested =
                    merge_versions(&conflict.local, &conflict.remote, &self.inner.precedence);
                self.inner.conflicts.open(conflict.clone());
                self.inner.manual.prompt(conflict, suggested);
                EntryOutcome::Conflicted
            }
        }
    }

    /// Writes `fields` for `entry`, returning `success` once confirmed.
    async fn write(&self, entry: &ChangeEntry, fields: &Fields, success: EntryOutcome) -> EntryOutcome {
        let id = &entry.record_id;
        let remote = &self.inner.remote;

        match self.inner.backoff.run(move || remote.write(id, fields)).await {
            Ok(confirmation) => {
                if !self.queue().confirm(id, entry.seq) {
                    tracing::debug!(record = %id, "record edited during write, newer change stays queued");
                }
                tracing::debug!(record = %id, updated_at = confirmation.updated_at, "change confirmed");
                success
            }
            Err(e) => self.failed(entry, e),
        }
    }

    fn failed(&self, entry: &ChangeEntry, error: RemoteError) -> EntryOutcome {
        let id = &entry.record_id;
        let rejected = !error.is_retryable();

        let mut queue = self.queue();
        if queue.get(id).is_some_and(|e| e.seq == entry.seq) {
            queue.mark_failed(id, rejected);
        }
        drop(queue);

        match error {
            RemoteError::Rejected(reason) => {
                tracing::warn!(record = %id, reason = %reason, "remote rejected change, holding it for retry");
                EntryOutcome::Rejected(Error::RemoteRejected { record_id: id.clone(), reason })
            }
            RemoteError::Unavailable(reason) => {
                tracing::warn!(record = %id, reason = %reason, "remote unavailable");
                EntryOutcome::Unavailable(Error::NetworkUnavailable)
            }
        }
    }

    /// Prompts again for an open conflict whose prompt was dismissed.
    fn reprompt(&self, id: &RecordId) {
        if self.inner.manual.is_awaiting(id) {
            return;
        }
        if let Some(conflict) = self.inner.conflicts.get(id) {
            let suggested = merge_versions(&conflict.local, &conflict.remote, &self.inner.precedence);
            self.inner.manual.prompt(conflict, suggested);
        }
    }

    /// Applies a manual decision locally.
    ///
    /// The resolved version is queued with the remote version as its base,
    /// so the next push writes it unless the remote moved again. Returns
    /// `None` when no conflict is open for `id`.
    fn settle(&self, id: &RecordId, choice: &ResolutionChoice) -> Option<(Side, Option<ChangeEntry>)> {
        let conflict = self.inner.conflicts.take(id)?;
        self.inner.manual.forget(id);
        let (side, record) = apply_choice(&conflict, choice);
        tracing::info!(record = %id, ?side, "manual resolution applied");

        let mut queue = self.queue();
        if record.fields == conflict.remote.fields {
            queue.dequeue(id);
            return Some((side, None));
        }

        let (priority, pending_at) =
            queue.get(id).map_or((Priority::default(), 0), |e| (e.priority, e.timestamp));
        let timestamp = self.now().max(pending_at);
        let entry = ChangeEntry::new(id.clone(), record.fields, timestamp)
            .with_priority(priority)
            .with_base(conflict.remote.fields.clone());
        let report = queue.enqueue(entry);
        let queued = queue.get(id).cloned();
        drop(queue);

        self.note_enqueue(&report);
        Some((side, queued))
    }

    /// Resolves an open manual conflict and, when online, writes the result
    /// right away.
    ///
    /// Of two concurrent calls for the same record exactly one gets
    /// `Applied`/`Queued`; the other gets `AlreadyResolved`.
    pub async fn resolve(&self, id: &RecordId, choice: ResolutionChoice) -> ResolveOutcome {
        let Some((side, entry)) = self.settle(id, &choice) else {
            tracing::debug!(record = %id, "conflict already resolved");
            return ResolveOutcome::AlreadyResolved;
        };
        self.publish();

        let Some(entry) = entry else {
            return ResolveOutcome::Applied(side);
        };
        if !self.inner.observer.is_online() {
            return ResolveOutcome::Queued(side);
        }

        let outcome = match self.push(&entry).await {
            EntryOutcome::Written
            | EntryOutcome::Merged
            | EntryOutcome::Unchanged
            | EntryOutcome::Resolved => ResolveOutcome::Applied(side),
            EntryOutcome::Rejected(e) | EntryOutcome::Unavailable(e) => {
                self.set_last_error(Some(&e));
                ResolveOutcome::Queued(side)
            }
            EntryOutcome::Conflicted => ResolveOutcome::Queued(side),
        };
        self.publish();
        outcome
    }

    /// Reacts to a connectivity transition: refreshes the status, and syncs
    /// when the device came back online.
    pub async fn handle_network_event(&self, event: &NetworkEvent) -> Option<SyncOutcome> {
        self.publish();
        if event.kind != NetworkEventKind::WentOnline {
            return None;
        }
        tracing::info!("back online, syncing pending changes");
        Some(self.sync_now().await)
    }

    /// Drives sync passes until `shutdown` completes.
    ///
    /// Syncs once at start when online, on every offline-to-online
    /// transition, and on the configured interval while online.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        let mut events = self.inner.observer.events();
        let mut ticker = self.inner.sync_interval.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        tokio::pin!(shutdown);

        tracing::info!(strategy = %self.inner.strategy, "sync engine started");
        if self.inner.observer.is_online() {
            self.sync_now().await;
        }

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                event = events.recv() => match event {
                    Ok(event) => {
                        self.handle_network_event(&event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::debug!(missed, "missed network events");
                        self.publish();
                        if self.inner.observer.is_online() {
                            self.sync_now().await;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = next_tick(&mut ticker) => {
                    if self.inner.observer.is_online() {
                        self.sync_now().await;
                    }
                }
            }
        }
        tracing::info!("sync engine stopped");
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
