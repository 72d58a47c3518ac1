// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Network status observer.
//!
//! The host feeds platform connectivity reports into [`NetworkObserver::report`].
//! The current state is readable at any time through a `watch` channel, and
//! every transition is broadcast as a [`NetworkEvent`].

use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use sitesync_core::{ClockSource, ConnectivitySignal, NetworkEvent, NetworkState, SystemClock};

const EVENT_CAPACITY: usize = 32;

/// Tracks connectivity and publishes transitions.
pub struct NetworkObserver {
    clock: Arc<dyn ClockSource>,
    state: watch::Sender<NetworkState>,
    events: broadcast::Sender<NetworkEvent>,
}

impl NetworkObserver {
    /// Creates an observer that starts offline.
    pub fn new(clock: Arc<dyn ClockSource>) -> Self {
        let (state, _) = watch::channel(NetworkState { changed_at: clock.now_ms(), ..Default::default() });
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        NetworkObserver { clock, state, events }
    }

    /// Observer on the system clock.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    /// Records a connectivity report, returning the transition it caused.
    pub fn report(&self, signal: &ConnectivitySignal) -> Option<NetworkEvent> {
        let next = NetworkState::from_signal(signal, self.clock.now_ms());
        let mut event = None;
        self.state.send_if_modified(|state| {
            event = state.transition_to(&next);
            if event.is_some() {
                *state = next;
            }
            event.is_some()
        });

        let event = event?;
        tracing::info!(
            online = event.online,
            quality = %event.quality,
            kind = ?event.kind,
            "network status changed"
        );
        // no subscribers is fine
        let _ = self.events.send(event);
        Some(event)
    }

    pub fn state(&self) -> NetworkState {
        *self.state.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.state.borrow().online
    }

    /// Receiver that always holds the latest state.
    pub fn watch(&self) -> watch::Receiver<NetworkState> {
        self.state.subscribe()
    }

    /// Receiver of transitions from now on.
    pub fn events(&self) -> broadcast::Receiver<NetworkEvent> {
        self.events.subscribe()
    }

    pub fn clock(&self) -> &Arc<dyn ClockSource> {
        &self.clock
    }
}

#[cfg(test)]
#[path = "observer_tests.rs"]
mod tests;
