// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wall-clock sources for stamping changes and network transitions.
//!
//! Everything that records "when" goes through [`ClockSource`] so tests can
//! drive time by hand.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{TimeZone, Utc};

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Trait for getting the current wall clock time.
pub trait ClockSource: Send + Sync {
    /// Returns the current time in milliseconds since Unix epoch.
    fn now_ms(&self) -> Timestamp;
}

/// System clock implementation backed by `chrono::Utc`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now_ms(&self) -> Timestamp {
        u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

impl<C: ClockSource + ?Sized> ClockSource for Arc<C> {
    fn now_ms(&self) -> Timestamp {
        (**self).now_ms()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the code under test.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    time_ms: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock frozen at `initial_ms`.
    pub fn new(initial_ms: Timestamp) -> Self {
        ManualClock { time_ms: Arc::new(AtomicU64::new(initial_ms)) }
    }

    /// Jumps to an absolute time.
    pub fn set(&self, ms: Timestamp) {
        self.time_ms.store(ms, Ordering::SeqCst);
    }

    /// Moves the clock forward.
    pub fn advance(&self, ms: u64) {
        self.time_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl ClockSource for ManualClock {
    fn now_ms(&self) -> Timestamp {
        self.time_ms.load(Ordering::SeqCst)
    }
}

/// Formats a timestamp as RFC 3339 for log lines.
pub fn format_timestamp(ms: Timestamp) -> String {
    i64::try_from(ms)
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ms.to_string())
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
