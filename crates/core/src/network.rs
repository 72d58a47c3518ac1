// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity classification.
//!
//! The host platform reports raw signals (online flag, connection type,
//! round-trip time, bandwidth); this module turns them into a coarse
//! [`ConnectionQuality`]. Classification never fails: missing or unknown
//! values fall through to the next signal and finally to `Unknown`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::clock::Timestamp;

/// Round trips at or below this are fast.
pub const FAST_RTT_MS: u32 = 300;

/// Downlink at or above this is fast.
pub const FAST_DOWNLINK_MBPS: f64 = 1.5;

/// Raw connectivity as reported by the host platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectivitySignal {
    pub online: bool,
    /// Connection type hint such as `4g`, `3g` or `wifi`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtt_ms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downlink_mbps: Option<f64>,
}

impl ConnectivitySignal {
    /// An online signal with no quality hints.
    pub fn online() -> Self {
        ConnectivitySignal { online: true, ..Default::default() }
    }

    pub fn offline() -> Self {
        ConnectivitySignal::default()
    }

    pub fn with_effective_type(mut self, effective_type: impl Into<String>) -> Self {
        self.effective_type = Some(effective_type.into());
        self
    }

    pub fn with_rtt_ms(mut self, rtt_ms: u32) -> Self {
        self.rtt_ms = Some(rtt_ms);
        self
    }

    pub fn with_downlink_mbps(mut self, downlink_mbps: f64) -> Self {
        self.downlink_mbps = Some(downlink_mbps);
        self
    }
}

/// Coarse connection quality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionQuality {
    Fast,
    Slow,
    #[default]
    Unknown,
}

impl ConnectionQuality {
    /// Classifies a signal: connection type first, then RTT, then downlink.
    pub fn classify(signal: &ConnectivitySignal) -> Self {
        if !signal.online {
            return ConnectionQuality::Unknown;
        }

        let by_type = signal.effective_type.as_deref().and_then(|t| {
            match t.trim().to_lowercase().as_str() {
                "4g" | "5g" | "wifi" | "ethernet" => Some(ConnectionQuality::Fast),
                "3g" | "2g" | "slow-2g" => Some(ConnectionQuality::Slow),
                _ => None,
            }
        });
        if let Some(quality) = by_type {
            return quality;
        }

        if let Some(rtt) = signal.rtt_ms {
            return if rtt <= FAST_RTT_MS { ConnectionQuality::Fast } else { ConnectionQuality::Slow };
        }

        match signal.downlink_mbps {
            Some(mbps) if mbps.is_finite() && mbps >= FAST_DOWNLINK_MBPS => ConnectionQuality::Fast,
            Some(mbps) if mbps.is_finite() && mbps >= 0.0 => ConnectionQuality::Slow,
            _ => ConnectionQuality::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionQuality::Fast => "fast",
            ConnectionQuality::Slow => "slow",
            ConnectionQuality::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ConnectionQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Current connectivity as seen by the sync layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkState {
    pub online: bool,
    pub quality: ConnectionQuality,
    /// When `online` or `quality` last changed.
    pub changed_at: Timestamp,
}

impl NetworkState {
    pub fn from_signal(signal: &ConnectivitySignal, at: Timestamp) -> Self {
        NetworkState { online: signal.online, quality: ConnectionQuality::classify(signal), changed_at: at }
    }

    /// The event that moving from `self` to `next` produces, if any.
    pub fn transition_to(&self, next: &NetworkState) -> Option<NetworkEvent> {
        let kind = match (self.online, next.online) {
            (false, true) => NetworkEventKind::WentOnline,
            (true, false) => NetworkEventKind::WentOffline,
            _ if self.quality != next.quality => NetworkEventKind::QualityChanged,
            _ => return None,
        };
        Some(NetworkEvent { kind, online: next.online, quality: next.quality, at: next.changed_at })
    }
}

/// What changed in a [`NetworkEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkEventKind {
    WentOnline,
    WentOffline,
    QualityChanged,
}

/// A connectivity transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEvent {
    pub kind: NetworkEventKind,
    pub online: bool,
    pub quality: ConnectionQuality,
    pub at: Timestamp,
}

#[cfg(test)]
#[path = "network_tests.rs"]
mod tests;
