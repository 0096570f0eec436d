// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration for queue channels.

use std::time::Duration;

/// Configuration for one queue channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Initial delay for exponential reconnect backoff (milliseconds).
    pub initial_backoff_ms: u64,
    /// Maximum reconnect backoff delay (milliseconds).
    pub max_backoff_ms: u64,
    /// Failed subscription attempts before degrading to polling.
    pub max_subscribe_attempts: u32,
    /// Interval between polling-fallback queries (milliseconds).
    pub poll_interval_ms: u64,
    /// Grace window during which an optimistic action can be undone
    /// (milliseconds).
    pub undo_window_ms: u64,
    /// Capacity of the per-channel event broadcast.
    pub event_capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig {
            initial_backoff_ms: 1000,
            max_backoff_ms: 30_000,
            max_subscribe_attempts: 5,
            poll_interval_ms: 10_000,
            undo_window_ms: 5000,
            event_capacity: 64,
        }
    }
}

impl ChannelConfig {
    /// Backoff delay before reconnect attempt `attempt` (0-based):
    /// `min(initial * 2^attempt, max)`, saturating.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let delay_ms = if attempt >= 63 {
            u64::MAX
        } else {
            self.initial_backoff_ms.saturating_mul(1u64 << attempt)
        };
        Duration::from_millis(delay_ms.min(self.max_backoff_ms))
    }

    /// Undo window as a [`Duration`].
    pub fn undo_window(&self) -> Duration {
        Duration::from_millis(self.undo_window_ms)
    }

    /// Polling interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
