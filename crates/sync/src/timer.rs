// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellable delayed-action primitive.
//!
//! Every delayed effect in the crate (reconnect backoff, undo windows) runs
//! through a [`TimerHandle`] so it can be cancelled explicitly rather than
//! abandoned. A timer additionally captures its owner's [`Epoch`]
//! generation at creation; when the owner advances the epoch on logical
//! shutdown, timers from older generations refuse to fire even if their
//! cancellation raced the shutdown.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Shared generation counter invalidating scheduled work in bulk.
#[derive(Debug, Clone, Default)]
pub struct Epoch(Arc<AtomicU64>);

impl Epoch {
    /// Creates a new epoch at generation zero.
    pub fn new() -> Self {
        Epoch(Arc::new(AtomicU64::new(0)))
    }

    /// Returns the current generation.
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Advances the generation, making all timers created under earlier
    /// generations inert.
    pub fn advance(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }
}

/// A cancellable delayed action.
pub struct TimerHandle {
    token: CancellationToken,
    epoch: Epoch,
    generation: u64,
}

impl TimerHandle {
    /// Creates a timer for in-place waits, cancelled with `parent`.
    pub fn new(epoch: &Epoch, parent: &CancellationToken) -> Self {
        TimerHandle {
            token: parent.child_token(),
            epoch: epoch.clone(),
            generation: epoch.current(),
        }
    }

    /// Schedules `action` to run after `delay`.
    ///
    /// The action is skipped if the timer is cancelled or the epoch
    /// advances before the delay elapses.
    pub fn schedule<F, Fut>(
        delay: Duration,
        epoch: &Epoch,
        parent: &CancellationToken,
        action: F,
    ) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = Self::new(epoch, parent);
        let token = handle.token.clone();
        let epoch = handle.epoch.clone();
        let generation = handle.generation;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if epoch.current() == generation {
                        action().await;
                    }
                }
            }
        });

        handle
    }

    /// Waits in place for `delay`.
    ///
    /// Returns false if the timer was cancelled or its epoch advanced
    /// before the delay elapsed.
    pub async fn wait(&self, delay: Duration) -> bool {
        tokio::select! {
            _ = self.token.cancelled() => false,
            _ = tokio::time::sleep(delay) => self.epoch.current() == self.generation,
        }
    }

    /// Cancels the timer. Idempotent; safe to call after firing.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true if this timer (or its parent) was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
