// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic point-in-time fallback feed.
//!
//! When the subscription path is unavailable or its retry budget is
//! exhausted, the polling fallback queries the remote service on a fixed
//! interval. Polling is self-healing: a failed tick is surfaced but never
//! stops the loop. Queries are serialized; if one is still in flight when
//! the next tick fires, that tick is skipped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use encore_core::{Error, QueueSnapshot};

use crate::remote::RemoteQueue;

/// Events reported by the polling task.
#[derive(Debug)]
pub enum PollEvent {
    /// A tick fetched a snapshot.
    Snapshot(QueueSnapshot),
    /// A tick failed. Polling continues.
    Failed(Error),
}

/// Handle to a running polling task.
pub struct PollingFallback {
    cancel: CancellationToken,
}

impl PollingFallback {
    /// Starts polling `event_id` every `interval`; events arrive on the
    /// returned channel. The task stops when `stop` is called, the parent
    /// token cancels, or the receiver is dropped.
    pub fn start(
        remote: Arc<dyn RemoteQueue>,
        event_id: impl Into<String>,
        interval: Duration,
        parent: &CancellationToken,
    ) -> (Self, mpsc::Receiver<PollEvent>) {
        let cancel = parent.child_token();
        let (tx, rx) = mpsc::channel(8);
        let token = cancel.clone();
        let event_id = event_id.into();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = ticker.tick() => {}
                }

                let outcome = tokio::select! {
                    _ = token.cancelled() => return,
                    result = remote.query(&event_id) => result,
                };

                let event = match outcome {
                    Ok(snapshot) => PollEvent::Snapshot(snapshot),
                    Err(e) => {
                        tracing::warn!("poll of event {} failed: {}", event_id, e);
                        PollEvent::Failed(e)
                    }
                };
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        });

        (PollingFallback { cancel }, rx)
    }

    /// Stops the polling task. Idempotent.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for PollingFallback {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
#[path = "polling_tests.rs"]
mod tests;
