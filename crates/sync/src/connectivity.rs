// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Network reachability reporting.
//!
//! The connection manager only cares about the current value and the
//! offline/online edges; there is no guarantee about delivery order
//! relative to in-flight remote calls.

use tokio::sync::watch;

/// Reports current network reachability and its transitions.
pub trait ConnectivityMonitor: Send + Sync {
    /// Current reachability.
    fn is_reachable(&self) -> bool;

    /// A receiver observing reachable/unreachable edges.
    fn watch(&self) -> watch::Receiver<bool>;
}

/// Monitor for hosts without a platform reachability signal: always
/// reachable, never an edge.
#[derive(Debug)]
pub struct AlwaysOnline {
    tx: watch::Sender<bool>,
}

impl AlwaysOnline {
    /// Creates the monitor.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(true);
        AlwaysOnline { tx }
    }
}

impl Default for AlwaysOnline {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityMonitor for AlwaysOnline {
    fn is_reachable(&self) -> bool {
        true
    }

    fn watch(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Manually driven monitor, fed by a platform adapter (or a test).
#[derive(Debug)]
pub struct ManualConnectivity {
    tx: watch::Sender<bool>,
}

impl ManualConnectivity {
    /// Creates the monitor with an initial reachability value.
    pub fn new(reachable: bool) -> Self {
        let (tx, _) = watch::channel(reachable);
        ManualConnectivity { tx }
    }

    /// Reports the current reachability. Repeating the current value does
    /// not produce an edge.
    pub fn set_reachable(&self, reachable: bool) {
        self.tx.send_if_modified(|current| {
            if *current == reachable {
                false
            } else {
                *current = reachable;
                true
            }
        });
    }
}

impl ConnectivityMonitor for ManualConnectivity {
    fn is_reachable(&self) -> bool {
        *self.tx.borrow()
    }

    fn watch(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
#[path = "connectivity_tests.rs"]
mod tests;
