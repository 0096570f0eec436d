// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Event broadcast for observers of a queue channel.
//!
//! Notification, sound, and UI layers attach here; the sync core never
//! depends on them.

use tokio::sync::broadcast;

use encore_core::MutationKind;

use crate::connection::ConnectionState;

/// Events published by a queue channel.
#[derive(Debug, Clone)]
pub enum QueueEvent {
    /// An authoritative snapshot replaced the current one.
    SnapshotApplied {
        event_id: String,
        last_updated: i64,
    },
    /// The channel's connection state changed.
    ConnectionStateChanged { state: ConnectionState },
    /// An optimistic mutation was confirmed by the remote authority.
    MutationCommitted {
        request_id: String,
        kind: MutationKind,
    },
    /// An optimistic mutation failed remotely and was reverted locally.
    MutationRolledBack {
        request_id: String,
        kind: MutationKind,
        reason: String,
        retryable: bool,
    },
    /// A veto committed but its refund failed; manual follow-up needed.
    RefundPending { request_id: String },
}

/// Broadcast bus for [`QueueEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<QueueEvent>,
}

impl EventBus {
    /// Creates a bus retaining up to `capacity` undelivered events per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        EventBus { tx }
    }

    /// Subscribes to events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.tx.subscribe()
    }

    /// Best-effort publish; absent or lagging receivers are not an error.
    pub fn publish(&self, event: QueueEvent) {
        let _ = self.tx.send(event);
    }
}
