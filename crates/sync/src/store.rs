// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queue state: authoritative snapshot plus pending local mutations.
//!
//! The store is the single mutable shared resource of a channel. One mutex
//! guards the `(snapshot, pending-map)` pair so every update is atomic per
//! call; no lock is ever held across an await.
//!
//! The merged [`view`](QueueStateStore::view) hides optimistically vetoed
//! requests and shows optimistically accepted ones as accepted, without
//! reordering — positions stay authoritative. A committed mutation keeps
//! shaping the view until a snapshot confirms its outcome, so a confirmed
//! veto cannot flicker back in between commit and the next snapshot.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use encore_core::{
    Error, MutationKind, MutationStatus, PendingMutation, QueueSnapshot, Request, RequestStatus,
    Result,
};

use crate::event::{EventBus, QueueEvent};

/// Holds the latest snapshot and the pending mutations for one channel.
pub struct QueueStateStore {
    inner: Mutex<StoreInner>,
    events: EventBus,
}

#[derive(Default)]
struct StoreInner {
    snapshot: Option<QueueSnapshot>,
    /// At most one pending mutation per request id.
    pending: HashMap<String, PendingMutation>,
}

impl QueueStateStore {
    /// Creates an empty store publishing to `events`.
    pub fn new(events: EventBus) -> Self {
        QueueStateStore {
            inner: Mutex::new(StoreInner::default()),
            events,
        }
    }

    /// Applies an authoritative snapshot.
    ///
    /// Returns true if the snapshot replaced the current one, false if it
    /// was dropped as a duplicate or as stale (equal-or-older recency).
    /// Invalid snapshots are rejected as protocol errors and leave the
    /// store untouched. A `SnapshotApplied` event fires only on actual
    /// application.
    pub fn apply_snapshot(&self, snapshot: QueueSnapshot) -> Result<bool> {
        snapshot.validate()?;

        let mut inner = self.lock();
        if let Some(current) = &inner.snapshot {
            if !snapshot.supersedes(current) {
                return Ok(false);
            }
        }

        reconcile(&mut inner.pending, &snapshot);

        let event_id = snapshot.event_id.clone();
        let last_updated = snapshot.last_updated;
        inner.snapshot = Some(snapshot);
        drop(inner);

        self.events.publish(QueueEvent::SnapshotApplied {
            event_id,
            last_updated,
        });
        Ok(true)
    }

    /// Starts an optimistic mutation for a request.
    ///
    /// Rejects with `MutationPending` when one already exists for the
    /// request (double-action guard) and with `RequestNotFound` when the
    /// request is absent from the current snapshot.
    pub fn begin_mutation(
        &self,
        request_id: &str,
        kind: MutationKind,
        applied_at: i64,
        commit_after: i64,
    ) -> Result<PendingMutation> {
        let mut inner = self.lock();

        let snapshot = inner.snapshot.as_ref().ok_or(Error::NoSnapshot)?;
        if snapshot.request(request_id).is_none() {
            return Err(Error::RequestNotFound(request_id.to_string()));
        }
        if inner.pending.contains_key(request_id) {
            return Err(Error::MutationPending(request_id.to_string()));
        }

        let mutation = PendingMutation::new(request_id, kind, applied_at, commit_after);
        inner
            .pending
            .insert(request_id.to_string(), mutation.clone());
        Ok(mutation)
    }

    /// Moves a mutation into the committing state.
    ///
    /// Fails when the mutation was already cancelled, which is how the
    /// commit path loses the race against `undo` atomically.
    pub fn mark_committing(&self, request_id: &str) -> Result<()> {
        self.transition(request_id, MutationStatus::Committing)
    }

    /// Marks a mutation committed.
    ///
    /// The entry is retained until an authoritative snapshot reflects the
    /// outcome, keeping the merged view stable in the meantime.
    pub fn commit_mutation(&self, request_id: &str) -> Result<()> {
        self.transition(request_id, MutationStatus::Committed)
    }

    /// Reverts a failed mutation, restoring the pre-action view exactly.
    pub fn rollback_mutation(&self, request_id: &str) -> Result<()> {
        self.remove(request_id, MutationStatus::RolledBack)
    }

    /// Cancels a mutation still inside its undo window.
    pub fn cancel_mutation(&self, request_id: &str) -> Result<()> {
        self.remove(request_id, MutationStatus::Cancelled)
    }

    /// The externally visible merged request sequence.
    pub fn view(&self) -> Vec<Request> {
        let inner = self.lock();
        let Some(snapshot) = &inner.snapshot else {
            return Vec::new();
        };

        snapshot
            .requests
            .iter()
            .filter_map(|request| match inner.pending.get(&request.request_id) {
                Some(mutation) if mutation.affects_view() => match mutation.kind {
                    MutationKind::Veto => None,
                    MutationKind::Accept => {
                        let mut shown = request.clone();
                        if shown.status == RequestStatus::Pending {
                            shown.status = RequestStatus::Accepted;
                        }
                        Some(shown)
                    }
                },
                _ => Some(request.clone()),
            })
            .collect()
    }

    /// The pending mutation for a request, if any.
    pub fn pending_mutation(&self, request_id: &str) -> Option<PendingMutation> {
        self.lock().pending.get(request_id).cloned()
    }

    /// Number of tracked mutations (pending through committed-unconfirmed).
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// The latest applied snapshot, if any.
    pub fn latest_snapshot(&self) -> Option<QueueSnapshot> {
        self.lock().snapshot.clone()
    }

    fn transition(&self, request_id: &str, target: MutationStatus) -> Result<()> {
        let mut inner = self.lock();
        let mutation = inner
            .pending
            .get_mut(request_id)
            .ok_or_else(|| Error::MutationNotFound(request_id.to_string()))?;
        mutation.transition(target)
    }

    fn remove(&self, request_id: &str, target: MutationStatus) -> Result<()> {
        let mut inner = self.lock();
        let mutation = inner
            .pending
            .get_mut(request_id)
            .ok_or_else(|| Error::MutationNotFound(request_id.to_string()))?;
        mutation.transition(target)?;
        inner.pending.remove(request_id);
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Drops committed mutations once the snapshot reflects their outcome.
fn reconcile(pending: &mut HashMap<String, PendingMutation>, snapshot: &QueueSnapshot) {
    pending.retain(|request_id, mutation| {
        if mutation.status != MutationStatus::Committed {
            return true;
        }
        let confirmed = match (mutation.kind, snapshot.request(request_id)) {
            (MutationKind::Veto, None) => true,
            (MutationKind::Veto, Some(request)) => request.status == RequestStatus::Vetoed,
            (MutationKind::Accept, None) => true,
            (MutationKind::Accept, Some(request)) => request.status.is_resolved(),
        };
        if confirmed {
            tracing::debug!(
                "snapshot confirmed committed {} of request {}",
                mutation.kind,
                request_id
            );
        }
        !confirmed
    });
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
