// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Optimistic mutation engine: apply -> undo window -> commit/rollback.
//!
//! A user action is applied to the store immediately and becomes an
//! [`ActionHandle`]. If the handle is not undone inside the undo window,
//! the corresponding remote mutation is issued exactly once; its outcome
//! either commits or rolls back the local change. Commit, rollback, and
//! cancel are mutually exclusive, guarded by the store's forward-only
//! mutation status transitions.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use encore_core::{ClockSource, Error as CoreError, MutationKind, Result as CoreResult};

use crate::error::{Error, Result};
use crate::event::{EventBus, QueueEvent};
use crate::remote::RemoteQueue;
use crate::store::QueueStateStore;
use crate::timer::{Epoch, TimerHandle};

/// Reason sent with veto and refund calls.
const VETO_REASON: &str = "vetoed by performer";

/// Final outcome of one optimistic action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The remote mutation succeeded. `refund_pending` is set when a veto
    /// committed but its refund did not.
    Committed { refund_pending: bool },
    /// Undone inside the undo window; no remote call was ever made.
    Cancelled,
    /// The remote mutation failed and the local change was reverted.
    RolledBack { reason: String, retryable: bool },
}

type OutcomeSlot = Arc<Mutex<Option<oneshot::Sender<ActionOutcome>>>>;

/// Orchestrates optimistic accept/veto actions for one channel.
pub struct MutationEngine {
    set_id: String,
    remote: Arc<dyn RemoteQueue>,
    store: Arc<QueueStateStore>,
    events: EventBus,
    clock: Arc<dyn ClockSource>,
    undo_window: Duration,
    epoch: Epoch,
    cancel: CancellationToken,
}

impl MutationEngine {
    /// Creates an engine acting on behalf of `set_id`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        set_id: impl Into<String>,
        remote: Arc<dyn RemoteQueue>,
        store: Arc<QueueStateStore>,
        events: EventBus,
        clock: Arc<dyn ClockSource>,
        undo_window: Duration,
        epoch: Epoch,
        cancel: CancellationToken,
    ) -> Self {
        MutationEngine {
            set_id: set_id.into(),
            remote,
            store,
            events,
            clock,
            undo_window,
            epoch,
            cancel,
        }
    }

    /// Applies `kind` to a request optimistically and starts the undo
    /// window.
    ///
    /// Rejection (a mutation already pending for the request, or the
    /// request unknown) surfaces immediately and changes nothing.
    pub fn act(&self, request_id: &str, kind: MutationKind) -> Result<ActionHandle> {
        if self.cancel.is_cancelled() {
            return Err(Error::ChannelClosed);
        }

        let applied_at = self.clock.now_ms();
        let commit_after = applied_at + self.undo_window.as_millis() as i64;
        self.store
            .begin_mutation(request_id, kind, applied_at, commit_after)?;
        tracing::debug!("applied optimistic {} to request {}", kind, request_id);

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let outcome: OutcomeSlot = Arc::new(Mutex::new(Some(outcome_tx)));

        let commit = CommitTask {
            request_id: request_id.to_string(),
            kind,
            set_id: self.set_id.clone(),
            remote: Arc::clone(&self.remote),
            store: Arc::clone(&self.store),
            events: self.events.clone(),
            outcome: Arc::clone(&outcome),
        };
        let timer = TimerHandle::schedule(self.undo_window, &self.epoch, &self.cancel, move || {
            commit.run()
        });

        Ok(ActionHandle {
            request_id: request_id.to_string(),
            kind,
            timer,
            store: Arc::clone(&self.store),
            outcome,
            outcome_rx,
        })
    }
}

/// Handle to one in-flight optimistic action.
pub struct ActionHandle {
    request_id: String,
    kind: MutationKind,
    timer: TimerHandle,
    store: Arc<QueueStateStore>,
    outcome: OutcomeSlot,
    outcome_rx: oneshot::Receiver<ActionOutcome>,
}

impl std::fmt::Debug for ActionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionHandle")
            .field("request_id", &self.request_id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl ActionHandle {
    /// The request this action targets.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// What the action does.
    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    /// Cancels the action if the undo window is still open.
    ///
    /// Returns true if the action was undone — no remote call will ever be
    /// made for it. Returns false if commit already started or the action
    /// already resolved (idempotent no-op). Safe to call at any time.
    pub fn undo(&self) -> Result<bool> {
        self.timer.cancel();
        match self.store.cancel_mutation(&self.request_id) {
            Ok(()) => {
                send_outcome(&self.outcome, ActionOutcome::Cancelled);
                tracing::debug!("undid {} on request {}", self.kind, self.request_id);
                Ok(true)
            }
            Err(CoreError::MutationNotFound(_))
            | Err(CoreError::InvalidMutationTransition { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Waits for the final outcome of this action.
    pub async fn outcome(self) -> Result<ActionOutcome> {
        self.outcome_rx.await.map_err(|_| Error::ChannelClosed)
    }
}

/// The deferred commit half of one action.
struct CommitTask {
    request_id: String,
    kind: MutationKind,
    set_id: String,
    remote: Arc<dyn RemoteQueue>,
    store: Arc<QueueStateStore>,
    events: EventBus,
    outcome: OutcomeSlot,
}

impl CommitTask {
    async fn run(self) {
        // Loses the race against undo() atomically: the store only allows
        // PendingUndo -> Committing once.
        if self.store.mark_committing(&self.request_id).is_err() {
            return;
        }

        let result = self.issue_mutation().await;

        match result {
            Ok(refund_pending) => {
                if let Err(e) = self.store.commit_mutation(&self.request_id) {
                    tracing::warn!("commit bookkeeping failed for {}: {}", self.request_id, e);
                }
                self.events.publish(QueueEvent::MutationCommitted {
                    request_id: self.request_id.clone(),
                    kind: self.kind,
                });
                send_outcome(&self.outcome, ActionOutcome::Committed { refund_pending });
            }
            Err(e) => {
                let retryable = e.is_retryable();
                if let Err(rollback_err) = self.store.rollback_mutation(&self.request_id) {
                    tracing::warn!(
                        "rollback bookkeeping failed for {}: {}",
                        self.request_id,
                        rollback_err
                    );
                }
                tracing::warn!("{} of request {} failed: {}", self.kind, self.request_id, e);
                self.events.publish(QueueEvent::MutationRolledBack {
                    request_id: self.request_id.clone(),
                    kind: self.kind,
                    reason: e.to_string(),
                    retryable,
                });
                send_outcome(
                    &self.outcome,
                    ActionOutcome::RolledBack {
                        reason: e.to_string(),
                        retryable,
                    },
                );
            }
        }
    }

    /// Issues the remote mutation. Returns whether a refund is pending.
    async fn issue_mutation(&self) -> CoreResult<bool> {
        match self.kind {
            MutationKind::Accept => {
                self.remote.accept(&self.request_id, &self.set_id).await?;
                Ok(false)
            }
            MutationKind::Veto => {
                self.remote.veto(&self.request_id, VETO_REASON).await?;
                Ok(self.attempt_refund().await)
            }
        }
    }

    /// Best-effort refund after a successful veto. Failure never rolls the
    /// veto back; it raises the refund-pending condition instead.
    async fn attempt_refund(&self) -> bool {
        match self.remote.refund(&self.request_id, VETO_REASON).await {
            Ok(()) => false,
            Err(e) => {
                tracing::warn!("refund failed for vetoed request {}: {}", self.request_id, e);
                self.events.publish(QueueEvent::RefundPending {
                    request_id: self.request_id.clone(),
                });
                true
            }
        }
    }
}

fn send_outcome(slot: &OutcomeSlot, outcome: ActionOutcome) {
    let mut slot = slot.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(tx) = slot.take() {
        let _ = tx.send(outcome);
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
