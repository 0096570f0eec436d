// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Pending optimistic mutations.
//!
//! A [`PendingMutation`] tracks one local, not-yet-confirmed state change.
//! Status only moves forward: `PendingUndo` either cancels (undo) or starts
//! committing; a committing mutation either commits or rolls back. There is
//! never more than one pending mutation per request id.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// The two user-initiated optimistic actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    /// Accept the request into the performer's set.
    Accept,
    /// Decline the request (with a best-effort refund).
    Veto,
}

impl MutationKind {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Accept => "accept",
            MutationKind::Veto => "veto",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MutationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "accept" => Ok(MutationKind::Accept),
            "veto" => Ok(MutationKind::Veto),
            _ => Err(Error::InvalidMutationKind(s.to_string())),
        }
    }
}

/// Lifecycle status of a pending mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationStatus {
    /// Applied locally; the undo window is still open.
    PendingUndo,
    /// The undo window expired; the remote call is in flight.
    Committing,
    /// The remote call succeeded.
    Committed,
    /// The remote call failed; the local change was reverted.
    RolledBack,
    /// Undone by the user before any remote call was made.
    Cancelled,
}

impl MutationStatus {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationStatus::PendingUndo => "pending_undo",
            MutationStatus::Committing => "committing",
            MutationStatus::Committed => "committed",
            MutationStatus::RolledBack => "rolled_back",
            MutationStatus::Cancelled => "cancelled",
        }
    }

    /// Check if a transition from this status to target is valid.
    ///
    /// The lattice is forward-only; commit, rollback, and cancel are
    /// mutually exclusive outcomes.
    pub fn can_transition_to(&self, target: MutationStatus) -> bool {
        matches!(
            (self, target),
            (
                MutationStatus::PendingUndo,
                MutationStatus::Committing | MutationStatus::Cancelled
            ) | (
                MutationStatus::Committing,
                MutationStatus::Committed | MutationStatus::RolledBack
            )
        )
    }

    /// Returns true if no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MutationStatus::Committed | MutationStatus::RolledBack | MutationStatus::Cancelled
        )
    }
}

impl fmt::Display for MutationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A local, not-yet-confirmed state change for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMutation {
    /// Request the mutation applies to.
    pub request_id: String,
    /// What the user asked for.
    pub kind: MutationKind,
    /// When the user acted, epoch milliseconds.
    pub applied_at: i64,
    /// Deadline after which the remote call is issued, epoch milliseconds.
    pub commit_after: i64,
    /// Current lifecycle status.
    pub status: MutationStatus,
}

impl PendingMutation {
    /// Creates a new mutation in the `PendingUndo` state.
    pub fn new(request_id: impl Into<String>, kind: MutationKind, applied_at: i64, commit_after: i64) -> Self {
        PendingMutation {
            request_id: request_id.into(),
            kind,
            applied_at,
            commit_after,
            status: MutationStatus::PendingUndo,
        }
    }

    /// Advances the status, rejecting any transition the lattice forbids.
    pub fn transition(&mut self, target: MutationStatus) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(Error::InvalidMutationTransition {
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }
        self.status = target;
        Ok(())
    }

    /// Returns true if the merged view must still reflect this mutation.
    ///
    /// Committed mutations keep shaping the view until an authoritative
    /// snapshot reflects the outcome, so a confirmed veto cannot flicker
    /// back in between commit and the next snapshot.
    pub fn affects_view(&self) -> bool {
        matches!(
            self.status,
            MutationStatus::PendingUndo | MutationStatus::Committing | MutationStatus::Committed
        )
    }
}

#[cfg(test)]
#[path = "mutation_tests.rs"]
mod tests;
