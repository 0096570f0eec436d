// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for encore-core operations.

use thiserror::Error;

/// All possible errors that can occur in encore-core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network failure on a subscription, query, or mutation call.
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed or unexpected data from the remote service.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Mutation rejected by the remote authority (e.g. the request was
    /// already resolved by another actor). Never retried blindly.
    #[error("request {request_id} already handled: {reason}")]
    Conflict { request_id: String, reason: String },

    /// A veto committed but its refund failed. Non-fatal to the veto;
    /// requires manual follow-up.
    #[error("refund pending for request {request_id}: {reason}")]
    RefundPending { request_id: String, reason: String },

    #[error("a mutation is already pending for request {0}")]
    MutationPending(String),

    #[error("no pending mutation for request {0}")]
    MutationNotFound(String),

    #[error("request not found in current queue: {0}")]
    RequestNotFound(String),

    #[error("invalid mutation transition: cannot go from {from} to {to}")]
    InvalidMutationTransition { from: String, to: String },

    #[error("invalid request status: '{0}'\n  hint: valid statuses are: pending, accepted, playing, completed, vetoed")]
    InvalidStatus(String),

    #[error("invalid mutation kind: '{0}'\n  hint: valid kinds are: accept, veto")]
    InvalidMutationKind(String),

    #[error("no snapshot applied yet")]
    NoSnapshot,

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns true if retrying the failed operation may succeed.
    ///
    /// Transport failures are transient; conflicts and protocol errors
    /// are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

/// A specialized Result type for encore-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
