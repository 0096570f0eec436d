// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Authoritative queue snapshots.
//!
//! A [`QueueSnapshot`] is a full, versioned view of one event's ordered
//! queue at one instant. Later snapshots simply overwrite earlier ones;
//! recency is decided by a server-supplied sequence number when present,
//! falling back to the `last_updated` timestamp hint.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::request::Request;

/// A point-in-time view of the full ordered queue for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Event this queue belongs to.
    pub event_id: String,
    /// Requests in authoritative order.
    pub requests: Vec<Request>,
    /// Server-side update time in epoch milliseconds. A monotonic recency
    /// hint only, not a global clock.
    pub last_updated: i64,
    /// Monotonic sequence number, when the remote service supplies one.
    /// Preferred over `last_updated` for recency comparison since it is
    /// immune to producer clock skew.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

impl QueueSnapshot {
    /// Checks the snapshot invariants: unique request ids and an order
    /// consistent with `queue_position`.
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(self.requests.len());
        let mut last_position = 0u32;

        for request in &self.requests {
            if !seen.insert(&request.request_id) {
                return Err(Error::Protocol(format!(
                    "duplicate request id '{}' in snapshot for event {}",
                    request.request_id, self.event_id
                )));
            }
            if request.queue_position <= last_position {
                return Err(Error::Protocol(format!(
                    "queue positions out of order in snapshot for event {}: {} follows {}",
                    self.event_id, request.queue_position, last_position
                )));
            }
            last_position = request.queue_position;
        }

        Ok(())
    }

    /// Returns true if this snapshot is strictly newer than `other`.
    ///
    /// Sequence numbers win when both sides carry one; otherwise the
    /// `last_updated` hint decides. Equal recency is NOT newer.
    pub fn supersedes(&self, other: &QueueSnapshot) -> bool {
        match (self.seq, other.seq) {
            (Some(a), Some(b)) => a > b,
            _ => self.last_updated > other.last_updated,
        }
    }

    /// Looks up a request by id.
    pub fn request(&self, request_id: &str) -> Option<&Request> {
        self.requests.iter().find(|r| r.request_id == request_id)
    }

    /// Number of requests in the snapshot.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
