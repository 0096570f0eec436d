// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol messages for client-server communication.
//!
//! The protocol is simple:
//! - Client subscribes to an event's queue, queries it, or submits mutations
//! - Server streams snapshots and acknowledges or rejects mutations
//!
//! The sync core never depends on this shape; only the WebSocket binding
//! in encore-sync speaks it.

use serde::{Deserialize, Serialize};

use crate::snapshot::QueueSnapshot;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open a snapshot subscription for an event.
    Subscribe {
        /// Event whose queue to follow.
        event_id: String,
    },

    /// Request a single point-in-time snapshot.
    ///
    /// Used by polling and by initial load.
    Query {
        /// Event whose queue to fetch.
        event_id: String,
    },

    /// Accept a request into a set.
    Accept { request_id: String, set_id: String },

    /// Veto a request.
    Veto { request_id: String, reason: String },

    /// Refund a vetoed request.
    Refund { request_id: String, reason: String },

    /// Mark an accepted request as currently playing.
    MarkPlaying { request_id: String, set_id: String },

    /// Mark a playing request as completed.
    MarkCompleted { request_id: String },
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A full queue snapshot, streamed on subscriptions and returned for
    /// queries.
    Snapshot(QueueSnapshot),

    /// Mutation applied by the remote authority.
    Ack,

    /// Mutation rejected by the remote authority (already handled by
    /// another actor, unknown request, ...).
    Rejected {
        /// Request the rejected mutation targeted.
        request_id: String,
        /// Human-readable rejection reason.
        reason: String,
    },

    /// Server-side failure unrelated to any particular mutation.
    Error {
        /// Human-readable error description.
        message: String,
    },
}

impl ClientMessage {
    /// Creates a Subscribe message.
    pub fn subscribe(event_id: impl Into<String>) -> Self {
        ClientMessage::Subscribe {
            event_id: event_id.into(),
        }
    }

    /// Creates a Query message.
    pub fn query(event_id: impl Into<String>) -> Self {
        ClientMessage::Query {
            event_id: event_id.into(),
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Creates a Snapshot message.
    pub fn snapshot(snapshot: QueueSnapshot) -> Self {
        ServerMessage::Snapshot(snapshot)
    }

    /// Creates a Rejected message.
    pub fn rejected(request_id: impl Into<String>, reason: impl Into<String>) -> Self {
        ServerMessage::Rejected {
            request_id: request_id.into(),
            reason: reason.into(),
        }
    }

    /// Creates an Error message.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
