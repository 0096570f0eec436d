// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Abstraction over the remote queue service.
//!
//! Provides a trait-based client layer that enables:
//! - Real WebSocket connections for production (see [`crate::ws`])
//! - Mock clients for unit testing
//!
//! The subscription is modeled as a plain snapshot stream regardless of
//! the underlying transport, so the connection state machine stays
//! transport-agnostic.

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::BoxStream;

use encore_core::{QueueSnapshot, Result};

/// Boxed future used by [`RemoteQueue`] so implementations and test
/// doubles need no macro support.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Live snapshot feed for one event.
///
/// End of stream is the server's `complete` signal. An `Err(Transport)`
/// item ends the subscription; an `Err(Protocol)` item is a malformed
/// frame the consumer may drop and read past. No backpressure protocol is
/// assumed — the client keeps up or drops.
pub type SnapshotStream = BoxStream<'static, Result<QueueSnapshot>>;

/// Client for the remote queue service.
pub trait RemoteQueue: Send + Sync {
    /// Opens a live snapshot subscription for an event.
    fn subscribe(&self, event_id: &str) -> BoxFuture<'_, Result<SnapshotStream>>;

    /// Fetches a point-in-time snapshot.
    ///
    /// Used by the polling fallback and by initial load.
    fn query(&self, event_id: &str) -> BoxFuture<'_, Result<QueueSnapshot>>;

    /// Accepts a request into a set.
    fn accept(&self, request_id: &str, set_id: &str) -> BoxFuture<'_, Result<()>>;

    /// Vetoes a request.
    fn veto(&self, request_id: &str, reason: &str) -> BoxFuture<'_, Result<()>>;

    /// Refunds a vetoed request.
    fn refund(&self, request_id: &str, reason: &str) -> BoxFuture<'_, Result<()>>;

    /// Marks an accepted request as currently playing.
    fn mark_playing(&self, request_id: &str, set_id: &str) -> BoxFuture<'_, Result<()>>;

    /// Marks a playing request as completed.
    fn mark_completed(&self, request_id: &str) -> BoxFuture<'_, Result<()>>;
}
