// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the sync crate.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use encore_core::{Error, QueueSnapshot, Request, RequestStatus, Result};

use crate::remote::{BoxFuture, RemoteQueue, SnapshotStream};

/// Builds a pending request at the given queue position.
pub fn make_request(id: &str, position: u32) -> Request {
    make_request_with_status(id, position, RequestStatus::Pending)
}

/// Builds a request with an explicit status.
pub fn make_request_with_status(id: &str, position: u32, status: RequestStatus) -> Request {
    Request {
        request_id: id.to_string(),
        song_title: format!("Song {}", position),
        artist_name: "Artist".to_string(),
        status,
        queue_position: position,
        price_cents: 500,
        user_id: "user-1".to_string(),
        submitted_at: 1_700_000_000_000,
    }
}

/// Builds a snapshot for the default test event.
pub fn make_snapshot(requests: Vec<Request>, last_updated: i64) -> QueueSnapshot {
    QueueSnapshot {
        event_id: "evt-1".to_string(),
        requests,
        last_updated,
        seq: None,
    }
}

/// Remote calls recorded by [`MockRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Subscribe(String),
    Query(String),
    Accept(String),
    Veto(String),
    Refund(String),
    MarkPlaying(String),
    MarkCompleted(String),
}

impl RemoteCall {
    /// Returns true for calls that mutate remote state.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, RemoteCall::Subscribe(_) | RemoteCall::Query(_))
    }
}

/// Scripted remote client: records every call and serves queued outcomes.
///
/// Subscriptions are driven through the sender returned by
/// [`script_subscription`](MockRemote::script_subscription): send `Ok` for
/// snapshots, `Err` for a stream failure, drop the sender for `complete`.
/// Unscripted mutations succeed; unscripted subscribes and queries fail
/// with a transport error.
pub struct MockRemote {
    calls: Mutex<Vec<RemoteCall>>,
    subscribes: Mutex<VecDeque<Result<mpsc::UnboundedReceiver<Result<QueueSnapshot>>>>>,
    queries: Mutex<VecDeque<Result<QueueSnapshot>>>,
    accepts: Mutex<VecDeque<Result<()>>>,
    vetoes: Mutex<VecDeque<Result<()>>>,
    refunds: Mutex<VecDeque<Result<()>>>,
    query_delay: Mutex<Option<Duration>>,
}

impl MockRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(MockRemote {
            calls: Mutex::new(Vec::new()),
            subscribes: Mutex::new(VecDeque::new()),
            queries: Mutex::new(VecDeque::new()),
            accepts: Mutex::new(VecDeque::new()),
            vetoes: Mutex::new(VecDeque::new()),
            refunds: Mutex::new(VecDeque::new()),
            query_delay: Mutex::new(None),
        })
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of mutation calls made so far.
    pub fn mutation_calls(&self) -> usize {
        self.calls().iter().filter(|c| c.is_mutation()).count()
    }

    /// Scripts a successful subscribe; the returned sender drives the
    /// snapshot stream.
    pub fn script_subscription(&self) -> mpsc::UnboundedSender<Result<QueueSnapshot>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribes.lock().unwrap().push_back(Ok(rx));
        tx
    }

    /// Scripts a failed subscribe.
    pub fn script_subscribe_err(&self, err: Error) {
        self.subscribes.lock().unwrap().push_back(Err(err));
    }

    /// Scripts the outcome of the next query.
    pub fn script_query(&self, result: Result<QueueSnapshot>) {
        self.queries.lock().unwrap().push_back(result);
    }

    /// Scripts the outcome of the next accept call.
    pub fn script_accept(&self, result: Result<()>) {
        self.accepts.lock().unwrap().push_back(result);
    }

    /// Scripts the outcome of the next veto call.
    pub fn script_veto(&self, result: Result<()>) {
        self.vetoes.lock().unwrap().push_back(result);
    }

    /// Scripts the outcome of the next refund call.
    pub fn script_refund(&self, result: Result<()>) {
        self.refunds.lock().unwrap().push_back(result);
    }

    /// Makes every query take `delay` before resolving.
    pub fn set_query_delay(&self, delay: Duration) {
        *self.query_delay.lock().unwrap() = Some(delay);
    }

    fn record(&self, call: RemoteCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn pop_mutation(queue: &Mutex<VecDeque<Result<()>>>) -> Result<()> {
        queue.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

fn stream_from(rx: mpsc::UnboundedReceiver<Result<QueueSnapshot>>) -> SnapshotStream {
    Box::pin(futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    }))
}

impl RemoteQueue for MockRemote {
    fn subscribe(&self, event_id: &str) -> BoxFuture<'_, Result<SnapshotStream>> {
        self.record(RemoteCall::Subscribe(event_id.to_string()));
        let scripted = self.subscribes.lock().unwrap().pop_front();
        Box::pin(async move {
            match scripted {
                Some(Ok(rx)) => Ok(stream_from(rx)),
                Some(Err(e)) => Err(e),
                None => Err(Error::Transport("no scripted subscription".to_string())),
            }
        })
    }

    fn query(&self, event_id: &str) -> BoxFuture<'_, Result<QueueSnapshot>> {
        self.record(RemoteCall::Query(event_id.to_string()));
        let scripted = self.queries.lock().unwrap().pop_front();
        let delay = *self.query_delay.lock().unwrap();
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            scripted.unwrap_or_else(|| Err(Error::Transport("no scripted query".to_string())))
        })
    }

    fn accept(&self, request_id: &str, _set_id: &str) -> BoxFuture<'_, Result<()>> {
        self.record(RemoteCall::Accept(request_id.to_string()));
        let result = Self::pop_mutation(&self.accepts);
        Box::pin(async move { result })
    }

    fn veto(&self, request_id: &str, _reason: &str) -> BoxFuture<'_, Result<()>> {
        self.record(RemoteCall::Veto(request_id.to_string()));
        let result = Self::pop_mutation(&self.vetoes);
        Box::pin(async move { result })
    }

    fn refund(&self, request_id: &str, _reason: &str) -> BoxFuture<'_, Result<()>> {
        self.record(RemoteCall::Refund(request_id.to_string()));
        let result = Self::pop_mutation(&self.refunds);
        Box::pin(async move { result })
    }

    fn mark_playing(&self, request_id: &str, _set_id: &str) -> BoxFuture<'_, Result<()>> {
        self.record(RemoteCall::MarkPlaying(request_id.to_string()));
        Box::pin(async move { Ok(()) })
    }

    fn mark_completed(&self, request_id: &str) -> BoxFuture<'_, Result<()>> {
        self.record(RemoteCall::MarkCompleted(request_id.to_string()));
        Box::pin(async move { Ok(()) })
    }
}
