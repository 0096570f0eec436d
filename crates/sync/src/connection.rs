// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connection supervision for queue channels.
//!
//! The [`ConnectionManager`] owns one logical channel per
//! `(set_id, event_id)` pair. Each channel runs a supervisor task driving
//! the state machine:
//!
//! ```text
//! CONNECTING ──ok──► CONNECTED ──stream error/complete──► ERROR
//!     ▲                                                     │
//!     │  backoff (min(1000·2^n, 30000) ms, n < 5)           │
//!     └─────────────────────────────────────────────────────┤
//!                                                           │ n >= 5
//!                    DISCONNECTED / CONNECTED_POLLING ◄─────┘
//! ```
//!
//! Going offline from any state parks the channel in DISCONNECTED without
//! consuming a retry; the following online edge reconnects immediately
//! with the attempt counter reset.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::StreamExt;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use encore_core::{
    ClockSource, Error as CoreError, MutationKind, QueueSnapshot, Request, SystemClock,
};

use crate::config::ChannelConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::engine::{ActionHandle, MutationEngine};
use crate::error::{Error, Result};
use crate::event::{EventBus, QueueEvent};
use crate::polling::{PollEvent, PollingFallback};
use crate::remote::{RemoteQueue, SnapshotStream};
use crate::store::QueueStateStore;
use crate::timer::{Epoch, TimerHandle};

const STATE_CONNECTING: u8 = 0;
const STATE_CONNECTED: u8 = 1;
const STATE_CONNECTED_POLLING: u8 = 2;
const STATE_DISCONNECTED: u8 = 3;
const STATE_ERROR: u8 = 4;

/// Externally observable state of one queue channel.
///
/// Owned exclusively by the channel's supervisor; everyone else observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Attempting to open the live subscription.
    Connecting,
    /// Live subscription active.
    Connected,
    /// Degraded: fed by periodic polling.
    ConnectedPolling,
    /// No feed at all (offline, or polling not yet succeeding).
    Disconnected,
    /// The subscription failed; a reconnect is pending.
    Error,
}

impl ConnectionState {
    /// Returns the string representation used in display and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::ConnectedPolling => "connected_polling",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Error => "error",
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            ConnectionState::Connecting => STATE_CONNECTING,
            ConnectionState::Connected => STATE_CONNECTED,
            ConnectionState::ConnectedPolling => STATE_CONNECTED_POLLING,
            ConnectionState::Disconnected => STATE_DISCONNECTED,
            ConnectionState::Error => STATE_ERROR,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            STATE_CONNECTING => ConnectionState::Connecting,
            STATE_CONNECTED => ConnectionState::Connected,
            STATE_CONNECTED_POLLING => ConnectionState::ConnectedPolling,
            STATE_ERROR => ConnectionState::Error,
            _ => ConnectionState::Disconnected,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Channel state shared between the supervisor task and observers.
///
/// Atomic fields allow lock-free reads from any task.
pub struct SharedChannelState {
    state: AtomicU8,
    attempt: AtomicU32,
}

impl SharedChannelState {
    fn new() -> Self {
        SharedChannelState {
            state: AtomicU8::new(STATE_CONNECTING),
            attempt: AtomicU32::new(0),
        }
    }

    /// Current connection state.
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Current consecutive-failure count.
    pub fn attempt(&self) -> u32 {
        self.attempt.load(Ordering::Acquire)
    }

    /// Sets the state, publishing an event only on an actual change.
    fn set(&self, state: ConnectionState, events: &EventBus) {
        let prev = self.state.swap(state.to_u8(), Ordering::AcqRel);
        if prev != state.to_u8() {
            tracing::debug!(
                "connection state {} -> {}",
                ConnectionState::from_u8(prev),
                state
            );
            events.publish(QueueEvent::ConnectionStateChanged { state });
        }
    }

    fn set_attempt(&self, attempt: u32) {
        self.attempt.store(attempt, Ordering::Release);
    }
}

/// Supervises live-update channels, one per `(set_id, event_id)` pair.
pub struct ConnectionManager {
    remote: Arc<dyn RemoteQueue>,
    connectivity: Arc<dyn ConnectivityMonitor>,
    clock: Arc<dyn ClockSource>,
    config: ChannelConfig,
    /// Channels owned by this manager instance; entries live exactly from
    /// `open` to `close`.
    channels: Mutex<HashMap<(String, String), CancellationToken>>,
}

impl ConnectionManager {
    /// Creates a manager over the given remote client and connectivity
    /// monitor.
    pub fn new(
        remote: Arc<dyn RemoteQueue>,
        connectivity: Arc<dyn ConnectivityMonitor>,
        config: ChannelConfig,
    ) -> Self {
        Self::with_clock(remote, connectivity, config, Arc::new(SystemClock))
    }

    /// Creates a manager with a custom clock source (for testing).
    pub fn with_clock(
        remote: Arc<dyn RemoteQueue>,
        connectivity: Arc<dyn ConnectivityMonitor>,
        config: ChannelConfig,
        clock: Arc<dyn ClockSource>,
    ) -> Self {
        ConnectionManager {
            remote,
            connectivity,
            clock,
            config,
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Opens the channel for `(set_id, event_id)` and starts its
    /// supervisor task. A second open of a live key is rejected.
    pub fn open(&self, set_id: &str, event_id: &str) -> Result<ChannelHandle> {
        let key = (set_id.to_string(), event_id.to_string());
        let mut channels = self.lock_channels();
        if channels.contains_key(&key) {
            return Err(Error::ChannelAlreadyOpen {
                set_id: key.0,
                event_id: key.1,
            });
        }

        let cancel = CancellationToken::new();
        let epoch = Epoch::new();
        let events = EventBus::new(self.config.event_capacity);
        let state = Arc::new(SharedChannelState::new());
        let store = Arc::new(QueueStateStore::new(events.clone()));
        let engine = Arc::new(MutationEngine::new(
            set_id,
            Arc::clone(&self.remote),
            Arc::clone(&store),
            events.clone(),
            Arc::clone(&self.clock),
            self.config.undo_window(),
            epoch.clone(),
            cancel.clone(),
        ));

        tokio::spawn(run_channel(ChannelContext {
            event_id: event_id.to_string(),
            remote: Arc::clone(&self.remote),
            connectivity: Arc::clone(&self.connectivity),
            store: Arc::clone(&store),
            state: Arc::clone(&state),
            events: events.clone(),
            config: self.config.clone(),
            cancel: cancel.clone(),
            epoch: epoch.clone(),
        }));

        channels.insert(key.clone(), cancel.clone());
        tracing::debug!("opened channel for set {} event {}", key.0, key.1);

        Ok(ChannelHandle {
            set_id: key.0,
            event_id: key.1,
            remote: Arc::clone(&self.remote),
            store,
            engine,
            state,
            events,
            cancel,
            epoch,
        })
    }

    /// Closes a channel: cancels all of its timers, unsubscribes, stops
    /// polling, and invalidates pending delayed work. The only terminal
    /// transition; idempotent through the token.
    pub fn close(&self, handle: ChannelHandle) {
        let key = (handle.set_id.clone(), handle.event_id.clone());
        handle.epoch.advance();
        handle.cancel.cancel();
        self.lock_channels().remove(&key);
        tracing::debug!("closed channel for set {} event {}", key.0, key.1);
    }

    /// Number of currently open channels.
    pub fn open_channels(&self) -> usize {
        self.lock_channels().len()
    }

    fn lock_channels(&self) -> MutexGuard<'_, HashMap<(String, String), CancellationToken>> {
        self.channels.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Handle to one open queue channel.
pub struct ChannelHandle {
    set_id: String,
    event_id: String,
    remote: Arc<dyn RemoteQueue>,
    store: Arc<QueueStateStore>,
    engine: Arc<MutationEngine>,
    state: Arc<SharedChannelState>,
    events: EventBus,
    cancel: CancellationToken,
    epoch: Epoch,
}

impl ChannelHandle {
    /// The set this channel acts on behalf of.
    pub fn set_id(&self) -> &str {
        &self.set_id
    }

    /// The event whose queue this channel follows.
    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    /// The merged, ordered request view.
    pub fn view(&self) -> Vec<Request> {
        self.store.view()
    }

    /// The current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.state.get()
    }

    /// The current consecutive subscription-failure count.
    pub fn attempt(&self) -> u32 {
        self.state.attempt()
    }

    /// Subscribes to queue events published after this call.
    pub fn events(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    /// Starts an optimistic action with an undo window.
    pub fn act(&self, request_id: &str, kind: MutationKind) -> Result<ActionHandle> {
        self.engine.act(request_id, kind)
    }

    /// Marks a request as playing. Direct passthrough, not optimistic;
    /// works on the mutation path even while degraded to polling.
    pub async fn mark_playing(&self, request_id: &str) -> Result<()> {
        self.remote.mark_playing(request_id, &self.set_id).await?;
        Ok(())
    }

    /// Marks a request as completed. Direct passthrough, not optimistic.
    pub async fn mark_completed(&self, request_id: &str) -> Result<()> {
        self.remote.mark_completed(request_id).await?;
        Ok(())
    }
}

struct ChannelContext {
    event_id: String,
    remote: Arc<dyn RemoteQueue>,
    connectivity: Arc<dyn ConnectivityMonitor>,
    store: Arc<QueueStateStore>,
    state: Arc<SharedChannelState>,
    events: EventBus,
    config: ChannelConfig,
    cancel: CancellationToken,
    epoch: Epoch,
}

enum PumpExit {
    Cancelled,
    Offline,
    Failed,
}

enum PollExit {
    Cancelled,
    Offline,
    Restored,
}

/// Supervisor loop for one channel.
async fn run_channel(ctx: ChannelContext) {
    let mut reachable = ctx.connectivity.watch();
    let mut attempt: u32 = 0;

    loop {
        if ctx.cancel.is_cancelled() {
            return;
        }

        if !*reachable.borrow_and_update() {
            // Environment condition, not a protocol failure: park without
            // consuming a retry.
            ctx.state.set(ConnectionState::Disconnected, &ctx.events);
            if !wait_until_reachable(&mut reachable, &ctx.cancel).await {
                return;
            }
            attempt = 0;
            ctx.state.set_attempt(0);
        }

        ctx.state.set(ConnectionState::Connecting, &ctx.events);

        match ctx.remote.subscribe(&ctx.event_id).await {
            Ok(stream) => {
                attempt = 0;
                ctx.state.set_attempt(0);
                ctx.state.set(ConnectionState::Connected, &ctx.events);
                match pump_subscription(&ctx, stream, &mut reachable).await {
                    PumpExit::Cancelled => return,
                    PumpExit::Offline => continue,
                    PumpExit::Failed => {}
                }
            }
            Err(e) => {
                tracing::warn!("subscribe to event {} failed: {}", ctx.event_id, e);
            }
        }

        ctx.state.set(ConnectionState::Error, &ctx.events);

        if attempt >= ctx.config.max_subscribe_attempts {
            // Retry budget exhausted: degrade to polling until connectivity
            // cycles or the channel closes.
            match run_polling(&ctx, &mut reachable).await {
                PollExit::Cancelled => return,
                PollExit::Restored | PollExit::Offline => {
                    attempt = 0;
                    ctx.state.set_attempt(0);
                    continue;
                }
            }
        }

        let delay = ctx.config.backoff_delay(attempt);
        attempt += 1;
        ctx.state.set_attempt(attempt);
        tracing::debug!(
            "reconnecting to event {} in {:?} (attempt {})",
            ctx.event_id,
            delay,
            attempt
        );

        let timer = TimerHandle::new(&ctx.epoch, &ctx.cancel);
        tokio::select! {
            elapsed = timer.wait(delay) => {
                if !elapsed {
                    return;
                }
            }
            _ = reachability_changed(&mut reachable) => {
                // The loop head handles both edge directions.
                timer.cancel();
            }
        }
    }
}

/// Forwards subscription snapshots into the store until the stream ends.
async fn pump_subscription(
    ctx: &ChannelContext,
    mut stream: SnapshotStream,
    reachable: &mut watch::Receiver<bool>,
) -> PumpExit {
    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => return PumpExit::Cancelled,
            _ = reachability_changed(reachable) => {
                if !*reachable.borrow() {
                    return PumpExit::Offline;
                }
            }
            item = stream.next() => match item {
                Some(Ok(snapshot)) => apply_snapshot(ctx, snapshot),
                Some(Err(CoreError::Protocol(e))) => {
                    // Bad frame: drop it, keep the subscription.
                    tracing::warn!(
                        "dropping malformed snapshot for event {}: {}",
                        ctx.event_id,
                        e
                    );
                }
                Some(Err(e)) => {
                    tracing::warn!("subscription to event {} failed: {}", ctx.event_id, e);
                    return PumpExit::Failed;
                }
                None => {
                    tracing::debug!("subscription to event {} completed", ctx.event_id);
                    return PumpExit::Failed;
                }
            }
        }
    }
}

/// Polling mode: DISCONNECTED until the first successful poll, then
/// CONNECTED_POLLING. Exits on a connectivity edge or channel close.
async fn run_polling(ctx: &ChannelContext, reachable: &mut watch::Receiver<bool>) -> PollExit {
    ctx.state.set(ConnectionState::Disconnected, &ctx.events);

    let (polling, mut feed) = PollingFallback::start(
        Arc::clone(&ctx.remote),
        ctx.event_id.clone(),
        ctx.config.poll_interval(),
        &ctx.cancel,
    );

    let exit = loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => break PollExit::Cancelled,
            _ = reachability_changed(reachable) => {
                if *reachable.borrow() {
                    // Restored edge: abandon the poll interval and retry
                    // the subscription immediately.
                    break PollExit::Restored;
                }
                break PollExit::Offline;
            }
            event = feed.recv() => match event {
                Some(PollEvent::Snapshot(snapshot)) => {
                    apply_snapshot(ctx, snapshot);
                    ctx.state.set(ConnectionState::ConnectedPolling, &ctx.events);
                }
                Some(PollEvent::Failed(_)) => {
                    // Self-healing: the polling task already logged it.
                }
                None => break PollExit::Cancelled,
            }
        }
    };

    polling.stop();
    exit
}

fn apply_snapshot(ctx: &ChannelContext, snapshot: QueueSnapshot) {
    match ctx.store.apply_snapshot(snapshot) {
        Ok(true) => {}
        Ok(false) => tracing::debug!("discarded stale snapshot for event {}", ctx.event_id),
        Err(e) => tracing::warn!("dropping invalid snapshot for event {}: {}", ctx.event_id, e),
    }
}

/// Resolves when the reachability value changes; pends forever if the
/// monitor has gone away.
async fn reachability_changed(rx: &mut watch::Receiver<bool>) {
    if rx.changed().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Parks until connectivity returns. Returns false if the channel closed
/// first.
async fn wait_until_reachable(rx: &mut watch::Receiver<bool>, cancel: &CancellationToken) -> bool {
    loop {
        if *rx.borrow_and_update() {
            return true;
        }
        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = reachability_changed(rx) => {}
        }
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
