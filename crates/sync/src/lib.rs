// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! encore-sync: queue synchronization core for the encore request platform.
//!
//! Keeps a client's local view of an externally-owned, frequently-mutated
//! request queue consistent with the remote source of truth, despite
//! unreliable connectivity, while letting the performer apply optimistic
//! accept/veto actions that are reversible for a grace window.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐    ┌─────────────┐    ┌─────────────┐
//! │ ConnectionManager│───►│ RemoteQueue │───►│   Remote    │
//! │  (per channel)   │◄───│   (trait)   │◄───│   Service   │
//! └────────┬─────────┘    └─────────────┘    └─────────────┘
//!          │ snapshots                ▲
//!          ▼                          │ mutations
//! ┌──────────────────┐    ┌───────────┴────────┐
//! │  QueueStateStore │◄───│ MutationEngine     │
//! │ (merged view)    │    │ (act / undo)       │
//! └──────────────────┘    └────────────────────┘
//! ```
//!
//! # Features
//!
//! - Live snapshot subscription with bounded exponential-backoff reconnect
//! - Degradation to periodic polling once the retry budget is exhausted
//! - Optimistic accept/veto with an undo window and commit/rollback
//! - Flicker-free reconciliation of snapshots with pending local mutations
//! - Connectivity-edge handling (offline pauses, online reconnects)
//! - Injectable remote client and clock for deterministic tests

pub mod config;
pub mod connection;
pub mod connectivity;
pub mod engine;
pub mod error;
pub mod event;
pub mod polling;
pub mod remote;
pub mod store;
pub mod timer;
pub mod ws;

pub use config::ChannelConfig;
pub use connection::{ChannelHandle, ConnectionManager, ConnectionState};
pub use connectivity::{AlwaysOnline, ConnectivityMonitor, ManualConnectivity};
pub use engine::{ActionHandle, ActionOutcome, MutationEngine};
pub use error::{Error, Result};
pub use event::{EventBus, QueueEvent};
pub use polling::{PollEvent, PollingFallback};
pub use remote::{BoxFuture, RemoteQueue, SnapshotStream};
pub use store::QueueStateStore;
pub use timer::{Epoch, TimerHandle};
pub use ws::WsRemoteQueue;

#[cfg(test)]
mod test_helpers;

#[cfg(test)]
mod integration_tests;
