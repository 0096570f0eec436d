// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! encore-core: Shared library for the encore request-queue client.
//!
//! This crate provides the data model, error taxonomy, wire protocol
//! messages, and clock primitives used by the encore-sync crate and by
//! the remote service bindings.

pub mod clock;
pub mod error;
pub mod mutation;
pub mod protocol;
pub mod request;
pub mod snapshot;

pub use clock::{ClockSource, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use mutation::{MutationKind, MutationStatus, PendingMutation};
pub use request::{Request, RequestStatus};
pub use snapshot::QueueSnapshot;
