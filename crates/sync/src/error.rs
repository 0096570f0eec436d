// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the encore-sync crate.

use thiserror::Error;

/// All possible errors that can occur in encore-sync operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("channel already open for set {set_id}, event {event_id}")]
    ChannelAlreadyOpen { set_id: String, event_id: String },

    #[error("channel closed")]
    ChannelClosed,

    #[error("{0}")]
    Core(#[from] encore_core::Error),
}

/// A specialized Result type for encore-sync operations.
pub type Result<T> = std::result::Result<T, Error>;
