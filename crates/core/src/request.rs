// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Core request types for the encore queue.
//!
//! A [`Request`] is one entry in an event's song-request queue. Identity is
//! `request_id`; every other field is superseded by the latest authoritative
//! snapshot.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Lifecycle status of a request, assigned by the remote authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Submitted, awaiting a performer decision. Initial state.
    Pending,
    /// Accepted by the performer, waiting to be played.
    Accepted,
    /// Currently being performed.
    Playing,
    /// Performed to completion.
    Completed,
    /// Declined by the performer.
    Vetoed,
}

impl RequestStatus {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Playing => "playing",
            RequestStatus::Completed => "completed",
            RequestStatus::Vetoed => "vetoed",
        }
    }

    /// Returns true if the performer has already acted on this request.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }

    /// Returns true if this is a terminal state (completed or vetoed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Vetoed)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "accepted" => Ok(RequestStatus::Accepted),
            "playing" => Ok(RequestStatus::Playing),
            "completed" => Ok(RequestStatus::Completed),
            "vetoed" => Ok(RequestStatus::Vetoed),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

/// One entry in an event's song-request queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Opaque stable identifier assigned by the remote service.
    pub request_id: String,
    /// Title of the requested song.
    pub song_title: String,
    /// Artist of the requested song.
    pub artist_name: String,
    /// Lifecycle status, authoritative from the latest snapshot.
    pub status: RequestStatus,
    /// 1-based dense position assigned by the remote authority. Never
    /// computed locally except as a provisional hint.
    pub queue_position: u32,
    /// Amount paid for the request, in currency minor units.
    pub price_cents: u32,
    /// Identifier of the requesting audience member.
    pub user_id: String,
    /// Submission time in milliseconds since the Unix epoch.
    pub submitted_at: i64,
}

impl Request {
    /// Returns the submission time as a UTC datetime, if representable.
    pub fn submitted_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.submitted_at).single()
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
