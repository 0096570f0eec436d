// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios across the connection manager, store, and engine.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use encore_core::{ManualClock, MutationKind, RequestStatus};

use crate::config::ChannelConfig;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::connectivity::ManualConnectivity;
use crate::engine::ActionOutcome;
use crate::event::QueueEvent;
use crate::test_helpers::{make_request, make_snapshot, MockRemote};

async fn wait_for_state(events: &mut broadcast::Receiver<QueueEvent>, want: ConnectionState) {
    loop {
        if let QueueEvent::ConnectionStateChanged { state } = events.recv().await.unwrap() {
            if state == want {
                return;
            }
        }
    }
}

async fn wait_for_snapshot(events: &mut broadcast::Receiver<QueueEvent>) {
    loop {
        if matches!(
            events.recv().await.unwrap(),
            QueueEvent::SnapshotApplied { .. }
        ) {
            return;
        }
    }
}

fn make_manager(remote: &Arc<MockRemote>) -> ConnectionManager {
    ConnectionManager::with_clock(
        remote.clone(),
        Arc::new(ManualConnectivity::new(true)),
        ChannelConfig::default(),
        Arc::new(ManualClock::new(1_000_000)),
    )
}

/// A veto hides the request immediately; once the veto commits and a fresh
/// snapshot omits the request, the view does not change again.
#[tokio::test(start_paused = true)]
async fn optimistic_veto_converges_without_flicker() {
    let remote = MockRemote::new();
    let feed = remote.script_subscription();
    let manager = make_manager(&remote);
    let handle = manager.open("set-1", "evt-1").unwrap();
    let mut events = handle.events();
    wait_for_state(&mut events, ConnectionState::Connected).await;

    feed.send(Ok(make_snapshot(
        vec![
            make_request("req-1", 1),
            make_request("req-2", 2),
            make_request("req-3", 3),
        ],
        1000,
    )))
    .unwrap();
    wait_for_snapshot(&mut events).await;

    let action = handle.act("req-2", MutationKind::Veto).unwrap();

    // Hidden immediately, before the undo window expires.
    let ids: Vec<String> = handle.view().into_iter().map(|r| r.request_id).collect();
    assert_eq!(ids, vec!["req-1", "req-3"]);
    assert_eq!(remote.mutation_calls(), 0);

    // No undo: the veto commits (with its refund).
    let outcome = action.outcome().await.unwrap();
    assert_eq!(
        outcome,
        ActionOutcome::Committed {
            refund_pending: false
        }
    );

    // The confirming snapshot omits req-2; the visible queue is already
    // correct and does not change.
    let ids_before: Vec<String> = handle.view().into_iter().map(|r| r.request_id).collect();
    feed.send(Ok(make_snapshot(
        vec![make_request("req-1", 1), make_request("req-3", 2)],
        2000,
    )))
    .unwrap();
    wait_for_snapshot(&mut events).await;
    let ids_after: Vec<String> = handle.view().into_iter().map(|r| r.request_id).collect();
    assert_eq!(ids_after, ids_before);

    manager.close(handle);
}

/// Undo within the window: zero remote mutation calls, original view.
#[tokio::test(start_paused = true)]
async fn undo_restores_the_original_status() {
    let remote = MockRemote::new();
    let feed = remote.script_subscription();
    let manager = make_manager(&remote);
    let handle = manager.open("set-1", "evt-1").unwrap();
    let mut events = handle.events();
    wait_for_state(&mut events, ConnectionState::Connected).await;

    feed.send(Ok(make_snapshot(vec![make_request("req-1", 1)], 1000)))
        .unwrap();
    wait_for_snapshot(&mut events).await;

    let action = handle.act("req-1", MutationKind::Accept).unwrap();
    assert_eq!(handle.view()[0].status, RequestStatus::Accepted);

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert!(action.undo().unwrap());

    assert_eq!(remote.mutation_calls(), 0);
    assert_eq!(handle.view()[0].status, RequestStatus::Pending);

    // Long after the window would have expired: still nothing sent.
    tokio::time::sleep(Duration::from_millis(10_000)).await;
    assert_eq!(remote.mutation_calls(), 0);

    manager.close(handle);
}
