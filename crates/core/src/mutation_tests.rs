// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    undo_to_committing = { MutationStatus::PendingUndo, MutationStatus::Committing },
    undo_to_cancelled = { MutationStatus::PendingUndo, MutationStatus::Cancelled },
    committing_to_committed = { MutationStatus::Committing, MutationStatus::Committed },
    committing_to_rolled_back = { MutationStatus::Committing, MutationStatus::RolledBack },
)]
fn status_allows_forward_transitions(from: MutationStatus, to: MutationStatus) {
    assert!(from.can_transition_to(to));
}

#[parameterized(
    undo_to_committed = { MutationStatus::PendingUndo, MutationStatus::Committed },
    undo_to_rolled_back = { MutationStatus::PendingUndo, MutationStatus::RolledBack },
    committing_to_cancelled = { MutationStatus::Committing, MutationStatus::Cancelled },
    committed_to_rolled_back = { MutationStatus::Committed, MutationStatus::RolledBack },
    cancelled_to_committing = { MutationStatus::Cancelled, MutationStatus::Committing },
    rolled_back_to_committed = { MutationStatus::RolledBack, MutationStatus::Committed },
    self_transition = { MutationStatus::Committing, MutationStatus::Committing },
)]
fn status_rejects_invalid_transitions(from: MutationStatus, to: MutationStatus) {
    assert!(!from.can_transition_to(to));
}

#[test]
fn mutation_transition_enforces_lattice() {
    let mut mutation = PendingMutation::new("req-1", MutationKind::Veto, 1000, 6000);
    assert_eq!(mutation.status, MutationStatus::PendingUndo);

    mutation.transition(MutationStatus::Committing).unwrap();
    mutation.transition(MutationStatus::Committed).unwrap();

    let err = mutation.transition(MutationStatus::RolledBack).unwrap_err();
    assert!(matches!(err, Error::InvalidMutationTransition { .. }));
}

#[test]
fn cancelled_mutation_is_frozen() {
    let mut mutation = PendingMutation::new("req-1", MutationKind::Accept, 1000, 6000);
    mutation.transition(MutationStatus::Cancelled).unwrap();
    assert!(mutation.status.is_terminal());
    assert!(mutation.transition(MutationStatus::Committing).is_err());
}

#[test]
fn view_participation_by_status() {
    let mut mutation = PendingMutation::new("req-1", MutationKind::Veto, 1000, 6000);
    assert!(mutation.affects_view());

    mutation.transition(MutationStatus::Committing).unwrap();
    assert!(mutation.affects_view());

    // A committed veto keeps the row hidden until a snapshot confirms it.
    mutation.transition(MutationStatus::Committed).unwrap();
    assert!(mutation.affects_view());

    let mut rolled = PendingMutation::new("req-2", MutationKind::Accept, 1000, 6000);
    rolled.transition(MutationStatus::Committing).unwrap();
    rolled.transition(MutationStatus::RolledBack).unwrap();
    assert!(!rolled.affects_view());
}

#[parameterized(
    accept = { "accept", MutationKind::Accept },
    veto = { "veto", MutationKind::Veto },
    accept_upper = { "ACCEPT", MutationKind::Accept },
)]
fn kind_from_str_valid(input: &str, expected: MutationKind) {
    assert_eq!(input.parse::<MutationKind>().unwrap(), expected);
}

#[test]
fn kind_from_str_invalid() {
    assert!("reject".parse::<MutationKind>().is_err());
}
