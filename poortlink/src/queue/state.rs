//! Queue entry state machine.
//!
//! All status legality lives here. Store implementations call
//! [`validate_transition`] before every mutation instead of re-deriving
//! the rules at each call site.
//!
//! ```text
//!          join (geofence pass)
//!   (none) ────────────────────► Waiting
//!   Waiting ── start_loading (front only) ──► Loading
//!   Waiting ── skip ──► Waiting (moved to the tail)
//!   Waiting ── remove ──► Removed
//!   Loading ── remove ──► Removed
//!   Loading ── mark_departed ──► Departed
//!   Waiting/Loading ── leave ──► Departed
//! ```
//!
//! `Departed` and `Removed` are terminal.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Waiting,
    Loading,
    Departed,
    Removed,
}

impl EntryStatus {
    /// Waiting or loading - the entry holds a place in the queue.
    pub fn is_active(&self) -> bool {
        matches!(self, EntryStatus::Waiting | EntryStatus::Loading)
    }

    /// Departed or removed - no further transitions.
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Waiting => "waiting",
            EntryStatus::Loading => "loading",
            EntryStatus::Departed => "departed",
            EntryStatus::Removed => "removed",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations that act on a queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueAction {
    Join,
    StartLoading,
    MarkDeparted,
    Skip,
    Remove,
    Leave,
    UpdateLocation,
}

impl QueueAction {
    /// Whether the action assigns a new queue position.
    pub fn assigns_position(&self) -> bool {
        matches!(self, QueueAction::Join | QueueAction::Skip)
    }

    /// Whether only a marshal (or admin) may perform the action.
    pub fn is_marshal_action(&self) -> bool {
        matches!(
            self,
            QueueAction::StartLoading
                | QueueAction::MarkDeparted
                | QueueAction::Skip
                | QueueAction::Remove
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueAction::Join => "join",
            QueueAction::StartLoading => "start loading",
            QueueAction::MarkDeparted => "mark departed",
            QueueAction::Skip => "skip",
            QueueAction::Remove => "remove",
            QueueAction::Leave => "leave",
            QueueAction::UpdateLocation => "update location of",
        }
    }
}

impl fmt::Display for QueueAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check whether `action` is legal from `from` and return the resulting status.
///
/// `Join` creates entries rather than transitioning one, so it is never legal
/// here. `UpdateLocation` leaves the status unchanged on active entries.
/// Front-of-queue eligibility for `StartLoading` depends on the rest of the
/// zone and is checked by the store.
pub fn validate_transition(from: EntryStatus, action: QueueAction) -> Option<EntryStatus> {
    use EntryStatus::*;
    use QueueAction::*;

    match (from, action) {
        (Waiting, StartLoading) => Some(Loading),
        (Waiting, Skip) => Some(Waiting),
        (Waiting | Loading, Remove) => Some(Removed),
        (Loading, MarkDeparted) => Some(Departed),
        (Waiting | Loading, Leave) => Some(Departed),
        (Waiting | Loading, UpdateLocation) => Some(from),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [EntryStatus; 4] = [
        EntryStatus::Waiting,
        EntryStatus::Loading,
        EntryStatus::Departed,
        EntryStatus::Removed,
    ];

    #[test]
    fn test_happy_path() {
        let loading = validate_transition(EntryStatus::Waiting, QueueAction::StartLoading);
        assert_eq!(loading, Some(EntryStatus::Loading));

        let departed = validate_transition(EntryStatus::Loading, QueueAction::MarkDeparted);
        assert_eq!(departed, Some(EntryStatus::Departed));
    }

    #[test]
    fn test_skip_keeps_waiting() {
        assert_eq!(
            validate_transition(EntryStatus::Waiting, QueueAction::Skip),
            Some(EntryStatus::Waiting)
        );
        assert_eq!(
            validate_transition(EntryStatus::Loading, QueueAction::Skip),
            None
        );
    }

    #[test]
    fn test_mark_departed_requires_loading() {
        assert_eq!(
            validate_transition(EntryStatus::Waiting, QueueAction::MarkDeparted),
            None
        );
    }

    #[test]
    fn test_terminal_statuses_reject_everything() {
        for status in [EntryStatus::Departed, EntryStatus::Removed] {
            for action in [
                QueueAction::Join,
                QueueAction::StartLoading,
                QueueAction::MarkDeparted,
                QueueAction::Skip,
                QueueAction::Remove,
                QueueAction::Leave,
                QueueAction::UpdateLocation,
            ] {
                assert_eq!(
                    validate_transition(status, action),
                    None,
                    "{} should reject {}",
                    status,
                    action
                );
            }
        }
    }

    #[test]
    fn test_join_is_never_a_transition() {
        for status in ALL_STATUSES {
            assert_eq!(validate_transition(status, QueueAction::Join), None);
        }
    }

    #[test]
    fn test_no_transition_back_to_waiting_from_terminal_or_loading() {
        for status in ALL_STATUSES {
            for action in [
                QueueAction::StartLoading,
                QueueAction::MarkDeparted,
                QueueAction::Skip,
                QueueAction::Remove,
                QueueAction::Leave,
            ] {
                if validate_transition(status, action) == Some(EntryStatus::Waiting) {
                    assert_eq!(status, EntryStatus::Waiting);
                }
            }
        }
    }

    #[test]
    fn test_action_flags() {
        assert!(QueueAction::Join.assigns_position());
        assert!(QueueAction::Skip.assigns_position());
        assert!(!QueueAction::Leave.assigns_position());
        assert!(QueueAction::Remove.is_marshal_action());
        assert!(!QueueAction::Leave.is_marshal_action());
    }
}
