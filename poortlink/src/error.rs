//! Queue error taxonomy.
//!
//! Every error carries enough structured detail for a UI to render a
//! specific message ("come 42 m closer", "you are already in the queue").

use thiserror::Error;

use crate::geo::{meters_to_go, GeoError};
use crate::queue::{DriverId, EntryId, EntryStatus, QueueAction};
use crate::tracker::LocationError;
use crate::zone::ZoneId;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors returned by queue operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueueError {
    /// Zone does not exist or is inactive.
    #[error("Zone not found or inactive: {zone_id}")]
    ZoneNotFound { zone_id: ZoneId },

    /// Join attempted outside the zone's geofence.
    #[error(
        "Outside zone {zone_id}: {distance_meters:.0} m from center, must be within {required_radius_meters:.0} m"
    )]
    OutOfRange {
        zone_id: ZoneId,
        distance_meters: f64,
        required_radius_meters: f64,
    },

    /// Driver already holds a waiting or loading entry in this zone.
    #[error("Driver {driver_id} is already queued in zone {zone_id} (entry {existing})")]
    DuplicateEntry {
        zone_id: ZoneId,
        driver_id: DriverId,
        existing: EntryId,
    },

    /// Loading requested for an entry that is not at the front.
    #[error("Entry {entry_id} at position {position} is not at the front (front is {front_position})")]
    NotFrontOfQueue {
        entry_id: EntryId,
        position: u64,
        front_position: u64,
    },

    /// The entry's current status does not allow the operation.
    #[error("Cannot {action} entry {entry_id} while it is {from}")]
    InvalidTransition {
        entry_id: EntryId,
        from: EntryStatus,
        action: QueueAction,
    },

    /// No entry with this id.
    #[error("Queue entry not found: {entry_id}")]
    EntryNotFound { entry_id: EntryId },

    /// Actor lacks authority for the operation.
    #[error("{actor} is not allowed to {action} in zone {zone_id}")]
    Unauthorized {
        actor: String,
        action: QueueAction,
        zone_id: ZoneId,
    },

    /// Malformed coordinate or radius.
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(#[from] GeoError),

    /// Device location could not be obtained, e.g. a watch refused by
    /// [`LocationTracker::try_start`](crate::tracker::LocationTracker::try_start).
    #[error("Location unavailable: {0}")]
    LocationUnavailable(#[from] LocationError),

    /// Transient persistence failure.
    #[error("Queue store unavailable: {0}")]
    StoreUnavailable(String),
}

impl QueueError {
    /// Whether the same call may simply be retried.
    ///
    /// Only transient conditions qualify. Mutations that failed with
    /// [`QueueError::StoreUnavailable`] still need their preconditions
    /// re-checked first, see [`requires_revalidation`](Self::requires_revalidation).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            QueueError::StoreUnavailable(_) | QueueError::LocationUnavailable(_)
        )
    }

    /// Whether a retry of `action` must first re-validate geofence and status.
    ///
    /// Position-assigning operations (join, skip) must never be blindly
    /// replayed: the driver may have moved and the queue may have changed.
    pub fn requires_revalidation(&self, action: QueueAction) -> bool {
        self.is_retryable() && action.assigns_position()
    }

    /// For [`QueueError::OutOfRange`], how many meters the driver still has to cover.
    pub fn meters_to_go(&self) -> Option<f64> {
        match self {
            QueueError::OutOfRange {
                distance_meters,
                required_radius_meters,
                ..
            } => Some(meters_to_go(*distance_meters, *required_radius_meters)),
            _ => None,
        }
    }
}
