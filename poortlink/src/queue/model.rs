//! Queue entry and snapshot types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::{validate_transition, EntryStatus, QueueAction};
use crate::error::QueueError;
use crate::geo::GeoPoint;
use crate::zone::ZoneId;

/// Unique queue entry identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(u64);

impl EntryId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authenticated driver identity, as supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriverId(String);

impl DriverId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DriverId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Reference to a vehicle or fleet record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleRef(String);

impl VehicleRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VehicleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One driver's claim on a place in a zone's queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: EntryId,
    pub zone_id: ZoneId,
    pub driver_id: DriverId,
    pub vehicle: Option<VehicleRef>,
    /// Order of service; unique among active entries of a zone.
    pub position: u64,
    pub status: EntryStatus,
    pub joined_at: DateTime<Utc>,
    pub loading_started_at: Option<DateTime<Utc>>,
    pub departed_at: Option<DateTime<Utc>>,
    pub last_location: Option<GeoPoint>,
    pub last_location_update: Option<DateTime<Utc>>,
    /// Whether `last_location` was inside the zone at `last_location_update`.
    pub is_gps_verified: bool,
    pub distance_from_zone: Option<f64>,
    pub skip_count: u32,
    pub notes: Option<String>,
}

impl QueueEntry {
    /// Validate `action` against this entry's status.
    ///
    /// Returns the status the entry moves to, or
    /// [`QueueError::InvalidTransition`].
    pub fn check(&self, action: QueueAction) -> Result<EntryStatus, QueueError> {
        validate_transition(self.status, action).ok_or(QueueError::InvalidTransition {
            entry_id: self.id,
            from: self.status,
            action,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Time spent in the queue so far (or until departure).
    pub fn wait_duration(&self, now: DateTime<Utc>) -> chrono::Duration {
        let end = self.loading_started_at.or(self.departed_at).unwrap_or(now);
        end - self.joined_at
    }
}

/// Full state of one zone's queue at a point in time.
///
/// Snapshots, not deltas, are what subscribers receive; `revision` grows with
/// every mutation of the zone so a consumer can discard stale deliveries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub zone_id: ZoneId,
    pub revision: u64,
    pub taken_at: DateTime<Utc>,
    /// Waiting and loading entries, ordered by position.
    pub entries: Vec<QueueEntry>,
}

impl QueueSnapshot {
    /// Snapshot of a zone that has never been touched.
    pub fn empty(zone_id: ZoneId) -> Self {
        Self {
            zone_id,
            revision: 0,
            taken_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    /// The entry with the smallest position, if any.
    pub fn front(&self) -> Option<&QueueEntry> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn waiting_count(&self) -> usize {
        self.count(EntryStatus::Waiting)
    }

    pub fn loading_count(&self) -> usize {
        self.count(EntryStatus::Loading)
    }

    /// Active entries whose last known location was inside the zone.
    pub fn verified_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_gps_verified).count()
    }

    /// The driver's 1-based place among waiting entries ("you are #3").
    pub fn rank_of(&self, driver_id: &DriverId) -> Option<usize> {
        self.entries
            .iter()
            .filter(|e| e.status == EntryStatus::Waiting)
            .position(|e| &e.driver_id == driver_id)
            .map(|i| i + 1)
    }

    /// The active entry held by `driver_id`, if any.
    pub fn entry_for(&self, driver_id: &DriverId) -> Option<&QueueEntry> {
        self.entries.iter().find(|e| &e.driver_id == driver_id)
    }

    fn count(&self, status: EntryStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }
}

/// Parameters for joining a queue.
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub zone_id: ZoneId,
    pub driver_id: DriverId,
    pub location: GeoPoint,
    pub vehicle: Option<VehicleRef>,
}

impl JoinRequest {
    pub fn new(zone_id: ZoneId, driver_id: DriverId, location: GeoPoint) -> Self {
        Self {
            zone_id,
            driver_id,
            location,
            vehicle: None,
        }
    }

    pub fn with_vehicle(mut self, vehicle: VehicleRef) -> Self {
        self.vehicle = Some(vehicle);
        self
    }
}

/// Result of writing a location sample to an entry.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationUpdate {
    /// The sample was written.
    Applied {
        entry: QueueEntry,
        /// Verification state before this sample.
        was_verified: bool,
    },
    /// The entry is no longer active; nothing was written.
    Ignored { entry_id: EntryId, status: EntryStatus },
}

impl LocationUpdate {
    /// Verified before, unverified now: the driver left the geofence.
    pub fn exited_boundary(&self) -> bool {
        matches!(self, LocationUpdate::Applied { entry, was_verified: true } if !entry.is_gps_verified)
    }

    /// Unverified before, verified now: the driver came back.
    pub fn entered_boundary(&self) -> bool {
        matches!(self, LocationUpdate::Applied { entry, was_verified: false } if entry.is_gps_verified)
    }

    pub fn entry(&self) -> Option<&QueueEntry> {
        match self {
            LocationUpdate::Applied { entry, .. } => Some(entry),
            LocationUpdate::Ignored { .. } => None,
        }
    }
}
