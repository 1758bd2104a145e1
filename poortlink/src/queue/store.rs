//! The queue store interface.
//!
//! [`QueueStore`] is the only component that mutates queue entries. It is
//! modelled on a remote persistent store: every call is asynchronous and may
//! fail with [`QueueError::StoreUnavailable`](crate::error::QueueError::StoreUnavailable).
//!
//! # Atomicity
//!
//! Position assignment (`join`, `skip`) must be a single atomic
//! read-max/increment/write against the zone. A client-side "read the
//! queue length, then insert" is a race that hands out duplicate positions
//! under concurrent joins. Implementations backed by a database must use a
//! server-side sequence or a serializable transaction; the in-memory store
//! uses one lock per zone.
//!
//! # Dyn Compatibility
//!
//! Methods return [`BoxFuture`] so the store can be shared as
//! `Arc<dyn QueueStore>`.

use crate::error::QueueResult;
use crate::geo::GeoPoint;
use crate::zone::ZoneId;
use crate::BoxFuture;

use super::model::{DriverId, EntryId, JoinRequest, LocationUpdate, QueueEntry, QueueSnapshot};

/// Persistent storage for queue entries.
pub trait QueueStore: Send + Sync {
    /// Create a waiting entry at the tail of the zone's queue.
    ///
    /// # Errors
    ///
    /// - `ZoneNotFound` if the zone is unknown or inactive
    /// - `DuplicateEntry` if the driver already waits or loads in this zone
    /// - `OutOfRange` if the location is outside the geofence; no entry is created
    fn join(&self, request: JoinRequest) -> BoxFuture<'_, QueueResult<QueueEntry>>;

    /// Write a location sample to an entry and recompute GPS verification.
    ///
    /// Samples for departed or removed entries are ignored, never written.
    /// Leaving the geofence does not remove the driver.
    fn update_location(
        &self,
        entry_id: EntryId,
        location: GeoPoint,
    ) -> BoxFuture<'_, QueueResult<LocationUpdate>>;

    /// Move the front waiting entry to `loading`.
    ///
    /// Fails with `NotFrontOfQueue` unless the entry has the smallest position
    /// among waiting entries of its zone; nothing is mutated on failure.
    fn start_loading(&self, entry_id: EntryId) -> BoxFuture<'_, QueueResult<QueueEntry>>;

    /// Move a loading entry to `departed`.
    fn mark_departed(&self, entry_id: EntryId) -> BoxFuture<'_, QueueResult<QueueEntry>>;

    /// Move a waiting entry to the tail and count the skip.
    fn skip(
        &self,
        entry_id: EntryId,
        reason: Option<String>,
    ) -> BoxFuture<'_, QueueResult<QueueEntry>>;

    /// Remove a waiting or loading entry (marshal decision, terminal).
    fn remove(
        &self,
        entry_id: EntryId,
        reason: Option<String>,
    ) -> BoxFuture<'_, QueueResult<QueueEntry>>;

    /// Driver-initiated departure from a waiting or loading entry.
    fn leave(&self, entry_id: EntryId) -> BoxFuture<'_, QueueResult<QueueEntry>>;

    /// Fetch a single entry in any status.
    fn entry(&self, entry_id: EntryId) -> BoxFuture<'_, QueueResult<QueueEntry>>;

    /// Active entries held by a driver, across all zones.
    fn active_entries_for_driver(
        &self,
        driver_id: DriverId,
    ) -> BoxFuture<'_, QueueResult<Vec<QueueEntry>>>;

    /// Current active queue of a zone.
    fn snapshot(&self, zone_id: ZoneId) -> BoxFuture<'_, QueueResult<QueueSnapshot>>;

    /// Departed and removed entries of a zone, newest first.
    fn history(&self, zone_id: ZoneId) -> BoxFuture<'_, QueueResult<Vec<QueueEntry>>>;
}
