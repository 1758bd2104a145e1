//! In-process queue store.
//!
//! Each zone's queue sits behind its own `parking_lot::Mutex`. A mutation
//! takes the lock once, validates, assigns and writes, then releases it, so
//! position assignment is atomic per zone while different zones never
//! contend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::model::{DriverId, EntryId, JoinRequest, LocationUpdate, QueueEntry, QueueSnapshot};
use super::state::{EntryStatus, QueueAction};
use super::store::QueueStore;
use crate::error::{QueueError, QueueResult};
use crate::geo::GeoPoint;
use crate::zone::{LoadingZone, ZoneDirectory, ZoneId};
use crate::BoxFuture;

/// One zone's queue state.
#[derive(Debug, Default)]
struct ZoneQueue {
    /// Waiting and loading entries, ordered by position.
    active: Vec<QueueEntry>,
    /// Departed and removed entries, oldest first.
    terminal: Vec<QueueEntry>,
    /// Highest position ever assigned in this zone. Never decreases.
    last_position: u64,
    /// Bumped on every mutation.
    revision: u64,
}

impl ZoneQueue {
    /// Reserve the next tail position.
    fn next_position(&mut self) -> u64 {
        self.last_position += 1;
        self.last_position
    }

    fn index_of(&self, entry_id: EntryId) -> Option<usize> {
        self.active.iter().position(|e| e.id == entry_id)
    }

    fn active_for_driver(&self, driver_id: &DriverId) -> Option<&QueueEntry> {
        self.active.iter().find(|e| &e.driver_id == driver_id)
    }

    /// Smallest position among waiting entries.
    fn front_waiting_position(&self) -> Option<u64> {
        self.active
            .iter()
            .filter(|e| e.status == EntryStatus::Waiting)
            .map(|e| e.position)
            .min()
    }

    fn find(&self, entry_id: EntryId) -> Option<&QueueEntry> {
        self.active
            .iter()
            .chain(self.terminal.iter())
            .find(|e| e.id == entry_id)
    }

    /// Move the active entry at `index` into the terminal list.
    fn retire(&mut self, index: usize) -> QueueEntry {
        let entry = self.active.remove(index);
        self.terminal.push(entry.clone());
        entry
    }

    fn snapshot(&self, zone_id: ZoneId) -> QueueSnapshot {
        QueueSnapshot {
            zone_id,
            revision: self.revision,
            taken_at: Utc::now(),
            entries: self.active.clone(),
        }
    }
}

/// Queue store held entirely in memory.
///
/// Suitable for a single process that owns the queue (a rank's marshal
/// console, simulations, tests). Entries are kept for the lifetime of the
/// store; nothing is hard-deleted.
pub struct InMemoryQueueStore {
    directory: Arc<ZoneDirectory>,
    zones: DashMap<ZoneId, Arc<Mutex<ZoneQueue>>>,
    /// Which zone each entry lives in.
    entry_zones: DashMap<EntryId, ZoneId>,
    next_entry_id: AtomicU64,
}

impl std::fmt::Debug for InMemoryQueueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryQueueStore")
            .field("zones", &self.zones.len())
            .field("entries", &self.entry_zones.len())
            .finish_non_exhaustive()
    }
}

impl InMemoryQueueStore {
    /// Create an empty store that resolves zones through `directory`.
    pub fn new(directory: Arc<ZoneDirectory>) -> Self {
        Self {
            directory,
            zones: DashMap::new(),
            entry_zones: DashMap::new(),
            next_entry_id: AtomicU64::new(1),
        }
    }

    /// Get (or lazily create) a zone's queue.
    ///
    /// The `Arc` is cloned out so the DashMap shard lock is released before
    /// the zone mutex is taken.
    fn zone_queue(&self, zone_id: &ZoneId) -> Arc<Mutex<ZoneQueue>> {
        if let Some(queue) = self.zones.get(zone_id) {
            return Arc::clone(queue.value());
        }
        Arc::clone(self.zones.entry(zone_id.clone()).or_default().value())
    }

    fn zone_of(&self, entry_id: EntryId) -> QueueResult<ZoneId> {
        self.entry_zones
            .get(&entry_id)
            .map(|z| z.value().clone())
            .ok_or(QueueError::EntryNotFound { entry_id })
    }

    fn join_now(&self, request: JoinRequest) -> QueueResult<QueueEntry> {
        let zone = self.directory.require_active(&request.zone_id)?;
        let queue = self.zone_queue(&zone.id);
        let mut queue = queue.lock();

        if let Some(existing) = queue.active_for_driver(&request.driver_id) {
            return Err(QueueError::DuplicateEntry {
                zone_id: zone.id.clone(),
                driver_id: request.driver_id,
                existing: existing.id,
            });
        }

        let distance = zone.distance_to(&request.location);
        if !zone.contains(&request.location) {
            debug!(
                zone_id = %zone.id,
                driver_id = %request.driver_id,
                distance_m = format!("{:.1}", distance),
                radius_m = zone.radius_meters,
                "Join rejected: outside geofence"
            );
            return Err(QueueError::OutOfRange {
                zone_id: zone.id.clone(),
                distance_meters: distance,
                required_radius_meters: zone.radius_meters,
            });
        }

        let entry = self.new_entry(&zone, &mut *queue, request, distance);
        self.entry_zones.insert(entry.id, zone.id.clone());
        queue.active.push(entry.clone());
        queue.revision += 1;

        info!(
            zone_id = %zone.id,
            driver_id = %entry.driver_id,
            entry_id = %entry.id,
            position = entry.position,
            "Driver joined queue"
        );
        Ok(entry)
    }

    fn new_entry(
        &self,
        zone: &LoadingZone,
        queue: &mut ZoneQueue,
        request: JoinRequest,
        distance: f64,
    ) -> QueueEntry {
        let now = Utc::now();
        QueueEntry {
            id: EntryId::new(self.next_entry_id.fetch_add(1, Ordering::Relaxed)),
            zone_id: zone.id.clone(),
            driver_id: request.driver_id,
            vehicle: request.vehicle,
            position: queue.next_position(),
            status: EntryStatus::Waiting,
            joined_at: now,
            loading_started_at: None,
            departed_at: None,
            last_location: Some(request.location),
            last_location_update: Some(now),
            is_gps_verified: true,
            distance_from_zone: Some(distance),
            skip_count: 0,
            notes: None,
        }
    }

    fn update_location_now(
        &self,
        entry_id: EntryId,
        location: GeoPoint,
    ) -> QueueResult<LocationUpdate> {
        let zone_id = self.zone_of(entry_id)?;
        let queue = self.zone_queue(&zone_id);
        let mut queue = queue.lock();

        let Some(index) = queue.index_of(entry_id) else {
            // Known entry but no longer active: a late sample after departure
            let status = queue
                .find(entry_id)
                .map(|e| e.status)
                .ok_or(QueueError::EntryNotFound { entry_id })?;
            debug!(entry_id = %entry_id, %status, "Ignoring location for inactive entry");
            return Ok(LocationUpdate::Ignored { entry_id, status });
        };

        let zone = self
            .directory
            .get(&zone_id)
            .ok_or(QueueError::ZoneNotFound {
                zone_id: zone_id.clone(),
            })?;

        let entry = &mut queue.active[index];
        entry.check(QueueAction::UpdateLocation)?;

        let was_verified = entry.is_gps_verified;
        let distance = zone.distance_to(&location);
        entry.last_location = Some(location);
        entry.last_location_update = Some(Utc::now());
        entry.distance_from_zone = Some(distance);
        entry.is_gps_verified = zone.contains(&location);

        let entry = entry.clone();
        queue.revision += 1;

        Ok(LocationUpdate::Applied {
            entry,
            was_verified,
        })
    }

    fn start_loading_now(&self, entry_id: EntryId) -> QueueResult<QueueEntry> {
        self.with_active_entry(entry_id, QueueAction::StartLoading, |queue, index| {
            let position = queue.active[index].position;
            let front_position = queue.front_waiting_position().unwrap_or(position);
            if position != front_position {
                return Err(QueueError::NotFrontOfQueue {
                    entry_id,
                    position,
                    front_position,
                });
            }

            let entry = &mut queue.active[index];
            entry.status = EntryStatus::Loading;
            entry.loading_started_at = Some(Utc::now());
            Ok(entry.clone())
        })
    }

    fn mark_departed_now(&self, entry_id: EntryId) -> QueueResult<QueueEntry> {
        self.with_active_entry(entry_id, QueueAction::MarkDeparted, |queue, index| {
            let entry = &mut queue.active[index];
            entry.status = EntryStatus::Departed;
            entry.departed_at = Some(Utc::now());
            Ok(queue.retire(index))
        })
    }

    fn skip_now(&self, entry_id: EntryId, reason: Option<String>) -> QueueResult<QueueEntry> {
        self.with_active_entry(entry_id, QueueAction::Skip, |queue, index| {
            let position = queue.next_position();
            let mut entry = queue.active.remove(index);
            entry.position = position;
            entry.skip_count += 1;
            if reason.is_some() {
                entry.notes = reason;
            }
            // New tail position is the maximum, so pushing keeps the order
            queue.active.push(entry.clone());
            Ok(entry)
        })
    }

    fn remove_now(&self, entry_id: EntryId, reason: Option<String>) -> QueueResult<QueueEntry> {
        self.with_active_entry(entry_id, QueueAction::Remove, |queue, index| {
            let entry = &mut queue.active[index];
            entry.status = EntryStatus::Removed;
            if reason.is_some() {
                entry.notes = reason;
            }
            Ok(queue.retire(index))
        })
    }

    fn leave_now(&self, entry_id: EntryId) -> QueueResult<QueueEntry> {
        self.with_active_entry(entry_id, QueueAction::Leave, |queue, index| {
            let entry = &mut queue.active[index];
            entry.status = EntryStatus::Departed;
            entry.departed_at = Some(Utc::now());
            Ok(queue.retire(index))
        })
    }

    /// Run a status-changing mutation on an entry under its zone lock.
    ///
    /// Validates `action` against the entry's current status first; the
    /// revision is bumped only when `apply` succeeds.
    fn with_active_entry<F>(
        &self,
        entry_id: EntryId,
        action: QueueAction,
        apply: F,
    ) -> QueueResult<QueueEntry>
    where
        F: FnOnce(&mut ZoneQueue, usize) -> QueueResult<QueueEntry>,
    {
        let zone_id = self.zone_of(entry_id)?;
        let queue = self.zone_queue(&zone_id);
        let mut queue = queue.lock();

        let index = match queue.index_of(entry_id) {
            Some(index) => index,
            None => {
                let status = queue
                    .find(entry_id)
                    .map(|e| e.status)
                    .ok_or(QueueError::EntryNotFound { entry_id })?;
                return Err(QueueError::InvalidTransition {
                    entry_id,
                    from: status,
                    action,
                });
            }
        };

        queue.active[index].check(action)?;
        let entry = apply(&mut *queue, index)?;
        queue.revision += 1;

        info!(
            zone_id = %zone_id,
            entry_id = %entry_id,
            driver_id = %entry.driver_id,
            action = %action,
            status = %entry.status,
            position = entry.position,
            "Queue entry updated"
        );
        Ok(entry)
    }

    fn require_zone(&self, zone_id: &ZoneId) -> QueueResult<()> {
        if self.directory.get(zone_id).is_some() {
            Ok(())
        } else {
            Err(QueueError::ZoneNotFound {
                zone_id: zone_id.clone(),
            })
        }
    }
}

impl QueueStore for InMemoryQueueStore {
    fn join(&self, request: JoinRequest) -> BoxFuture<'_, QueueResult<QueueEntry>> {
        Box::pin(async move { self.join_now(request) })
    }

    fn update_location(
        &self,
        entry_id: EntryId,
        location: GeoPoint,
    ) -> BoxFuture<'_, QueueResult<LocationUpdate>> {
        Box::pin(async move { self.update_location_now(entry_id, location) })
    }

    fn start_loading(&self, entry_id: EntryId) -> BoxFuture<'_, QueueResult<QueueEntry>> {
        Box::pin(async move { self.start_loading_now(entry_id) })
    }

    fn mark_departed(&self, entry_id: EntryId) -> BoxFuture<'_, QueueResult<QueueEntry>> {
        Box::pin(async move { self.mark_departed_now(entry_id) })
    }

    fn skip(
        &self,
        entry_id: EntryId,
        reason: Option<String>,
    ) -> BoxFuture<'_, QueueResult<QueueEntry>> {
        Box::pin(async move { self.skip_now(entry_id, reason) })
    }

    fn remove(
        &self,
        entry_id: EntryId,
        reason: Option<String>,
    ) -> BoxFuture<'_, QueueResult<QueueEntry>> {
        Box::pin(async move { self.remove_now(entry_id, reason) })
    }

    fn leave(&self, entry_id: EntryId) -> BoxFuture<'_, QueueResult<QueueEntry>> {
        Box::pin(async move { self.leave_now(entry_id) })
    }

    fn entry(&self, entry_id: EntryId) -> BoxFuture<'_, QueueResult<QueueEntry>> {
        Box::pin(async move {
            let zone_id = self.zone_of(entry_id)?;
            let queue = self.zone_queue(&zone_id);
            let queue = queue.lock();
            queue
                .find(entry_id)
                .cloned()
                .ok_or(QueueError::EntryNotFound { entry_id })
        })
    }

    fn active_entries_for_driver(
        &self,
        driver_id: DriverId,
    ) -> BoxFuture<'_, QueueResult<Vec<QueueEntry>>> {
        Box::pin(async move {
            let queues: Vec<_> = self.zones.iter().map(|q| Arc::clone(q.value())).collect();
            let entries = queues
                .iter()
                .filter_map(|queue| queue.lock().active_for_driver(&driver_id).cloned())
                .collect();
            Ok(entries)
        })
    }

    fn snapshot(&self, zone_id: ZoneId) -> BoxFuture<'_, QueueResult<QueueSnapshot>> {
        Box::pin(async move {
            self.require_zone(&zone_id)?;
            let queue = self.zone_queue(&zone_id);
            let snapshot = queue.lock().snapshot(zone_id);
            Ok(snapshot)
        })
    }

    fn history(&self, zone_id: ZoneId) -> BoxFuture<'_, QueueResult<Vec<QueueEntry>>> {
        Box::pin(async move {
            self.require_zone(&zone_id)?;
            let queue = self.zone_queue(&zone_id);
            let history = queue.lock().terminal.iter().rev().cloned().collect();
            Ok(history)
        })
    }
}
