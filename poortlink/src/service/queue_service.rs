//! QueueService implementation.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::config::ServiceConfig;
use crate::error::{QueueError, QueueResult};
use crate::events::{QueueEventChannel, ZoneSubscription};
use crate::geo::GeoPoint;
use crate::marshal::Actor;
use crate::queue::{
    DriverId, EntryId, InMemoryQueueStore, JoinRequest, LocationUpdate, QueueAction, QueueEntry,
    QueueSnapshot, QueueStore, VehicleRef,
};
use crate::zone::{NearbyZone, ZoneDirectory, ZoneId};

/// Queue operations with snapshot publishing.
///
/// Cheap to share behind an `Arc`; all state lives in the store, the
/// directory and the event channel.
pub struct QueueService {
    directory: Arc<ZoneDirectory>,
    store: Arc<dyn QueueStore>,
    events: QueueEventChannel,
    config: ServiceConfig,
}

impl std::fmt::Debug for QueueService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueService")
            .field("directory", &self.directory)
            .field("events", &self.events)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl QueueService {
    pub fn new(
        directory: Arc<ZoneDirectory>,
        store: Arc<dyn QueueStore>,
        config: ServiceConfig,
    ) -> Self {
        let events = QueueEventChannel::new(config.channel_capacity);
        Self {
            directory,
            store,
            events,
            config,
        }
    }

    /// Service backed by an [`InMemoryQueueStore`] over `directory`.
    pub fn in_memory(directory: Arc<ZoneDirectory>, config: ServiceConfig) -> Self {
        let store = Arc::new(InMemoryQueueStore::new(Arc::clone(&directory)));
        Self::new(directory, store, config)
    }

    pub fn directory(&self) -> &ZoneDirectory {
        &self.directory
    }

    pub fn events(&self) -> &QueueEventChannel {
        &self.events
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Join a zone's queue as `actor`.
    ///
    /// Only drivers can join, and only as themselves. The geofence check is
    /// done by the store against `location`; an out-of-range join creates
    /// nothing and reports how far away the driver is.
    pub async fn join_queue(
        &self,
        actor: &Actor,
        zone_id: &ZoneId,
        location: GeoPoint,
        vehicle: Option<VehicleRef>,
    ) -> QueueResult<QueueEntry> {
        if !actor.can_queue() {
            return Err(unauthorized(actor, QueueAction::Join, zone_id));
        }

        let mut request = JoinRequest::new(zone_id.clone(), actor.driver_id(), location);
        if let Some(vehicle) = vehicle {
            request = request.with_vehicle(vehicle);
        }

        let entry = self.store.join(request).await?;
        self.publish(&entry.zone_id).await;
        Ok(entry)
    }

    /// Leave a queue.
    ///
    /// The entry's driver may leave; a marshal of the zone may do it for them.
    pub async fn leave_queue(&self, actor: &Actor, entry_id: EntryId) -> QueueResult<QueueEntry> {
        let entry = self.store.entry(entry_id).await?;
        if !actor.owns_or_marshals(&entry.driver_id, &entry.zone_id) {
            return Err(unauthorized(actor, QueueAction::Leave, &entry.zone_id));
        }

        let entry = self.store.leave(entry_id).await?;
        info!(
            zone_id = %entry.zone_id,
            driver_id = %entry.driver_id,
            entry_id = %entry.id,
            actor = %actor,
            "Driver left queue"
        );
        self.publish(&entry.zone_id).await;
        Ok(entry)
    }

    /// Record a location sample on an entry.
    ///
    /// Samples for entries that are no longer active come back as
    /// [`LocationUpdate::Ignored`] and publish nothing.
    pub async fn update_location(
        &self,
        entry_id: EntryId,
        location: GeoPoint,
    ) -> QueueResult<LocationUpdate> {
        let update = self.store.update_location(entry_id, location).await?;
        if let LocationUpdate::Applied { entry, .. } = &update {
            self.publish(&entry.zone_id).await;
        }
        Ok(update)
    }

    /// Fresh snapshot of a zone plus a subscription to its later changes.
    ///
    /// The subscription is opened before the snapshot is read and seeded with
    /// its revision, so no change falls between the two and no older push
    /// replaces the snapshot.
    pub async fn subscribe(
        &self,
        zone_id: &ZoneId,
    ) -> QueueResult<(QueueSnapshot, ZoneSubscription)> {
        let mut subscription = self.events.subscribe(zone_id);
        let snapshot = self.store.snapshot(zone_id.clone()).await?;
        subscription.seed_revision(snapshot.revision);
        Ok((snapshot, subscription))
    }

    pub async fn snapshot(&self, zone_id: &ZoneId) -> QueueResult<QueueSnapshot> {
        self.store.snapshot(zone_id.clone()).await
    }

    /// Departed and removed entries of a zone, newest first.
    pub async fn history(&self, zone_id: &ZoneId) -> QueueResult<Vec<QueueEntry>> {
        self.store.history(zone_id.clone()).await
    }

    pub async fn entry(&self, entry_id: EntryId) -> QueueResult<QueueEntry> {
        self.store.entry(entry_id).await
    }

    pub async fn active_entries_for_driver(
        &self,
        driver_id: &DriverId,
    ) -> QueueResult<Vec<QueueEntry>> {
        self.store.active_entries_for_driver(driver_id.clone()).await
    }

    /// Active zones within the discovery radius, nearest first.
    pub fn nearby_zones(&self, point: &GeoPoint) -> Vec<NearbyZone> {
        self.directory.nearby(point, self.config.discovery_radius_meters)
    }

    /// Active zones within `radius_meters`, nearest first.
    pub fn nearby_zones_within(&self, point: &GeoPoint, radius_meters: f64) -> Vec<NearbyZone> {
        self.directory.nearby(point, radius_meters)
    }

    pub(crate) async fn start_loading(&self, entry_id: EntryId) -> QueueResult<QueueEntry> {
        let result = self.store.start_loading(entry_id).await;
        self.published(result).await
    }

    pub(crate) async fn mark_departed(&self, entry_id: EntryId) -> QueueResult<QueueEntry> {
        let result = self.store.mark_departed(entry_id).await;
        self.published(result).await
    }

    pub(crate) async fn skip(
        &self,
        entry_id: EntryId,
        reason: Option<String>,
    ) -> QueueResult<QueueEntry> {
        let result = self.store.skip(entry_id, reason).await;
        self.published(result).await
    }

    pub(crate) async fn remove(
        &self,
        entry_id: EntryId,
        reason: Option<String>,
    ) -> QueueResult<QueueEntry> {
        let result = self.store.remove(entry_id, reason).await;
        self.published(result).await
    }

    async fn published(&self, result: QueueResult<QueueEntry>) -> QueueResult<QueueEntry> {
        let entry = result?;
        self.publish(&entry.zone_id).await;
        Ok(entry)
    }

    /// Push the zone's current snapshot to its subscribers.
    ///
    /// A subscriber arriving after the count check reads a snapshot that
    /// already includes the mutation.
    async fn publish(&self, zone_id: &ZoneId) {
        if self.events.subscriber_count(zone_id) == 0 {
            return;
        }

        match self.store.snapshot(zone_id.clone()).await {
            Ok(snapshot) => {
                self.events.publish(zone_id, snapshot);
            }
            Err(e) => {
                warn!(zone_id = %zone_id, error = %e, "Failed to read snapshot for publishing");
            }
        }
    }
}

pub(crate) fn unauthorized(actor: &Actor, action: QueueAction, zone_id: &ZoneId) -> QueueError {
    debug!(actor = %actor, action = %action, zone_id = %zone_id, "Rejected unauthorized action");
    QueueError::Unauthorized {
        actor: actor.to_string(),
        action,
        zone_id: zone_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::EntryStatus;
    use crate::zone::{LoadingZone, StaticZoneSource, ZoneKind};

    fn center() -> GeoPoint {
        GeoPoint::new(-25.7, 28.3).unwrap()
    }

    async fn service() -> QueueService {
        let zones = vec![
            LoadingZone::new("rank", "Rank", ZoneKind::Rank, center(), 50.0).unwrap(),
            LoadingZone::new(
                "mall",
                "Mall",
                ZoneKind::Mall,
                center().offset_north(300.0),
                80.0,
            )
            .unwrap(),
            LoadingZone::new(
                "far",
                "Far",
                ZoneKind::Station,
                center().offset_north(2_000.0),
                80.0,
            )
            .unwrap(),
        ];
        let directory = ZoneDirectory::load(Arc::new(StaticZoneSource::new(zones)))
            .await
            .unwrap();
        QueueService::in_memory(Arc::new(directory), ServiceConfig::default())
    }

    fn rank() -> ZoneId {
        ZoneId::new("rank")
    }

    #[tokio::test]
    async fn test_join_requires_driver_role() {
        let service = service().await;
        let marshal = Actor::marshal("m1", [rank()]);

        let err = service
            .join_queue(&marshal, &rank(), center(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QueueError::Unauthorized {
                action: QueueAction::Join,
                ..
            }
        ));
        assert!(service.snapshot(&rank()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_join_records_vehicle() {
        let service = service().await;
        let entry = service
            .join_queue(
                &Actor::driver("d1"),
                &rank(),
                center(),
                Some(VehicleRef::new("GP-123")),
            )
            .await
            .unwrap();

        assert_eq!(entry.driver_id, DriverId::new("d1"));
        assert_eq!(entry.vehicle, Some(VehicleRef::new("GP-123")));
    }

    #[tokio::test]
    async fn test_leave_only_by_owner_or_marshal() {
        let service = service().await;
        let entry = service
            .join_queue(&Actor::driver("d1"), &rank(), center(), None)
            .await
            .unwrap();

        let err = service
            .leave_queue(&Actor::driver("d2"), entry.id)
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::Unauthorized { .. }));

        let left = service
            .leave_queue(&Actor::driver("d1"), entry.id)
            .await
            .unwrap();
        assert_eq!(left.status, EntryStatus::Departed);
    }

    #[tokio::test]
    async fn test_subscribe_then_receive_mutations() {
        let service = service().await;
        let (initial, mut subscription) = service.subscribe(&rank()).await.unwrap();
        assert!(initial.is_empty());

        service
            .join_queue(&Actor::driver("d1"), &rank(), center(), None)
            .await
            .unwrap();

        let pushed = subscription.next().await.unwrap();
        assert_eq!(pushed.len(), 1);
        assert!(pushed.revision > initial.revision);
    }

    #[tokio::test]
    async fn test_subscribe_unknown_zone_releases_topic() {
        let service = service().await;
        let err = service.subscribe(&ZoneId::new("nope")).await.unwrap_err();
        assert!(matches!(err, QueueError::ZoneNotFound { .. }));
        assert_eq!(service.events().topic_count(), 0);
    }

    #[tokio::test]
    async fn test_ignored_location_update_publishes_nothing() {
        let service = service().await;
        let driver = Actor::driver("d1");
        let entry = service
            .join_queue(&driver, &rank(), center(), None)
            .await
            .unwrap();
        service.leave_queue(&driver, entry.id).await.unwrap();

        let (_, mut subscription) = service.subscribe(&rank()).await.unwrap();
        let update = service
            .update_location(entry.id, center().offset_north(10.0))
            .await
            .unwrap();

        assert!(matches!(update, LocationUpdate::Ignored { .. }));
        assert!(subscription.try_next().is_none());
    }

    #[tokio::test]
    async fn test_nearby_zones_uses_discovery_radius() {
        let service = service().await;
        let nearby = service.nearby_zones(&center());

        let ids: Vec<_> = nearby.iter().map(|n| n.zone.id.as_str()).collect();
        assert_eq!(ids, vec!["rank", "mall"]);
        assert!(nearby[0].is_inside());
        assert!(!nearby[1].is_inside());

        assert_eq!(service.nearby_zones_within(&center(), 5_000.0).len(), 3);
    }
}
