//! Integration tests for the zone queue.
//!
//! These tests drive the public API the way a client application would:
//! - drivers joining through the geofence check
//! - a marshal serving the queue in position order
//! - concurrent joins against one zone
//! - subscribers receiving snapshots after each mutation
//!
//! Run with: `cargo test --test queue_integration`

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use poortlink::geo::GeoPoint;
use poortlink::marshal::{Actor, MarshalControl};
use poortlink::queue::{DriverId, EntryStatus};
use poortlink::service::{QueueService, ServiceConfig};
use poortlink::zone::{LoadingZone, StaticZoneSource, ZoneDirectory, ZoneId, ZoneKind};
use poortlink::QueueError;

// ============================================================================
// Helper Functions
// ============================================================================

fn center() -> GeoPoint {
    GeoPoint::new(-25.7, 28.3).unwrap()
}

fn zone_z() -> ZoneId {
    ZoneId::new("zone-z")
}

async fn service() -> Arc<QueueService> {
    let zones = vec![
        LoadingZone::new("zone-z", "Bosman Rank", ZoneKind::Rank, center(), 50.0)
            .unwrap()
            .with_marshal(true),
        LoadingZone::new(
            "mall",
            "Menlyn Mall",
            ZoneKind::Mall,
            center().offset_north(5_000.0),
            100.0,
        )
        .unwrap(),
    ];
    let directory = ZoneDirectory::load(Arc::new(StaticZoneSource::new(zones)))
        .await
        .unwrap();
    Arc::new(QueueService::in_memory(
        Arc::new(directory),
        ServiceConfig::default(),
    ))
}

fn marshal() -> Actor {
    Actor::marshal("marshal-1", [zone_z()])
}

// ============================================================================
// Integration Tests
// ============================================================================

/// Two drivers join, the marshal serves them strictly in position order.
#[tokio::test]
async fn test_end_to_end_queue_session() {
    let service = service().await;
    let control = MarshalControl::new(Arc::clone(&service));

    let d1 = service
        .join_queue(&Actor::driver("D1"), &zone_z(), center().offset_north(30.0), None)
        .await
        .unwrap();
    assert_eq!(d1.position, 1);
    assert!(d1.is_gps_verified);

    let d2 = service
        .join_queue(&Actor::driver("D2"), &zone_z(), center().offset_north(40.0), None)
        .await
        .unwrap();
    assert_eq!(d2.position, 2);

    let err = control.start_loading(&marshal(), d2.id).await.unwrap_err();
    assert!(matches!(err, QueueError::NotFrontOfQueue { .. }));
    assert_eq!(
        service.entry(d2.id).await.unwrap().status,
        EntryStatus::Waiting
    );

    let loading = control.start_loading(&marshal(), d1.id).await.unwrap();
    assert_eq!(loading.status, EntryStatus::Loading);

    let departed = control.mark_departed(&marshal(), d1.id).await.unwrap();
    assert_eq!(departed.status, EntryStatus::Departed);

    let snapshot = service.snapshot(&zone_z()).await.unwrap();
    assert_eq!(snapshot.len(), 1);
    let front = snapshot.front().unwrap();
    assert_eq!(front.id, d2.id);
    assert_eq!(front.position, 2, "positions are not compacted");

    let loading = control.start_loading(&marshal(), d2.id).await.unwrap();
    assert_eq!(loading.status, EntryStatus::Loading);

    let history = service.history(&zone_z()).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].driver_id, DriverId::new("D1"));
}

#[tokio::test]
async fn test_out_of_range_join_creates_nothing() {
    let service = service().await;
    let mall = ZoneId::new("mall");
    let far = service
        .directory()
        .get(&mall)
        .unwrap()
        .center
        .offset_north(600.0);

    let err = service
        .join_queue(&Actor::driver("D1"), &mall, far, None)
        .await
        .unwrap_err();

    match err {
        QueueError::OutOfRange {
            distance_meters,
            required_radius_meters,
            ..
        } => {
            assert!((distance_meters - 600.0).abs() < 6.0);
            assert_eq!(required_radius_meters, 100.0);
        }
        other => panic!("expected OutOfRange, got {:?}", other),
    }
    assert!(service.snapshot(&mall).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_join_rejected() {
    let service = service().await;
    let driver = Actor::driver("D1");

    let first = service
        .join_queue(&driver, &zone_z(), center(), None)
        .await
        .unwrap();
    let err = service
        .join_queue(&driver, &zone_z(), center(), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        QueueError::DuplicateEntry { existing, .. } if existing == first.id
    ));
    assert_eq!(service.snapshot(&zone_z()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_skip_sends_driver_to_tail() {
    let service = service().await;
    let control = MarshalControl::new(Arc::clone(&service));

    let mut entries = Vec::new();
    for name in ["D1", "D2", "D3"] {
        entries.push(
            service
                .join_queue(&Actor::driver(name), &zone_z(), center(), None)
                .await
                .unwrap(),
        );
    }

    let skipped = control
        .skip_driver(&marshal(), entries[0].id, Some("not at the kerb".to_string()))
        .await
        .unwrap();
    assert_eq!(skipped.status, EntryStatus::Waiting);
    assert_eq!(skipped.skip_count, 1);
    assert_eq!(skipped.position, 4);
    assert_eq!(skipped.notes.as_deref(), Some("not at the kerb"));

    let front = control
        .advance_front(&marshal(), &zone_z())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(front.driver_id, DriverId::new("D2"));
}

#[tokio::test]
async fn test_marshal_of_other_zone_is_unauthorized() {
    let service = service().await;
    let control = MarshalControl::new(Arc::clone(&service));
    let entry = service
        .join_queue(&Actor::driver("D1"), &zone_z(), center(), None)
        .await
        .unwrap();

    let outsider = Actor::marshal("marshal-2", [ZoneId::new("mall")]);
    let err = control.start_loading(&outsider, entry.id).await.unwrap_err();
    assert!(matches!(err, QueueError::Unauthorized { .. }));

    let admin = Actor::admin("admin-1");
    control.start_loading(&admin, entry.id).await.unwrap();
}

/// Joins racing on one zone never share a position.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_get_unique_positions() {
    let service = service().await;
    let driver_count = 40;

    let mut handles = Vec::with_capacity(driver_count);
    for i in 0..driver_count {
        let service = Arc::clone(&service);
        let offset = rand::rng().random_range(0.0..45.0);
        handles.push(tokio::spawn(async move {
            service
                .join_queue(
                    &Actor::driver(format!("driver-{}", i)),
                    &zone_z(),
                    center().offset_north(offset),
                    None,
                )
                .await
        }));
    }

    let mut positions = HashSet::new();
    for handle in handles {
        let entry = handle.await.unwrap().unwrap();
        assert!(positions.insert(entry.position), "duplicate position");
    }

    assert_eq!(positions.len(), driver_count);
    assert_eq!(positions.iter().max(), Some(&(driver_count as u64)));

    let snapshot = service.snapshot(&zone_z()).await.unwrap();
    let ordered: Vec<u64> = snapshot.entries.iter().map(|e| e.position).collect();
    let mut sorted = ordered.clone();
    sorted.sort_unstable();
    assert_eq!(ordered, sorted);
}

/// Every mutation reaches every live subscriber of the zone.
#[tokio::test]
async fn test_subscribers_receive_each_mutation() {
    let service = service().await;
    let control = MarshalControl::new(Arc::clone(&service));

    let (initial, mut first) = service.subscribe(&zone_z()).await.unwrap();
    let (_, mut second) = service.subscribe(&zone_z()).await.unwrap();
    assert!(initial.is_empty());

    let entry = service
        .join_queue(&Actor::driver("D1"), &zone_z(), center(), None)
        .await
        .unwrap();
    control.start_loading(&marshal(), entry.id).await.unwrap();

    for subscription in [&mut first, &mut second] {
        let joined = tokio::time::timeout(Duration::from_secs(1), subscription.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(joined.waiting_count(), 1);

        let loading = tokio::time::timeout(Duration::from_secs(1), subscription.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loading.loading_count(), 1);
        assert!(loading.revision > joined.revision);
        assert!(joined.revision > initial.revision);
    }

    drop(first);
    drop(second);
    assert_eq!(service.events().topic_count(), 0);
}

#[tokio::test]
async fn test_leaving_the_geofence_keeps_the_place() {
    let service = service().await;
    let entry = service
        .join_queue(&Actor::driver("D1"), &zone_z(), center(), None)
        .await
        .unwrap();

    let update = service
        .update_location(entry.id, center().offset_north(500.0))
        .await
        .unwrap();
    assert!(update.exited_boundary());

    let stored = service.entry(entry.id).await.unwrap();
    assert_eq!(stored.status, EntryStatus::Waiting);
    assert_eq!(stored.position, entry.position);
    assert!(!stored.is_gps_verified);

    let update = service.update_location(entry.id, center()).await.unwrap();
    assert!(update.entered_boundary());
}

#[tokio::test]
async fn test_nearby_zones_sorted_by_distance() {
    let service = service().await;
    let nearby = service.nearby_zones_within(&center().offset_north(20.0), 10_000.0);

    let ids: Vec<_> = nearby.iter().map(|n| n.zone.id.as_str()).collect();
    assert_eq!(ids, vec!["zone-z", "mall"]);
    assert!(nearby[0].is_inside());
    assert!(!nearby[1].is_inside());
}
