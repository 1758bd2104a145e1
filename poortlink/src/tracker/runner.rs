//! Location tracker task and its handle.
//!
//! - `LocationTracker` - self-driving tokio task consuming a [`LocationWatch`]
//! - [`TrackerStatus`] - shared state updated as samples arrive
//! - [`TrackerHandle`] - lightweight handle to read status, listen for
//!   events and stop tracking
//!
//! # Example
//!
//! ```ignore
//! let handle = LocationTracker::start(service, driver_id, &source, TrackerConfig::default());
//! let mut events = handle.events();
//!
//! while let Ok(event) = events.recv().await {
//!     if let TrackerEvent::BoundaryExit { entry } = event {
//!         warn_driver(&entry);
//!     }
//! }
//!
//! handle.stop().await;
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::source::{LocationError, LocationSample, LocationSource, LocationWatch, WatchOptions};
use crate::error::{QueueError, QueueResult};
use crate::geo::GeoPoint;
use crate::queue::{DriverId, EntryId, LocationUpdate, QueueEntry};
use crate::service::QueueService;
use crate::zone::NearbyZone;

/// Default tracker event buffer.
pub const DEFAULT_EVENT_CAPACITY: usize = 32;

/// Tracker configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub watch: WatchOptions,
    /// Buffered events per listener.
    pub event_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            watch: WatchOptions::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// What the tracker reports to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    /// The driver's entry went from inside to outside its zone.
    ///
    /// The entry stays queued; this is a warning only.
    BoundaryExit { entry: QueueEntry },
    /// The driver's entry is back inside its zone.
    BoundaryEnter { entry: QueueEntry },
    /// Active zones within the discovery radius, nearest first.
    NearbyZones(Vec<NearbyZone>),
    /// The location source failed; tracking continues.
    Error(LocationError),
}

/// Shared tracker state.
#[derive(Debug, Clone, Default)]
pub struct TrackerStatus {
    pub last_sample: Option<LocationSample>,
    pub nearby: Vec<NearbyZone>,
    /// Most recent source error, cleared by the next usable sample.
    pub last_error: Option<LocationError>,
    pub samples_processed: u64,
    pub samples_discarded: u64,
    pub is_running: bool,
}

impl TrackerStatus {
    pub fn last_point(&self) -> Option<GeoPoint> {
        self.last_sample.as_ref().map(|s| s.point)
    }
}

/// Handle to a running tracker.
///
/// Dropping the handle stops the tracker and releases the location source.
pub struct TrackerHandle {
    status: Arc<Mutex<TrackerStatus>>,
    events: broadcast::Sender<TrackerEvent>,
    cancellation: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for TrackerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerHandle")
            .field("status", &*self.status.lock())
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish()
    }
}

impl TrackerHandle {
    /// Current tracker status (snapshot).
    pub fn status(&self) -> TrackerStatus {
        self.status.lock().clone()
    }

    /// Listen for tracker events from now on.
    pub fn events(&self) -> broadcast::Receiver<TrackerEvent> {
        self.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.status.lock().is_running
    }

    /// Stop tracking and wait for the task to release the source.
    pub async fn stop(mut self) {
        self.cancellation.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Location tracker task failed");
            }
        }
    }
}

impl Drop for TrackerHandle {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

/// Feeds device positions into the driver's queue entries.
///
/// For every fresh sample the tracker writes the location to each active
/// entry of the driver, reports geofence crossings, and refreshes the
/// nearby-zones view. Write failures are logged and dropped.
pub struct LocationTracker {
    service: Arc<QueueService>,
    driver_id: DriverId,
    config: TrackerConfig,
    status: Arc<Mutex<TrackerStatus>>,
    events: broadcast::Sender<TrackerEvent>,
    cancellation: CancellationToken,
    started_at: DateTime<Utc>,
}

impl LocationTracker {
    /// Start tracking `driver_id` from `source`.
    ///
    /// Must be called inside a tokio runtime. If the source refuses to be
    /// watched the error is recorded in the returned handle's status and no
    /// task is spawned; the caller may retry with a new `start`.
    pub fn start(
        service: Arc<QueueService>,
        driver_id: DriverId,
        source: &dyn LocationSource,
        config: TrackerConfig,
    ) -> TrackerHandle {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let status = Arc::new(Mutex::new(TrackerStatus::default()));
        let cancellation = CancellationToken::new();

        let mut handle = TrackerHandle {
            status: Arc::clone(&status),
            events: events.clone(),
            cancellation: cancellation.clone(),
            task: None,
        };

        let started_at = Utc::now();
        let watch = match source.watch(&config.watch) {
            Ok(watch) => watch,
            Err(error) => {
                warn!(
                    driver_id = %driver_id,
                    source = %source.describe(),
                    error = %error,
                    "Could not start location tracking"
                );
                status.lock().last_error = Some(error);
                return handle;
            }
        };

        status.lock().is_running = true;
        info!(
            driver_id = %driver_id,
            source = %source.describe(),
            high_accuracy = config.watch.high_accuracy,
            "Location tracking started"
        );

        let tracker = Self {
            service,
            driver_id,
            config,
            status,
            events,
            cancellation,
            started_at,
        };
        handle.task = Some(tokio::spawn(tracker.run(watch)));
        handle
    }

    /// Like [`start`](Self::start), but a refused watch is an error.
    ///
    /// # Errors
    ///
    /// [`QueueError::LocationUnavailable`] carrying the source's refusal.
    pub fn try_start(
        service: Arc<QueueService>,
        driver_id: DriverId,
        source: &dyn LocationSource,
        config: TrackerConfig,
    ) -> QueueResult<TrackerHandle> {
        let handle = Self::start(service, driver_id, source, config);
        if handle.is_running() {
            return Ok(handle);
        }
        match handle.status().last_error {
            Some(error) => Err(QueueError::LocationUnavailable(error)),
            None => Ok(handle),
        }
    }

    async fn run(self, mut watch: LocationWatch) {
        let timeout = self.config.watch.timeout;

        loop {
            tokio::select! {
                biased;

                _ = self.cancellation.cancelled() => break,

                received = tokio::time::timeout(timeout, watch.recv()) => match received {
                    Err(_) => {
                        debug!(driver_id = %self.driver_id, "No location fix within timeout");
                        self.record_error(LocationError::Timeout);
                    }
                    Ok(None) => {
                        info!(driver_id = %self.driver_id, "Location source closed");
                        break;
                    }
                    Ok(Some(Ok(sample))) => self.process_sample(sample).await,
                    Ok(Some(Err(error))) => {
                        warn!(driver_id = %self.driver_id, error = %error, "Location source error");
                        self.record_error(error);
                    }
                }
            }
        }

        // Dropping the watch releases the device subscription
        drop(watch);
        self.status.lock().is_running = false;
        info!(driver_id = %self.driver_id, "Location tracking stopped");
    }

    /// A zero maximum age admits only fixes taken since tracking started.
    fn is_stale(&self, sample: &LocationSample, now: DateTime<Utc>) -> bool {
        let maximum_age = self.config.watch.maximum_age;
        if maximum_age.is_zero() {
            sample.timestamp < self.started_at
        } else {
            sample.is_stale(now, maximum_age)
        }
    }

    async fn process_sample(&self, sample: LocationSample) {
        let now = Utc::now();
        if self.is_stale(&sample, now) {
            debug!(
                driver_id = %self.driver_id,
                age_ms = sample.age(now).as_millis() as u64,
                "Discarding stale location sample"
            );
            self.status.lock().samples_discarded += 1;
            return;
        }

        debug!(
            driver_id = %self.driver_id,
            point = %sample.point,
            accuracy_m = ?sample.accuracy_meters,
            "Location sample"
        );

        match self.service.active_entries_for_driver(&self.driver_id).await {
            Ok(entries) => {
                for entry in entries {
                    self.apply(entry.id, sample.point).await;
                }
            }
            Err(e) => {
                warn!(driver_id = %self.driver_id, error = %e, "Could not look up active entries");
            }
        }

        let nearby = self.service.nearby_zones(&sample.point);
        {
            let mut status = self.status.lock();
            status.last_sample = Some(sample);
            status.nearby = nearby.clone();
            status.last_error = None;
            status.samples_processed += 1;
        }
        self.emit(TrackerEvent::NearbyZones(nearby));
    }

    async fn apply(&self, entry_id: EntryId, point: GeoPoint) {
        let update = match self.service.update_location(entry_id, point).await {
            Ok(update) => update,
            Err(e) => {
                warn!(entry_id = %entry_id, error = %e, "Dropped location update");
                return;
            }
        };

        let exited = update.exited_boundary();
        let entered = update.entered_boundary();
        let LocationUpdate::Applied { entry, .. } = update else {
            return;
        };

        if exited {
            info!(
                entry_id = %entry.id,
                zone_id = %entry.zone_id,
                distance_m = format!("{:.1}", entry.distance_from_zone.unwrap_or_default()),
                "Driver left zone boundary"
            );
            self.emit(TrackerEvent::BoundaryExit { entry });
        } else if entered {
            info!(entry_id = %entry.id, zone_id = %entry.zone_id, "Driver back inside zone");
            self.emit(TrackerEvent::BoundaryEnter { entry });
        }
    }

    fn record_error(&self, error: LocationError) {
        self.status.lock().last_error = Some(error.clone());
        self.emit(TrackerEvent::Error(error));
    }

    fn emit(&self, event: TrackerEvent) {
        // No listeners is fine; status still holds the latest state
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::marshal::Actor;
    use crate::queue::EntryStatus;
    use crate::service::ServiceConfig;
    use crate::tracker::{ChannelLocationSource, LocationFeed};
    use crate::zone::{LoadingZone, StaticZoneSource, ZoneDirectory, ZoneId, ZoneKind};

    fn center() -> GeoPoint {
        GeoPoint::new(-25.7, 28.3).unwrap()
    }

    async fn service() -> Arc<QueueService> {
        let zones = vec![LoadingZone::new("rank", "Rank", ZoneKind::Rank, center(), 50.0).unwrap()];
        let directory = ZoneDirectory::load(Arc::new(StaticZoneSource::new(zones)))
            .await
            .unwrap();
        Arc::new(QueueService::in_memory(
            Arc::new(directory),
            ServiceConfig::default(),
        ))
    }

    fn start(service: &Arc<QueueService>, config: TrackerConfig) -> (TrackerHandle, LocationFeed) {
        let (source, feed) = ChannelLocationSource::new(8);
        let handle = LocationTracker::start(
            Arc::clone(service),
            DriverId::new("d1"),
            &source,
            config,
        );
        (handle, feed)
    }

    async fn next_event(events: &mut broadcast::Receiver<TrackerEvent>) -> TrackerEvent {
        tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("tracker event timed out")
            .expect("tracker event channel closed")
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached");
    }

    #[tokio::test]
    async fn test_boundary_exit_and_enter() {
        let service = service().await;
        let entry = service
            .join_queue(&Actor::driver("d1"), &ZoneId::new("rank"), center(), None)
            .await
            .unwrap();

        let (handle, feed) = start(&service, TrackerConfig::default());
        let mut events = handle.events();

        feed.send_point(center().offset_north(120.0)).await;
        match next_event(&mut events).await {
            TrackerEvent::BoundaryExit { entry: exited } => {
                assert_eq!(exited.id, entry.id);
                assert!(!exited.is_gps_verified);
            }
            other => panic!("Expected BoundaryExit, got {:?}", other),
        }
        assert!(matches!(
            next_event(&mut events).await,
            TrackerEvent::NearbyZones(_)
        ));

        // Leaving the geofence never dequeues the driver
        let still_queued = service.entry(entry.id).await.unwrap();
        assert_eq!(still_queued.status, EntryStatus::Waiting);

        feed.send_point(center().offset_north(5.0)).await;
        assert!(matches!(
            next_event(&mut events).await,
            TrackerEvent::BoundaryEnter { .. }
        ));

        handle.stop().await;
    }

    #[tokio::test]
    async fn test_nearby_zones_without_entry() {
        let service = service().await;
        let (handle, feed) = start(&service, TrackerConfig::default());
        let mut events = handle.events();

        feed.send_point(center().offset_north(200.0)).await;
        match next_event(&mut events).await {
            TrackerEvent::NearbyZones(nearby) => {
                assert_eq!(nearby.len(), 1);
                assert!(!nearby[0].is_inside());
            }
            other => panic!("Expected NearbyZones, got {:?}", other),
        }

        let status = handle.status();
        assert_eq!(status.samples_processed, 1);
        assert!(status.last_point().is_some());
    }

    #[tokio::test]
    async fn test_stale_sample_discarded() {
        let service = service().await;
        let (handle, feed) = start(&service, TrackerConfig::default());
        let mut events = handle.events();

        let stale = LocationSample::now(center())
            .with_timestamp(Utc::now() - chrono::Duration::seconds(60));
        feed.send(stale).await;
        feed.send_point(center()).await;

        assert!(matches!(
            next_event(&mut events).await,
            TrackerEvent::NearbyZones(_)
        ));
        let status = handle.status();
        assert_eq!(status.samples_discarded, 1);
        assert_eq!(status.samples_processed, 1);
    }

    #[tokio::test]
    async fn test_zero_maximum_age_accepts_fresh_fixes() {
        let service = service().await;
        let mut config = TrackerConfig::default();
        config.watch.maximum_age = Duration::ZERO;
        let (handle, feed) = start(&service, config);

        let cached = LocationSample::now(center())
            .with_timestamp(Utc::now() - chrono::Duration::seconds(1));
        feed.send(cached).await;
        for _ in 0..5 {
            feed.send_point(center()).await;
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        wait_until(|| handle.status().samples_processed == 5).await;
        let status = handle.status();
        assert_eq!(status.samples_discarded, 1);
        assert_eq!(status.samples_processed, 5);
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_source_errors_are_not_fatal() {
        let service = service().await;
        let (handle, feed) = start(&service, TrackerConfig::default());
        let mut events = handle.events();

        feed.send_error(LocationError::PermissionDenied).await;
        assert_eq!(
            next_event(&mut events).await,
            TrackerEvent::Error(LocationError::PermissionDenied)
        );
        assert_eq!(
            handle.status().last_error,
            Some(LocationError::PermissionDenied)
        );

        feed.send_point(center()).await;
        assert!(matches!(
            next_event(&mut events).await,
            TrackerEvent::NearbyZones(_)
        ));
        assert!(handle.is_running());
        assert_eq!(handle.status().last_error, None);
    }

    #[tokio::test]
    async fn test_timeout_reported_and_tracking_continues() {
        let service = service().await;
        let config = TrackerConfig {
            watch: WatchOptions {
                timeout: Duration::from_millis(30),
                ..WatchOptions::default()
            },
            ..TrackerConfig::default()
        };
        let (handle, _feed) = start(&service, config);
        let mut events = handle.events();

        assert_eq!(
            next_event(&mut events).await,
            TrackerEvent::Error(LocationError::Timeout)
        );
        assert!(handle.is_running());
    }

    #[tokio::test]
    async fn test_watch_refused() {
        let service = service().await;
        let source = ChannelLocationSource::failing(LocationError::Unsupported);
        let handle = LocationTracker::start(
            service,
            DriverId::new("d1"),
            &source,
            TrackerConfig::default(),
        );

        let status = handle.status();
        assert!(!status.is_running);
        assert_eq!(status.last_error, Some(LocationError::Unsupported));
    }

    #[tokio::test]
    async fn test_try_start_reports_refusal() {
        let service = service().await;
        let source = ChannelLocationSource::failing(LocationError::PermissionDenied);
        let err = LocationTracker::try_start(
            Arc::clone(&service),
            DriverId::new("d1"),
            &source,
            TrackerConfig::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            QueueError::LocationUnavailable(LocationError::PermissionDenied)
        );
        assert!(err.is_retryable());

        let (source, _feed) = ChannelLocationSource::new(1);
        let handle = LocationTracker::try_start(
            service,
            DriverId::new("d1"),
            &source,
            TrackerConfig::default(),
        )
        .unwrap();
        assert!(handle.is_running());
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_stop_releases_source() {
        let service = service().await;
        let (handle, feed) = start(&service, TrackerConfig::default());
        assert!(!feed.is_closed());

        handle.stop().await;
        assert!(feed.is_closed());
    }

    #[tokio::test]
    async fn test_drop_releases_source() {
        let service = service().await;
        let (handle, feed) = start(&service, TrackerConfig::default());

        drop(handle);
        wait_until(|| feed.is_closed()).await;
    }

    #[tokio::test]
    async fn test_source_closing_ends_tracking() {
        let service = service().await;
        let (handle, feed) = start(&service, TrackerConfig::default());

        drop(feed);
        wait_until(|| !handle.is_running()).await;
    }
}
