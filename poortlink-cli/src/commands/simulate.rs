//! Simulate command - scripted queue session against one zone.
//!
//! Runs the standard queue scenario with simulated drivers and a marshal:
//! drivers join inside the geofence, an out-of-order loading attempt is
//! rejected, the front driver loads and departs, and the next driver's
//! location feed wanders outside the zone and back before being served.
//! Every snapshot pushed to the zone's subscription is printed.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use console::style;
use poortlink::events::ZoneSubscription;
use poortlink::geo::GeoPoint;
use poortlink::marshal::{Actor, MarshalControl};
use poortlink::queue::{EntryStatus, QueueEntry, QueueSnapshot};
use poortlink::service::QueueService;
use poortlink::tracker::{ChannelLocationSource, LocationTracker, TrackerEvent};
use poortlink::zone::{LoadingZone, ZoneId};
use poortlink::QueueError;
use tokio::sync::broadcast;
use tracing::info;

use crate::commands::common::{load_config, load_directory, runtime, start_logging};
use crate::error::CliError;

const EVENT_WAIT: Duration = Duration::from_secs(2);

/// Arguments for the simulate command.
#[derive(Debug, Clone)]
pub struct SimulateArgs {
    pub zone: String,
    pub drivers: usize,
}

/// Run the simulate command.
pub fn run(config_path: &Path, args: SimulateArgs) -> Result<(), CliError> {
    if args.drivers < 2 {
        return Err(CliError::InvalidArgument(
            "--drivers must be at least 2".to_string(),
        ));
    }

    let config = load_config(config_path)?;
    let _logging = start_logging(&config)?;
    let runtime = runtime()?;

    runtime.block_on(async {
        let directory = load_directory(&config).await?;
        let zone = directory.require_active(&ZoneId::new(args.zone.as_str()))?;
        let service = Arc::new(QueueService::in_memory(
            directory,
            config.to_service_config(),
        ));

        info!(zone_id = %zone.id, drivers = args.drivers, "Starting queue simulation");
        Simulation::new(service, zone, &config).run(args.drivers).await
    })
}

struct Simulation {
    service: Arc<QueueService>,
    control: MarshalControl,
    marshal: Actor,
    zone: LoadingZone,
    tracker_config: poortlink::tracker::TrackerConfig,
}

impl Simulation {
    fn new(
        service: Arc<QueueService>,
        zone: LoadingZone,
        config: &poortlink::config::ConfigFile,
    ) -> Self {
        Self {
            control: MarshalControl::new(Arc::clone(&service)),
            marshal: Actor::marshal("marshal-1", [zone.id.clone()]),
            tracker_config: config.to_tracker_config(),
            service,
            zone,
        }
    }

    async fn run(&self, driver_count: usize) -> Result<(), CliError> {
        let (initial, mut subscription) = self.service.subscribe(&self.zone.id).await?;
        println!(
            "{} {} ({}, radius {:.0} m)",
            style("Zone").bold(),
            self.zone.name,
            self.zone.id,
            self.zone.radius_meters
        );
        print_snapshot(&initial);

        // Drivers join at increasing distances, all inside the geofence
        let mut entries = Vec::with_capacity(driver_count);
        for i in 0..driver_count {
            let driver = Actor::driver(format!("driver-{}", i + 1));
            let fraction = 0.5 + 0.4 * i as f64 / driver_count as f64;
            let location = self.point_at(self.zone.radius_meters * fraction);

            step(&format!("{} joins", driver.id));
            let entry = self
                .service
                .join_queue(&driver, &self.zone.id, location, None)
                .await?;
            entries.push((driver, entry));
            drain(&mut subscription);
        }

        // A join from outside the geofence is refused with the distance to go
        step("late driver tries to join from the parking lot");
        let outside = self.point_at(self.zone.radius_meters + 60.0);
        match self
            .service
            .join_queue(&Actor::driver("late-driver"), &self.zone.id, outside, None)
            .await
        {
            Err(e @ QueueError::OutOfRange { .. }) => {
                let to_go = e.meters_to_go().unwrap_or_default();
                println!("    rejected: {} ({:.0} m to go)", e, to_go);
            }
            other => return Err(unexpected("OutOfRange", other)),
        }

        let (_, first) = &entries[0];
        let (second_driver, second) = &entries[1];

        step(&format!("marshal calls {} out of turn", second.driver_id));
        match self.control.start_loading(&self.marshal, second.id).await {
            Err(e @ QueueError::NotFrontOfQueue { .. }) => println!("    rejected: {}", e),
            other => return Err(unexpected("NotFrontOfQueue", other)),
        }

        step(&format!("marshal starts loading {}", first.driver_id));
        self.control.start_loading(&self.marshal, first.id).await?;
        drain(&mut subscription);

        step(&format!("{} departs", first.driver_id));
        self.control.mark_departed(&self.marshal, first.id).await?;
        drain(&mut subscription);

        self.wander(second_driver, second).await?;
        drain(&mut subscription);

        step("marshal advances the queue");
        if let Some(entry) = self.control.advance_front(&self.marshal, &self.zone.id).await? {
            println!("    now loading {} (position {})", entry.driver_id, entry.position);
            drain(&mut subscription);
            self.control.mark_departed(&self.marshal, entry.id).await?;
            drain(&mut subscription);
        }

        let history = self.service.history(&self.zone.id).await?;
        println!();
        println!("{}", style("History (newest first)").bold());
        for entry in history {
            println!(
                "  #{:<3} {:<12} {:<9} skips={}",
                entry.position, entry.driver_id, entry.status, entry.skip_count
            );
        }
        Ok(())
    }

    /// Track a queued driver who leaves the geofence and comes back.
    async fn wander(&self, driver: &Actor, entry: &QueueEntry) -> Result<(), CliError> {
        step(&format!("{} drives around the block", driver.id));

        let (source, feed) = ChannelLocationSource::new(8);
        let tracker = LocationTracker::try_start(
            Arc::clone(&self.service),
            driver.driver_id(),
            &source,
            self.tracker_config.clone(),
        )?;
        let mut events = tracker.events();

        feed.send_point(self.point_at(self.zone.radius_meters + 40.0))
            .await;
        report_tracker_events(&mut events).await;

        feed.send_point(self.point_at(self.zone.radius_meters * 0.3))
            .await;
        report_tracker_events(&mut events).await;

        tracker.stop().await;

        let current = self.service.entry(entry.id).await?;
        if current.status != EntryStatus::Waiting {
            return Err(CliError::Queue(QueueError::InvalidTransition {
                entry_id: current.id,
                from: current.status,
                action: poortlink::queue::QueueAction::UpdateLocation,
            }));
        }
        println!("    {} kept position {}", driver.id, current.position);
        Ok(())
    }

    fn point_at(&self, meters_north: f64) -> GeoPoint {
        self.zone.center.offset_north(meters_north)
    }
}

/// Print tracker events up to and including the next nearby-zones refresh.
async fn report_tracker_events(events: &mut broadcast::Receiver<TrackerEvent>) {
    loop {
        match tokio::time::timeout(EVENT_WAIT, events.recv()).await {
            Ok(Ok(TrackerEvent::BoundaryExit { entry })) => println!(
                "    {} left the zone ({:.0} m from center), still queued",
                style("warning:").yellow(),
                entry.distance_from_zone.unwrap_or_default()
            ),
            Ok(Ok(TrackerEvent::BoundaryEnter { .. })) => println!("    back inside the zone"),
            Ok(Ok(TrackerEvent::NearbyZones(nearby))) => {
                println!("    {} zone(s) nearby", nearby.len());
                return;
            }
            Ok(Ok(TrackerEvent::Error(e))) => println!("    location error: {}", e),
            Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
            Ok(Err(broadcast::error::RecvError::Closed)) | Err(_) => return,
        }
    }
}

fn step(description: &str) {
    println!();
    println!("{} {}", style("==>").cyan().bold(), description);
}

/// Print every snapshot already delivered to the subscription.
fn drain(subscription: &mut ZoneSubscription) {
    while let Some(snapshot) = subscription.try_next() {
        print_snapshot(&snapshot);
    }
}

fn print_snapshot(snapshot: &QueueSnapshot) {
    println!(
        "    {} revision {}: {} waiting, {} loading",
        style("snapshot").dim(),
        snapshot.revision,
        snapshot.waiting_count(),
        snapshot.loading_count()
    );
    for entry in &snapshot.entries {
        let verified = if entry.is_gps_verified { "" } else { " (outside zone)" };
        println!(
            "      #{:<3} {:<12} {}{}",
            entry.position, entry.driver_id, entry.status, verified
        );
    }
}

fn unexpected<T: std::fmt::Debug>(expected: &str, got: Result<T, QueueError>) -> CliError {
    match got {
        Err(e) => CliError::Queue(e),
        Ok(value) => CliError::InvalidArgument(format!(
            "expected {} rejection, operation succeeded: {:?}",
            expected, value
        )),
    }
}
