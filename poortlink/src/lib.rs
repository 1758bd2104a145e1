//! PoortLink - GPS-verified virtual queues for taxi loading zones
//!
//! Drivers join a first-come-first-served queue for a loading zone (rank,
//! station, mall pick-up point) only while their device places them inside
//! the zone's geofence. Marshals on site call drivers forward in position
//! order, and every participant sees the queue change live.
//!
//! # Modules
//!
//! - [`geo`] - coordinates, Haversine distance, geofence checks
//! - [`zone`] - loading zones and the zone directory
//! - [`queue`] - entry state machine and the queue store
//! - [`events`] - per-zone snapshot fan-out
//! - [`service`] - driver-facing operations tying store, zones and events together
//! - [`marshal`] - actors, roles and the marshal control surface
//! - [`tracker`] - continuous device location tracking
//! - [`config`] - INI configuration file
//! - [`logging`] - tracing subscriber setup

pub mod config;
pub mod error;
pub mod events;
pub mod geo;
pub mod logging;
pub mod marshal;
pub mod queue;
pub mod service;
pub mod tracker;
pub mod zone;

use std::future::Future;
use std::pin::Pin;

pub use error::{QueueError, QueueResult};

/// Boxed future returned by the dyn-compatible async traits of this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
