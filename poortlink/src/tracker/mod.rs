//! Location tracker.
//!
//! Subscribes to a continuous device-location stream and keeps the driver's
//! queue entries and nearby-zones view current:
//!
//! ```text
//! LocationSource ──► LocationWatch ──► LocationTracker ──► QueueService::update_location
//!                                            │
//!                                            └──► TrackerEvent (boundary, nearby, errors)
//! ```
//!
//! Permission and support failures are distinct, non-fatal states; the UI
//! offers a retry by starting a new tracker. Stopping the tracker (or
//! dropping its handle) releases the device subscription.

mod runner;
mod source;

pub use runner::{
    LocationTracker, TrackerConfig, TrackerEvent, TrackerHandle, TrackerStatus,
    DEFAULT_EVENT_CAPACITY,
};
pub use source::{
    ChannelLocationSource, LocationError, LocationFeed, LocationSample, LocationSource,
    LocationWatch, WatchOptions, DEFAULT_MAXIMUM_AGE, DEFAULT_TIMEOUT,
};
