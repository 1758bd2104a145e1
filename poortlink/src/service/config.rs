//! Queue service configuration.

use crate::events::DEFAULT_CHANNEL_CAPACITY;

/// Radius within which zones are offered before joining.
pub const DEFAULT_DISCOVERY_RADIUS_METERS: f64 = 500.0;

/// Tunables for [`QueueService`](super::QueueService).
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Radius of the "nearby zones" view, in meters.
    pub discovery_radius_meters: f64,
    /// Buffered snapshots per zone topic.
    pub channel_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            discovery_radius_meters: DEFAULT_DISCOVERY_RADIUS_METERS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ServiceConfig {
    pub fn with_discovery_radius(mut self, meters: f64) -> Self {
        self.discovery_radius_meters = meters;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }
}
