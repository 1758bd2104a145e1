//! Settings structs for each configuration section.
//!
//! Each struct represents one `[section]` of the INI config file.

use std::path::PathBuf;
use std::time::Duration;

use super::file::config_directory;
use crate::events::DEFAULT_CHANNEL_CAPACITY;
use crate::service::{ServiceConfig, DEFAULT_DISCOVERY_RADIUS_METERS};
use crate::tracker::{TrackerConfig, WatchOptions, DEFAULT_MAXIMUM_AGE, DEFAULT_TIMEOUT};

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "poortlink.log";

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub zones: ZonesSettings,
    pub tracker: TrackerSettings,
    pub events: EventsSettings,
    pub logging: LoggingSettings,
}

/// Where loading zones come from.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonesSettings {
    /// JSON zone file.
    pub file: PathBuf,
}

/// Location tracking settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerSettings {
    pub high_accuracy: bool,
    /// Samples older than this are discarded.
    pub maximum_age_secs: u64,
    /// Seconds without a sample before a timeout is reported.
    pub timeout_secs: u64,
    /// Radius of the nearby-zones view.
    pub discovery_radius_m: f64,
}

/// Queue event channel settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EventsSettings {
    /// Snapshots buffered per zone topic.
    pub channel_capacity: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
}

impl Default for ConfigFile {
    fn default() -> Self {
        let base = config_directory();
        Self {
            zones: ZonesSettings {
                file: base.join("zones.json"),
            },
            tracker: TrackerSettings {
                high_accuracy: true,
                maximum_age_secs: DEFAULT_MAXIMUM_AGE.as_secs(),
                timeout_secs: DEFAULT_TIMEOUT.as_secs(),
                discovery_radius_m: DEFAULT_DISCOVERY_RADIUS_METERS,
            },
            events: EventsSettings {
                channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            },
            logging: LoggingSettings {
                directory: base.join("logs"),
                file: DEFAULT_LOG_FILE.to_string(),
            },
        }
    }
}

impl ConfigFile {
    /// Tracker configuration derived from `[tracker]`.
    pub fn to_tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            watch: WatchOptions {
                high_accuracy: self.tracker.high_accuracy,
                maximum_age: Duration::from_secs(self.tracker.maximum_age_secs),
                timeout: Duration::from_secs(self.tracker.timeout_secs),
            },
            ..TrackerConfig::default()
        }
    }

    /// Service configuration derived from `[tracker]` and `[events]`.
    pub fn to_service_config(&self) -> ServiceConfig {
        ServiceConfig::default()
            .with_discovery_radius(self.tracker.discovery_radius_m)
            .with_channel_capacity(self.events.channel_capacity)
    }
}
