//! User configuration.
//!
//! `~/.poortlink/config.ini` is read with `rust-ini`; missing keys fall back
//! to defaults and invalid values are reported with their section and key.
//!
//! ```ini
//! [zones]
//! file = ~/.poortlink/zones.json
//!
//! [tracker]
//! high_accuracy = true
//! maximum_age_secs = 5
//! timeout_secs = 10
//! discovery_radius_m = 500
//!
//! [events]
//! channel_capacity = 16
//!
//! [logging]
//! directory = ~/.poortlink/logs
//! file = poortlink.log
//! ```

mod file;
mod parser;
mod settings;
mod writer;

pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    ConfigFile, EventsSettings, LoggingSettings, TrackerSettings, ZonesSettings, DEFAULT_LOG_FILE,
};
