//! INI serialization logic for converting `ConfigFile` → INI string.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[zones]
; JSON file listing loading zones (id, name, kind, center, radius_meters, ...)
file = {}

[tracker]
; Request high-accuracy (GPS) fixes from the device
high_accuracy = {}
; Discard location samples older than this many seconds
maximum_age_secs = {}
; Report a timeout when no sample arrives within this many seconds
timeout_secs = {}
; Radius in meters of the "nearby zones" view shown before joining
discovery_radius_m = {}

[events]
; Queue snapshots buffered per zone before slow subscribers skip ahead
channel_capacity = {}

[logging]
; Directory for log files
directory = {}
; Log file name
file = {}
"#,
        path_to_string(&config.zones.file),
        config.tracker.high_accuracy,
        config.tracker.maximum_age_secs,
        config.tracker.timeout_secs,
        config.tracker.discovery_radius_m,
        config.events.channel_capacity,
        path_to_string(&config.logging.directory),
        config.logging.file,
    )
}

fn path_to_string(path: &Path) -> String {
    path.display().to_string()
}
