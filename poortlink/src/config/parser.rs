//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::Ini;

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::geo::validate_radius;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [zones] section
    if let Some(section) = ini.section(Some("zones")) {
        if let Some(v) = non_empty(section.get("file")) {
            config.zones.file = expand_tilde(v);
        }
    }

    // [tracker] section
    if let Some(section) = ini.section(Some("tracker")) {
        if let Some(v) = section.get("high_accuracy") {
            config.tracker.high_accuracy = parse_bool(v)
                .ok_or_else(|| invalid("tracker", "high_accuracy", v, "must be true or false"))?;
        }
        if let Some(v) = section.get("maximum_age_secs") {
            config.tracker.maximum_age_secs = parse_number::<u64>(v).ok_or_else(|| {
                invalid("tracker", "maximum_age_secs", v, "must be a non-negative integer (seconds)")
            })?;
        }
        if let Some(v) = section.get("timeout_secs") {
            config.tracker.timeout_secs = parse_number::<u64>(v)
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    invalid("tracker", "timeout_secs", v, "must be a positive integer (seconds)")
                })?;
        }
        if let Some(v) = section.get("discovery_radius_m") {
            config.tracker.discovery_radius_m = parse_number::<f64>(v)
                .and_then(|radius| validate_radius(radius).ok())
                .ok_or_else(|| {
                    invalid("tracker", "discovery_radius_m", v, "must be a positive number of meters")
                })?;
        }
    }

    // [events] section
    if let Some(section) = ini.section(Some("events")) {
        if let Some(v) = section.get("channel_capacity") {
            config.events.channel_capacity = parse_number::<usize>(v)
                .filter(|capacity| *capacity > 0)
                .ok_or_else(|| invalid("events", "channel_capacity", v, "must be a positive integer"))?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section.get("directory")) {
            config.logging.directory = expand_tilde(v);
        }
        if let Some(v) = non_empty(section.get("file")) {
            config.logging.file = v.to_string();
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number<T: FromStr>(value: &str) -> Option<T> {
    value.trim().parse().ok()
}

/// Strict boolean parsing; anything unrecognized is an error.
pub(super) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
