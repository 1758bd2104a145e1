//! Configuration file handling for ~/.poortlink/config.ini.
//!
//! Settings structs live in [`super::settings`], parsing in [`super::parser`]
//! and serialization in [`super::writer`].

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use super::settings::ConfigFile;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path (~/.poortlink/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path())
    }

    /// Save configuration to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }
}

/// Get the path to the config directory (~/.poortlink).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".poortlink")
}

/// Get the path to the config file (~/.poortlink/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::DEFAULT_LOG_FILE;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();

        assert!(config.tracker.high_accuracy);
        assert_eq!(config.tracker.maximum_age_secs, 5);
        assert_eq!(config.tracker.timeout_secs, 10);
        assert_eq!(config.tracker.discovery_radius_m, 500.0);
        assert_eq!(config.events.channel_capacity, 16);
        assert_eq!(config.logging.file, DEFAULT_LOG_FILE);
        assert!(config.zones.file.ends_with(".poortlink/zones.json"));
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.ini");

        let config = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_save_creates_parent_and_reloads() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested/dir/config.ini");

        let mut config = ConfigFile::default();
        config.tracker.timeout_secs = 20;
        config.tracker.discovery_radius_m = 750.5;
        config.events.channel_capacity = 64;
        config.zones.file = temp_dir.path().join("zones.json");
        config.save_to(&config_path).unwrap();

        let loaded = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_translates_to_library_configs() {
        let mut config = ConfigFile::default();
        config.tracker.high_accuracy = false;
        config.tracker.maximum_age_secs = 3;
        config.tracker.discovery_radius_m = 250.0;
        config.events.channel_capacity = 4;

        let tracker = config.to_tracker_config();
        assert!(!tracker.watch.high_accuracy);
        assert_eq!(tracker.watch.maximum_age, std::time::Duration::from_secs(3));

        let service = config.to_service_config();
        assert_eq!(service.discovery_radius_meters, 250.0);
        assert_eq!(service.channel_capacity, 4);
    }
}
