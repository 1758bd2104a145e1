//! Common utilities shared across CLI commands.

use std::path::Path;
use std::sync::Arc;

use poortlink::config::ConfigFile;
use poortlink::geo::GeoPoint;
use poortlink::logging::{init_logging, LoggingGuard};
use poortlink::zone::{JsonZoneFile, ZoneDirectory};
use tokio::runtime::Runtime;

use crate::error::CliError;

/// Load the configuration file, falling back to defaults when absent.
pub fn load_config(path: &Path) -> Result<ConfigFile, CliError> {
    Ok(ConfigFile::load_from(path)?)
}

/// Multi-threaded runtime for async commands.
pub fn runtime() -> Result<Runtime, CliError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)
}

/// Start file and stderr logging as configured.
pub fn start_logging(config: &ConfigFile) -> Result<LoggingGuard, CliError> {
    init_logging(&config.logging.directory, &config.logging.file)
        .map_err(|e| CliError::LoggingInit(e.to_string()))
}

/// Load the configured zone file into a directory.
pub async fn load_directory(config: &ConfigFile) -> Result<Arc<ZoneDirectory>, CliError> {
    let source = Arc::new(JsonZoneFile::new(config.zones.file.clone()));
    let directory = ZoneDirectory::load(source).await?;
    Ok(Arc::new(directory))
}

/// Validate a coordinate pair from the command line.
pub fn parse_point(lat: f64, lon: f64) -> Result<GeoPoint, CliError> {
    GeoPoint::new(lat, lon).map_err(|e| CliError::InvalidArgument(e.to_string()))
}
