//! Zone sources - where the directory loads its zones from.
//!
//! The zone table lives in the persistent store and is administered
//! elsewhere. A [`ZoneSource`] is the read side of that table; the
//! directory calls it whenever it is asked to refresh.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::model::LoadingZone;
use crate::BoxFuture;

/// Errors that can occur while loading zones.
#[derive(Debug, Error)]
pub enum ZoneSourceError {
    /// I/O error reading a zone file.
    #[error("Failed to read zone file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Zone file contents are not a valid zone list.
    #[error("Failed to parse zone file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The backing store could not be reached.
    #[error("Zone store unavailable: {0}")]
    Unavailable(String),
}

/// Read access to the zone table.
pub trait ZoneSource: Send + Sync {
    /// Load every zone, active or not.
    fn load_zones(&self) -> BoxFuture<'_, Result<Vec<LoadingZone>, ZoneSourceError>>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// A fixed, in-memory list of zones.
#[derive(Debug, Clone, Default)]
pub struct StaticZoneSource {
    zones: Vec<LoadingZone>,
}

impl StaticZoneSource {
    pub fn new(zones: Vec<LoadingZone>) -> Self {
        Self { zones }
    }
}

impl ZoneSource for StaticZoneSource {
    fn load_zones(&self) -> BoxFuture<'_, Result<Vec<LoadingZone>, ZoneSourceError>> {
        Box::pin(async move { Ok(self.zones.clone()) })
    }

    fn describe(&self) -> String {
        format!("static ({} zones)", self.zones.len())
    }
}

/// Zones stored as a JSON array on disk.
///
/// ```json
/// [
///   {
///     "id": "bosman",
///     "name": "Bosman Taxi Rank",
///     "kind": "rank",
///     "center": { "latitude": -25.7545, "longitude": 28.1885 },
///     "radius_meters": 80.0,
///     "has_marshal": true
///   }
/// ]
/// ```
#[derive(Debug, Clone)]
pub struct JsonZoneFile {
    path: PathBuf,
}

impl JsonZoneFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write zones to `path` as pretty-printed JSON.
    pub async fn write(path: &Path, zones: &[LoadingZone]) -> Result<(), ZoneSourceError> {
        let content =
            serde_json::to_string_pretty(zones).map_err(|source| ZoneSourceError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        tokio::fs::write(path, content)
            .await
            .map_err(|source| ZoneSourceError::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl ZoneSource for JsonZoneFile {
    fn load_zones(&self) -> BoxFuture<'_, Result<Vec<LoadingZone>, ZoneSourceError>> {
        Box::pin(async move {
            let content =
                tokio::fs::read_to_string(&self.path)
                    .await
                    .map_err(|source| ZoneSourceError::Io {
                        path: self.path.clone(),
                        source,
                    })?;

            serde_json::from_str(&content).map_err(|source| ZoneSourceError::Parse {
                path: self.path.clone(),
                source,
            })
        })
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}
