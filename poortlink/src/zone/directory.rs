//! Zone directory - the read-mostly set of loading zones.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::model::{LoadingZone, NearbyZone, ZoneId};
use super::source::{ZoneSource, ZoneSourceError};
use crate::error::QueueError;
use crate::geo::GeoPoint;

/// Holds the known loading zones and answers lookups and discovery queries.
///
/// Lookups never touch the source; call [`refresh`](Self::refresh) to reload.
pub struct ZoneDirectory {
    source: Arc<dyn ZoneSource>,
    zones: RwLock<HashMap<ZoneId, LoadingZone>>,
}

impl std::fmt::Debug for ZoneDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneDirectory")
            .field("source", &self.source.describe())
            .field("zones", &self.zones.read().len())
            .finish()
    }
}

impl ZoneDirectory {
    /// Create an empty directory backed by `source`.
    pub fn new(source: Arc<dyn ZoneSource>) -> Self {
        Self {
            source,
            zones: RwLock::new(HashMap::new()),
        }
    }

    /// Create a directory and load it immediately.
    pub async fn load(source: Arc<dyn ZoneSource>) -> Result<Self, ZoneSourceError> {
        let directory = Self::new(source);
        directory.refresh().await?;
        Ok(directory)
    }

    /// Reload all zones from the source.
    ///
    /// Zones with an invalid geofence are skipped with a warning. On error the
    /// previous contents are kept. Returns the number of zones loaded.
    pub async fn refresh(&self) -> Result<usize, ZoneSourceError> {
        let loaded = self.source.load_zones().await?;

        let mut zones = HashMap::with_capacity(loaded.len());
        for zone in loaded {
            if let Err(e) = zone.validate() {
                warn!(zone_id = %zone.id, error = %e, "Skipping zone with invalid geofence");
                continue;
            }
            if zones.contains_key(&zone.id) {
                warn!(zone_id = %zone.id, "Duplicate zone id, keeping the later definition");
            }
            zones.insert(zone.id.clone(), zone);
        }

        let count = zones.len();
        *self.zones.write() = zones;

        info!(source = %self.source.describe(), zones = count, "Zone directory refreshed");
        Ok(count)
    }

    /// Look up a zone regardless of its active flag.
    pub fn get(&self, id: &ZoneId) -> Option<LoadingZone> {
        self.zones.read().get(id).cloned()
    }

    /// Look up a zone that is eligible for queueing.
    ///
    /// Fails with [`QueueError::ZoneNotFound`] when the zone is unknown or inactive.
    pub fn require_active(&self, id: &ZoneId) -> Result<LoadingZone, QueueError> {
        match self.get(id) {
            Some(zone) if zone.active => Ok(zone),
            Some(_) => {
                debug!(zone_id = %id, "Zone is inactive");
                Err(QueueError::ZoneNotFound { zone_id: id.clone() })
            }
            None => Err(QueueError::ZoneNotFound { zone_id: id.clone() }),
        }
    }

    /// All active zones, sorted by name.
    pub fn active_zones(&self) -> Vec<LoadingZone> {
        let mut zones: Vec<_> = self
            .zones
            .read()
            .values()
            .filter(|z| z.active)
            .cloned()
            .collect();
        zones.sort_by(|a, b| a.name.cmp(&b.name));
        zones
    }

    /// Active zones whose center lies within `radius_meters` of `point`,
    /// nearest first.
    pub fn nearby(&self, point: &GeoPoint, radius_meters: f64) -> Vec<NearbyZone> {
        let mut nearby: Vec<_> = self
            .zones
            .read()
            .values()
            .filter(|z| z.active)
            .filter_map(|zone| {
                let distance_meters = zone.distance_to(point);
                (distance_meters <= radius_meters).then(|| NearbyZone {
                    zone: zone.clone(),
                    distance_meters,
                })
            })
            .collect();

        nearby.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
        nearby
    }

    /// Number of zones loaded, active or not.
    pub fn len(&self) -> usize {
        self.zones.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.read().is_empty()
    }
}
