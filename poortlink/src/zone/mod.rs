//! Loading zones and the zone directory.
//!
//! A loading zone is a taxi rank, mall, station or hospital pick-up point
//! with a GPS center and a radius. The [`ZoneDirectory`] keeps the current
//! set in memory and answers "which zone is this" and "what is near me".
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use poortlink::zone::{JsonZoneFile, ZoneDirectory};
//!
//! let directory = ZoneDirectory::load(Arc::new(JsonZoneFile::new("zones.json"))).await?;
//! for nearby in directory.nearby(&here, 500.0) {
//!     println!("{} ({:.0} m)", nearby.zone.name, nearby.distance_meters);
//! }
//! ```

mod directory;
mod model;
mod source;

pub use directory::ZoneDirectory;
pub use model::{LoadingZone, NearbyZone, ZoneId, ZoneKind};
pub use source::{JsonZoneFile, StaticZoneSource, ZoneSource, ZoneSourceError};
