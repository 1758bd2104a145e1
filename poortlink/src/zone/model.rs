//! Loading zone data types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geo::{distance_meters, is_within_radius, validate_radius, GeoError, GeoPoint};

/// Opaque zone identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(String);

impl ZoneId {
    /// Wrap a zone identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ZoneId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// What kind of place a loading zone is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ZoneKind {
    Station,
    Mall,
    Hospital,
    Rank,
    #[default]
    Other,
}

impl ZoneKind {
    /// Parse a kind case-insensitively. Unknown names map to [`ZoneKind::Other`].
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "station" => ZoneKind::Station,
            "mall" => ZoneKind::Mall,
            "hospital" => ZoneKind::Hospital,
            "rank" | "taxi_rank" => ZoneKind::Rank,
            _ => ZoneKind::Other,
        }
    }

    /// Lowercase display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneKind::Station => "station",
            ZoneKind::Mall => "mall",
            ZoneKind::Hospital => "hospital",
            ZoneKind::Rank => "rank",
            ZoneKind::Other => "other",
        }
    }
}

impl From<String> for ZoneKind {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A physical loading location with a circular geofence.
///
/// Zones are administered out-of-band; the queue core only reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadingZone {
    pub id: ZoneId,
    pub name: String,
    #[serde(default)]
    pub kind: ZoneKind,
    pub center: GeoPoint,
    pub radius_meters: f64,
    #[serde(default)]
    pub municipality: Option<String>,
    #[serde(default)]
    pub ward: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub has_marshal: bool,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl LoadingZone {
    /// Create an active, unmarshaled zone with the given geofence.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: ZoneKind,
        center: GeoPoint,
        radius_meters: f64,
    ) -> Result<Self, GeoError> {
        Ok(Self {
            id: ZoneId::new(id),
            name: name.into(),
            kind,
            center,
            radius_meters: validate_radius(radius_meters)?,
            municipality: None,
            ward: None,
            address: None,
            has_marshal: false,
            active: true,
        })
    }

    /// Set whether a marshal manages this zone.
    pub fn with_marshal(mut self, has_marshal: bool) -> Self {
        self.has_marshal = has_marshal;
        self
    }

    /// Set the active flag.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Set the street address.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Distance from the zone center to `point`.
    pub fn distance_to(&self, point: &GeoPoint) -> f64 {
        distance_meters(&self.center, point)
    }

    /// Zone-membership test; the boundary counts as inside.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        is_within_radius(&self.center, self.radius_meters, point)
    }

    /// Check the radius of a zone that arrived from an external source.
    pub(crate) fn validate(&self) -> Result<(), GeoError> {
        validate_radius(self.radius_meters).map(|_| ())
    }
}

/// A zone annotated with its distance from a query point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyZone {
    pub zone: LoadingZone,
    pub distance_meters: f64,
}

impl NearbyZone {
    /// Whether the query point was inside this zone's geofence.
    pub fn is_inside(&self) -> bool {
        self.distance_meters <= self.zone.radius_meters
    }
}
