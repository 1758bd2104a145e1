//! Authenticated actors and their roles.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::queue::DriverId;
use crate::zone::ZoneId;

/// What an actor is allowed to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "role")]
pub enum Role {
    /// Joins and leaves queues for themself.
    Driver,
    /// Controls the queues of the listed zones.
    Marshal { zones: BTreeSet<ZoneId> },
    /// Controls every zone.
    Admin,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Role::Driver => "driver",
            Role::Marshal { .. } => "marshal",
            Role::Admin => "admin",
        }
    }
}

/// An identity vouched for by the identity provider, with its role.
///
/// Passed explicitly to every operation; nothing reads a "current user".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    #[serde(flatten)]
    pub role: Role,
}

impl Actor {
    pub fn driver(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Driver,
        }
    }

    pub fn marshal<I>(id: impl Into<String>, zones: I) -> Self
    where
        I: IntoIterator<Item = ZoneId>,
    {
        Self {
            id: id.into(),
            role: Role::Marshal {
                zones: zones.into_iter().collect(),
            },
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Admin,
        }
    }

    /// The actor's identity as a queue participant.
    pub fn driver_id(&self) -> DriverId {
        DriverId::new(self.id.clone())
    }

    /// Only drivers hold queue entries.
    pub fn can_queue(&self) -> bool {
        matches!(self.role, Role::Driver)
    }

    /// Admins anywhere, marshals only in their own zones.
    pub fn can_marshal(&self, zone_id: &ZoneId) -> bool {
        match &self.role {
            Role::Admin => true,
            Role::Marshal { zones } => zones.contains(zone_id),
            Role::Driver => false,
        }
    }

    /// Whether the actor may act on an entry held by `driver_id` in `zone_id`.
    pub fn owns_or_marshals(&self, driver_id: &DriverId, zone_id: &ZoneId) -> bool {
        (self.can_queue() && self.id == driver_id.as_str()) || self.can_marshal(zone_id)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.role.name(), self.id)
    }
}
