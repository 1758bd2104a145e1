//! Zone queue store.
//!
//! A first-come-first-served virtual queue per loading zone. Drivers join
//! when their GPS puts them inside the zone's geofence, receive the next
//! tail position, and are called forward by a marshal in position order.
//!
//! # Components
//!
//! - [`validate_transition`] - the entry state machine, the single place
//!   where status legality is decided
//! - [`QueueStore`] - async store interface (the only thing that mutates entries)
//! - [`InMemoryQueueStore`] - per-zone locked implementation
//! - [`QueueSnapshot`] - full active queue of one zone, as pushed to subscribers
//!
//! # Ordering
//!
//! Positions are append-only: joins and skips always take the current tail
//! (`highest position ever assigned + 1`). Positions are never compacted or
//! reused, so gaps are normal after departures.

mod memory;
mod model;
mod state;
mod store;

pub use memory::InMemoryQueueStore;
pub use model::{
    DriverId, EntryId, JoinRequest, LocationUpdate, QueueEntry, QueueSnapshot, VehicleRef,
};
pub use state::{validate_transition, EntryStatus, QueueAction};
pub use store::QueueStore;
