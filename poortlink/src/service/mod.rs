//! Driver-facing queue service.
//!
//! [`QueueService`] ties the zone directory, a [`QueueStore`](crate::queue::QueueStore)
//! and the [`QueueEventChannel`](crate::events::QueueEventChannel) together:
//!
//! ```text
//! driver/marshal ──► QueueService ──► QueueStore (atomic per zone)
//!                         │
//!                         └──► QueueEventChannel ──► subscribers (snapshots)
//! ```
//!
//! Every successful mutation publishes the zone's fresh snapshot. Marshal
//! operations are exposed through [`MarshalControl`](crate::marshal::MarshalControl),
//! which authorizes and then delegates here.

mod config;
mod queue_service;

pub use config::{ServiceConfig, DEFAULT_DISCOVERY_RADIUS_METERS};
pub use queue_service::QueueService;
pub(crate) use queue_service::unauthorized;
