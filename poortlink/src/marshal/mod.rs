//! Marshal control surface and actor roles.
//!
//! Callers identify themselves with an explicit [`Actor`] on every call.
//! [`MarshalControl`] adds authorization on top of the queue operations and
//! nothing else: only a zone's marshals and admins may change its queue.

mod actor;
mod control;

pub use actor::{Actor, Role};
pub use control::MarshalControl;
