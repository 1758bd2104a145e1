//! Marshal control surface.

use std::sync::Arc;

use tracing::info;

use super::actor::Actor;
use crate::error::QueueResult;
use crate::queue::{EntryId, EntryStatus, QueueAction, QueueEntry};
use crate::service::{unauthorized, QueueService};
use crate::zone::ZoneId;

/// Queue control for marshals and admins.
///
/// Each operation checks that the actor controls the entry's zone and then
/// delegates to the store through [`QueueService`]; an unauthorized call
/// mutates nothing. Status and ordering rules are the store's.
#[derive(Debug, Clone)]
pub struct MarshalControl {
    service: Arc<QueueService>,
}

impl MarshalControl {
    pub fn new(service: Arc<QueueService>) -> Self {
        Self { service }
    }

    /// Call the front waiting entry forward.
    pub async fn start_loading(
        &self,
        actor: &Actor,
        entry_id: EntryId,
    ) -> QueueResult<QueueEntry> {
        self.authorize(actor, entry_id, QueueAction::StartLoading).await?;
        let entry = self.service.start_loading(entry_id).await?;
        info!(actor = %actor, zone_id = %entry.zone_id, entry_id = %entry.id, "Loading started");
        Ok(entry)
    }

    pub async fn mark_departed(
        &self,
        actor: &Actor,
        entry_id: EntryId,
    ) -> QueueResult<QueueEntry> {
        self.authorize(actor, entry_id, QueueAction::MarkDeparted).await?;
        let entry = self.service.mark_departed(entry_id).await?;
        info!(actor = %actor, zone_id = %entry.zone_id, entry_id = %entry.id, "Marked departed");
        Ok(entry)
    }

    /// Send a waiting driver to the back of the queue.
    pub async fn skip_driver(
        &self,
        actor: &Actor,
        entry_id: EntryId,
        reason: Option<String>,
    ) -> QueueResult<QueueEntry> {
        self.authorize(actor, entry_id, QueueAction::Skip).await?;
        let entry = self.service.skip(entry_id, reason).await?;
        info!(
            actor = %actor,
            zone_id = %entry.zone_id,
            entry_id = %entry.id,
            position = entry.position,
            skip_count = entry.skip_count,
            "Driver skipped"
        );
        Ok(entry)
    }

    pub async fn remove_from_queue(
        &self,
        actor: &Actor,
        entry_id: EntryId,
        reason: Option<String>,
    ) -> QueueResult<QueueEntry> {
        self.authorize(actor, entry_id, QueueAction::Remove).await?;
        let entry = self.service.remove(entry_id, reason).await?;
        info!(actor = %actor, zone_id = %entry.zone_id, entry_id = %entry.id, "Driver removed");
        Ok(entry)
    }

    /// Start loading whichever waiting entry is at the front of the zone.
    ///
    /// Returns `None` when nobody is waiting.
    pub async fn advance_front(
        &self,
        actor: &Actor,
        zone_id: &ZoneId,
    ) -> QueueResult<Option<QueueEntry>> {
        if !actor.can_marshal(zone_id) {
            return Err(unauthorized(actor, QueueAction::StartLoading, zone_id));
        }

        let snapshot = self.service.snapshot(zone_id).await?;
        let Some(front) = snapshot
            .entries
            .iter()
            .find(|e| e.status == EntryStatus::Waiting)
        else {
            return Ok(None);
        };

        self.start_loading(actor, front.id).await.map(Some)
    }

    async fn authorize(
        &self,
        actor: &Actor,
        entry_id: EntryId,
        action: QueueAction,
    ) -> QueueResult<()> {
        let entry = self.service.entry(entry_id).await?;
        if actor.can_marshal(&entry.zone_id) {
            Ok(())
        } else {
            Err(unauthorized(actor, action, &entry.zone_id))
        }
    }
}
