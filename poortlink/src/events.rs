//! Queue event channel - per-zone snapshot fan-out.
//!
//! Every successful mutation of a zone's queue publishes the zone's full
//! [`QueueSnapshot`] to that zone's topic. Driver apps and marshal
//! dashboards subscribe per zone instead of polling.
//!
//! # Delivery Model
//!
//! - **Snapshots, not deltas**: a receiver that falls behind simply skips to a
//!   newer snapshot, nothing is lost by dropping intermediates.
//! - **Revision ordered**: snapshots older than the last one seen are
//!   discarded, so out-of-order publishes never roll a view back.
//! - **Eventually consistent**: a subscriber may briefly see a stale queue.
//!   A (re)connecting subscriber must fetch a fresh snapshot first; missed
//!   events are not replayed. [`QueueService::subscribe`](crate::service::QueueService::subscribe)
//!   does both steps in the right order.
//!
//! # Resource Release
//!
//! Topics are created on first subscribe and removed when their last
//! [`ZoneSubscription`] is dropped or passed to
//! [`unsubscribe`](QueueEventChannel::unsubscribe), so navigating between
//! zones never accumulates dead channels.
//!
//! ```ignore
//! let channel = QueueEventChannel::new(16);
//! let mut subscription = channel.subscribe(&zone_id);
//!
//! while let Some(snapshot) = subscription.next().await {
//!     render(&snapshot);
//! }
//! ```

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use futures::Stream;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, trace};

use crate::queue::QueueSnapshot;
use crate::zone::ZoneId;

/// Default per-topic buffer, in snapshots.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

type Topics = DashMap<ZoneId, broadcast::Sender<QueueSnapshot>>;

/// Publish/subscribe hub for queue snapshots, one topic per zone.
///
/// Cheap to clone; clones share the same topics.
#[derive(Clone)]
pub struct QueueEventChannel {
    topics: Arc<Topics>,
    capacity: usize,
}

impl std::fmt::Debug for QueueEventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueEventChannel")
            .field("topics", &self.topics.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl Default for QueueEventChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl QueueEventChannel {
    /// Create a channel whose topics buffer up to `capacity` snapshots.
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Push a snapshot to every subscriber of `zone_id`.
    ///
    /// Returns the number of subscribers it was queued for; zero when the
    /// zone has no topic.
    pub fn publish(&self, zone_id: &ZoneId, snapshot: QueueSnapshot) -> usize {
        let Some(sender) = self.topics.get(zone_id) else {
            trace!(zone_id = %zone_id, "No subscribers, snapshot not published");
            return 0;
        };

        let revision = snapshot.revision;
        let delivered = sender.send(snapshot).unwrap_or(0);
        debug!(zone_id = %zone_id, revision, subscribers = delivered, "Queue snapshot published");
        delivered
    }

    /// Subscribe to a zone's snapshots, creating the topic if needed.
    pub fn subscribe(&self, zone_id: &ZoneId) -> ZoneSubscription {
        let receiver = self
            .topics
            .entry(zone_id.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        debug!(zone_id = %zone_id, "Zone subscription opened");

        ZoneSubscription {
            zone_id: zone_id.clone(),
            receiver: Some(receiver),
            topics: Arc::downgrade(&self.topics),
            last_revision: None,
        }
    }

    /// Stop delivery to `subscription` and release its topic if unused.
    ///
    /// Equivalent to dropping the subscription.
    pub fn unsubscribe(&self, subscription: ZoneSubscription) {
        drop(subscription);
    }

    /// Number of zones with at least one live topic.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Live subscribers for a zone.
    pub fn subscriber_count(&self, zone_id: &ZoneId) -> usize {
        self.topics
            .get(zone_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

/// A live subscription to one zone's snapshots.
///
/// Dropping it stops delivery and releases the topic when it was the last one.
pub struct ZoneSubscription {
    zone_id: ZoneId,
    receiver: Option<broadcast::Receiver<QueueSnapshot>>,
    // Weak so a dropped channel closes its subscriptions
    topics: Weak<Topics>,
    last_revision: Option<u64>,
}

impl std::fmt::Debug for ZoneSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneSubscription")
            .field("zone_id", &self.zone_id)
            .field("last_revision", &self.last_revision)
            .finish_non_exhaustive()
    }
}

impl ZoneSubscription {
    /// Zone this subscription listens to.
    pub fn zone_id(&self) -> &ZoneId {
        &self.zone_id
    }

    /// Revision of the newest snapshot delivered (or seeded).
    pub fn last_revision(&self) -> Option<u64> {
        self.last_revision
    }

    /// Treat `revision` as already seen; older or equal pushes are skipped.
    ///
    /// Used after fetching a fresh snapshot on (re)connect.
    pub fn seed_revision(&mut self, revision: u64) {
        self.last_revision = Some(self.last_revision.map_or(revision, |r| r.max(revision)));
    }

    /// Wait for the next newer snapshot.
    ///
    /// Returns `None` once the channel is gone.
    pub async fn next(&mut self) -> Option<QueueSnapshot> {
        loop {
            let result = self.receiver.as_mut()?.recv().await;
            match result {
                Ok(snapshot) => {
                    if let Some(snapshot) = self.accept(snapshot) {
                        return Some(snapshot);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(zone_id = %self.zone_id, skipped, "Subscriber lagged, skipping ahead");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next newer snapshot if one is already buffered.
    pub fn try_next(&mut self) -> Option<QueueSnapshot> {
        loop {
            let result = self.receiver.as_mut()?.try_recv();
            match result {
                Ok(snapshot) => {
                    if let Some(snapshot) = self.accept(snapshot) {
                        return Some(snapshot);
                    }
                }
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Convert into a `Stream` of snapshots.
    pub fn into_stream(self) -> impl Stream<Item = QueueSnapshot> + Send {
        futures::stream::unfold(self, |mut subscription| async move {
            let snapshot = subscription.next().await?;
            Some((snapshot, subscription))
        })
    }

    fn accept(&mut self, snapshot: QueueSnapshot) -> Option<QueueSnapshot> {
        if self.last_revision.is_some_and(|seen| snapshot.revision <= seen) {
            trace!(
                zone_id = %self.zone_id,
                revision = snapshot.revision,
                "Discarding stale snapshot"
            );
            return None;
        }
        self.last_revision = Some(snapshot.revision);
        Some(snapshot)
    }
}

impl Drop for ZoneSubscription {
    fn drop(&mut self) {
        // Receiver must go first so the count below no longer includes it
        drop(self.receiver.take());
        let released = self.topics.upgrade().is_some_and(|topics| {
            topics
                .remove_if(&self.zone_id, |_, sender| sender.receiver_count() == 0)
                .is_some()
        });
        debug!(zone_id = %self.zone_id, released, "Zone subscription closed");
    }
}
