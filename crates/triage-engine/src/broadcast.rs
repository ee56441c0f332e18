//! # Broadcast Hub
//!
//! Fan-out of registry snapshots to live stream subscribers.
//!
//! Each subscriber owns a bounded channel. Delivery uses `try_send`, so the
//! hub never waits on a viewer: a closed channel (viewer gone) or a full one
//! (viewer stopped reading) counts as a failed send and the subscriber is
//! dropped. Other subscribers are unaffected.
//!
//! Lock order: the hub lock may be taken while calling into the patient
//! registry (see [`BroadcastHub::connect`]), never the other way round.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::patient::Snapshot;

/// Identifier of one stream subscriber
pub type SubscriberId = u64;

/// Receiving side handed to a stream handler
pub struct Subscription {
    pub id: SubscriberId,
    pub receiver: mpsc::Receiver<Snapshot>,
}

/// Result of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub dropped: usize,
}

/// Tracks live subscribers and pushes snapshots to them
pub struct BroadcastHub {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<Snapshot>>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl BroadcastHub {
    /// Create a hub; `buffer` is the number of undelivered snapshots a
    /// subscriber may lag behind before it is dropped.
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    /// Admit a subscriber. `current` is evaluated while the hub is locked,
    /// so no broadcast can slip between the initial snapshot and admission.
    pub fn connect(&self, current: impl FnOnce() -> Snapshot) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.buffer);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut subscribers = self.subscribers.lock();
        // fresh channel with capacity >= 1, cannot be full
        let _ = sender.try_send(current());
        subscribers.insert(id, sender);
        let total = subscribers.len();
        drop(subscribers);

        info!("📡 Subscriber {} connected ({} active)", id, total);
        Subscription { id, receiver }
    }

    /// Remove a subscriber. Returns whether it was still registered.
    pub fn disconnect(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers.lock().remove(&id).is_some();
        if removed {
            info!("🔌 Subscriber {} disconnected", id);
        }
        removed
    }

    /// Push a snapshot to every subscriber, pruning the ones whose send fails.
    pub fn broadcast(&self, snapshot: &Snapshot) -> Delivery {
        let mut delivery = Delivery::default();

        self.subscribers.lock().retain(|id, sender| match sender.try_send(snapshot.clone()) {
            Ok(()) => {
                delivery.delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!("Subscriber {} is not keeping up, dropping it", id);
                delivery.dropped += 1;
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Subscriber {} went away", id);
                delivery.dropped += 1;
                false
            }
        });

        delivery
    }

    /// Drop every subscriber; their receivers observe end-of-stream.
    pub fn close_all(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        let count = subscribers.len();
        subscribers.clear();
        count
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn is_connected(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().contains_key(&id)
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::{PatientRecord, VitalSigns};
    use std::sync::Arc;

    fn snapshot(tick: u64) -> Snapshot {
        Snapshot {
            tick,
            patients: Arc::new(vec![PatientRecord::new("p", "P", VitalSigns::default())]),
        }
    }

    #[tokio::test]
    async fn test_connect_sends_current_snapshot_first() {
        let hub = BroadcastHub::new(4);
        let mut sub = hub.connect(|| snapshot(7));
        let first = sub.receiver.recv().await.unwrap();
        assert_eq!(first.tick, 7);
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_everyone() {
        let hub = BroadcastHub::new(4);
        let mut a = hub.connect(|| snapshot(0));
        let mut b = hub.connect(|| snapshot(0));

        let delivery = hub.broadcast(&snapshot(1));
        assert_eq!(delivery, Delivery { delivered: 2, dropped: 0 });

        for sub in [&mut a, &mut b] {
            assert_eq!(sub.receiver.recv().await.unwrap().tick, 0);
            assert_eq!(sub.receiver.recv().await.unwrap().tick, 1);
        }
    }

    #[tokio::test]
    async fn test_failed_subscriber_is_pruned_without_affecting_others() {
        let hub = BroadcastHub::new(4);
        let broken = hub.connect(|| snapshot(0));
        let mut healthy = hub.connect(|| snapshot(0));
        let broken_id = broken.id;
        drop(broken);

        let delivery = hub.broadcast(&snapshot(1));
        assert_eq!(delivery, Delivery { delivered: 1, dropped: 1 });
        assert!(!hub.is_connected(broken_id));

        let delivery = hub.broadcast(&snapshot(2));
        assert_eq!(delivery, Delivery { delivered: 1, dropped: 0 });

        let ticks: Vec<u64> = [
            healthy.receiver.recv().await.unwrap().tick,
            healthy.receiver.recv().await.unwrap().tick,
            healthy.receiver.recv().await.unwrap().tick,
        ]
        .to_vec();
        assert_eq!(ticks, vec![0, 1, 2]);
    }

    #[test]
    fn test_lagging_subscriber_is_dropped() {
        let hub = BroadcastHub::new(2);
        let _stalled = hub.connect(|| snapshot(0));
        assert_eq!(hub.broadcast(&snapshot(1)).delivered, 1);
        // buffer of 2 is now full
        assert_eq!(hub.broadcast(&snapshot(2)), Delivery { delivered: 0, dropped: 1 });
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let hub = BroadcastHub::default();
        let sub = hub.connect(|| snapshot(0));
        assert!(hub.disconnect(sub.id));
        assert!(!hub.disconnect(sub.id));
        assert_eq!(hub.broadcast(&snapshot(1)), Delivery::default());
    }

    #[tokio::test]
    async fn test_close_all_ends_streams() {
        let hub = BroadcastHub::default();
        let mut sub = hub.connect(|| snapshot(0));
        assert_eq!(hub.close_all(), 1);
        assert_eq!(sub.receiver.recv().await.unwrap().tick, 0);
        assert!(sub.receiver.recv().await.is_none());
    }
}
