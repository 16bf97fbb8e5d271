//! Subscription layer.
//!
//! Each store owns one [`Notifier`]. Every state change is published as an
//! immutable snapshot; subscribers are called synchronously by the publishing
//! call, and async consumers can follow the same snapshots through a
//! `tokio::sync::watch` receiver.
//!
//! Snapshots carry the store's version. A publish with a version that is not
//! newer than the last accepted one is dropped, so a consumer never observes
//! state going backwards when two mutations finish on different threads.
//!
//! No lock is held while callbacks run. A publish that arrives while another
//! thread (or a callback) is delivering only queues its snapshot; the
//! delivering call picks up the newest queued snapshot when its round ends.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// Handle returned by [`Notifier::subscribe`].
pub type SubscriptionId = u64;

type Callback<V> = Arc<dyn Fn(&Arc<V>) + Send + Sync>;

struct Delivery<V> {
    /// Version of the newest accepted snapshot
    accepted: u64,
    /// Accepted but not yet handed to consumers
    queued: Option<Arc<V>>,
    /// Some call is running a delivery round
    draining: bool,
}

/// Observer list plus watch channel for one store.
pub struct Notifier<V> {
    next_id: AtomicU64,
    subscribers: DashMap<SubscriptionId, Callback<V>>,
    delivery: Mutex<Delivery<V>>,
    channel: watch::Sender<Arc<V>>,
}

/// Releases the delivery round if a callback panics.
struct Draining<'a, V>(&'a Mutex<Delivery<V>>);

impl<V> Drop for Draining<'_, V> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut delivery = self.0.lock().unwrap_or_else(PoisonError::into_inner);
            delivery.draining = false;
            delivery.queued = None;
        }
    }
}

impl<V: Send + Sync + 'static> Notifier<V> {
    /// Create a notifier whose current snapshot is `initial` (version 0).
    pub fn new(initial: V) -> Self {
        let (channel, _) = watch::channel(Arc::new(initial));
        Self {
            next_id: AtomicU64::new(1),
            subscribers: DashMap::new(),
            delivery: Mutex::new(Delivery {
                accepted: 0,
                queued: None,
                draining: false,
            }),
            channel,
        }
    }

    /// Register a callback invoked with every new snapshot.
    ///
    /// Callbacks run on the publishing thread, outside every lock. They may
    /// read the store and may publish again; a nested snapshot is delivered
    /// once the current round of callbacks has finished.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Arc<V>) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.insert(id, Arc::new(callback));
        tracing::debug!(subscription = id, "Subscriber registered");
        id
    }

    /// Remove a callback. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.subscribers.remove(&id).is_some();
        if removed {
            tracing::debug!(subscription = id, "Subscriber removed");
        }
        removed
    }

    /// Receiver that always holds the latest delivered snapshot.
    pub fn watch(&self) -> watch::Receiver<Arc<V>> {
        self.channel.subscribe()
    }

    /// The latest delivered snapshot.
    pub fn latest(&self) -> Arc<V> {
        Arc::clone(&self.channel.borrow())
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver `snapshot` taken at `version` to every consumer.
    ///
    /// Returns false, delivering nothing, if a snapshot at the same or a newer
    /// version was already accepted.
    pub fn publish(&self, version: u64, snapshot: Arc<V>) -> bool {
        {
            let mut delivery = self.lock_delivery();
            if version <= delivery.accepted {
                tracing::trace!(version, accepted = delivery.accepted, "Dropping stale snapshot");
                return false;
            }
            delivery.accepted = version;
            delivery.queued = Some(snapshot);
            if delivery.draining {
                return true;
            }
            delivery.draining = true;
        }
        self.drain();
        true
    }

    fn lock_delivery(&self) -> MutexGuard<'_, Delivery<V>> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand queued snapshots to consumers until the queue is empty.
    fn drain(&self) {
        let _round = Draining(&self.delivery);
        loop {
            let snapshot = {
                let mut delivery = self.lock_delivery();
                match delivery.queued.take() {
                    Some(snapshot) => snapshot,
                    None => {
                        delivery.draining = false;
                        return;
                    }
                }
            };

            self.channel.send_replace(Arc::clone(&snapshot));

            let callbacks: Vec<Callback<V>> = self
                .subscribers
                .iter()
                .map(|entry| Arc::clone(entry.value()))
                .collect();
            for callback in &callbacks {
                callback(&snapshot);
            }
            tracing::trace!(recipients = callbacks.len(), "Published snapshot");
        }
    }
}

impl<V> std::fmt::Debug for Notifier<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("subscribers", &self.subscribers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn subscribe_publish_unsubscribe() {
        let notifier = Notifier::new(0u32);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let id = notifier.subscribe(move |value| sink.lock().unwrap().push(**value));
        assert_eq!(notifier.subscriber_count(), 1);

        assert!(notifier.publish(1, Arc::new(10)));
        assert!(notifier.publish(2, Arc::new(20)));
        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        assert!(notifier.publish(3, Arc::new(30)));

        assert_eq!(*seen.lock().unwrap(), vec![10, 20]);
        assert_eq!(*notifier.latest(), 30);
    }

    #[test]
    fn stale_versions_are_dropped() {
        let notifier = Notifier::new("initial");
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        notifier.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(notifier.publish(5, Arc::new("newer")));
        assert!(!notifier.publish(4, Arc::new("older")));
        assert!(!notifier.publish(5, Arc::new("same")));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*notifier.latest(), "newer");
    }

    #[tokio::test]
    async fn watch_receivers_see_latest() {
        let notifier = Notifier::new(0u32);
        let mut rx = notifier.watch();

        notifier.publish(1, Arc::new(7));
        rx.changed().await.unwrap();
        assert_eq!(**rx.borrow_and_update(), 7);
    }

    #[test]
    fn callbacks_may_publish_again() {
        let notifier = Arc::new(Notifier::new(0u32));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let inner = Arc::clone(&notifier);
        let sink = Arc::clone(&seen);
        notifier.subscribe(move |value| {
            sink.lock().unwrap().push(**value);
            if **value == 1 {
                assert!(inner.publish(2, Arc::new(2)));
                assert!(!inner.publish(2, Arc::new(99)));
            }
        });

        assert!(notifier.publish(1, Arc::new(1)));
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
        assert_eq!(*notifier.latest(), 2);
    }

    #[test]
    fn callbacks_can_read_latest() {
        let notifier = Arc::new(Notifier::new(0u32));
        let observed = Arc::new(AtomicUsize::new(0));

        let inner = Arc::clone(&notifier);
        let sink = Arc::clone(&observed);
        notifier.subscribe(move |_| {
            sink.store(*inner.latest() as usize, Ordering::SeqCst);
        });

        notifier.publish(1, Arc::new(42));
        assert_eq!(observed.load(Ordering::SeqCst), 42);
    }
}
