//! Topic-keyed publish/subscribe bus.

use futures_util::Stream;
use herald_types::{LifecycleEvent, Topic};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use uuid::Uuid;

type EventSender = mpsc::UnboundedSender<Arc<LifecycleEvent>>;

/// Live channels: topic -> subscription id -> sender.
type Registry = HashMap<Topic, HashMap<Uuid, EventSender>>;

#[derive(Default)]
struct BusInner {
    registry: Mutex<Registry>,
    events_published: AtomicU64,
}

impl BusInner {
    /// Locks the registry.
    ///
    /// A poisoned lock is recovered: every critical section leaves the map
    /// structurally valid, so the worst case is a sender whose receiver is
    /// already gone, which `publish` prunes.
    fn lock(&self) -> MutexGuard<'_, Registry> {
        match self.registry.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("bus registry lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn remove(&self, topic: Topic, id: Uuid) -> bool {
        let mut registry = self.lock();
        let Some(listeners) = registry.get_mut(&topic) else {
            return false;
        };
        let removed = listeners.remove(&id).is_some();
        if listeners.is_empty() {
            registry.remove(&topic);
        }
        removed
    }
}

/// In-process event bus.
///
/// Cloning is cheap and every clone shares the same registry. Build one bus
/// at startup and pass it to whatever publishes or subscribes.
///
/// `subscribe`, `unsubscribe`, and the fan-out step of `publish` all run
/// under one registry lock. A publish therefore reaches exactly the channels
/// registered when it takes the lock: a concurrent subscriber either gets the
/// whole event or none of it, and two publishes to one topic reach every
/// shared subscriber in the same order.
#[derive(Clone, Default)]
pub struct Bus {
    inner: Arc<BusInner>,
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new channel under `topic`.
    ///
    /// The channel only sees events published after this call returns.
    pub fn subscribe(&self, topic: Topic) -> Subscription {
        let id = Uuid::new_v4();
        let (sender, receiver) = mpsc::unbounded_channel();

        self.inner
            .lock()
            .entry(topic)
            .or_default()
            .insert(id, sender);

        tracing::info!(%topic, subscription = %id, "subscription opened");

        Subscription {
            id,
            topic,
            receiver,
            bus: Arc::downgrade(&self.inner),
            closed: false,
        }
    }

    /// Appends `event` to every channel registered under its topic.
    ///
    /// Returns once every channel has the event queued; never waits on a
    /// consumer. Returns the number of channels reached, which is zero when
    /// nobody is listening.
    pub fn publish(&self, event: LifecycleEvent) -> usize {
        let topic = event.topic();
        let kind = event.kind();
        let event = Arc::new(event);

        self.inner.events_published.fetch_add(1, Ordering::Relaxed);

        let mut registry = self.inner.lock();
        let Some(listeners) = registry.get_mut(&topic) else {
            tracing::debug!(%topic, %kind, "no subscribers, event dropped");
            return 0;
        };

        // A failed send means the receiver was dropped without unregistering.
        listeners.retain(|id, sender| match sender.send(Arc::clone(&event)) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(%topic, subscription = %id, "pruning dead subscriber");
                false
            }
        });

        let delivered = listeners.len();
        if delivered == 0 {
            registry.remove(&topic);
        }

        tracing::debug!(%topic, %kind, receivers = delivered, "event published");
        delivered
    }

    /// Removes `subscription` from its topic.
    ///
    /// Equivalent to [`Subscription::close`]; idempotent.
    pub fn unsubscribe(&self, subscription: &mut Subscription) {
        self.inner.remove(subscription.topic, subscription.id);
        subscription.close();
    }

    /// Number of live channels registered under `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.inner.lock().get(&topic).map_or(0, HashMap::len)
    }

    /// Number of topics with at least one live channel.
    pub fn topic_count(&self) -> usize {
        self.inner.lock().len()
    }

    /// Live channel counts for every active topic.
    pub fn topics(&self) -> Vec<(Topic, usize)> {
        self.inner
            .lock()
            .iter()
            .map(|(topic, listeners)| (*topic, listeners.len()))
            .collect()
    }

    /// Total number of `publish` calls, including those nobody heard.
    pub fn events_published(&self) -> u64 {
        self.inner.events_published.load(Ordering::Relaxed)
    }
}

/// One subscriber's ordered queue of events for a single topic.
///
/// Events arrive in exactly the order they were published to the topic.
/// The subscription is also a [`Stream`], ending once it is closed.
///
/// Closing is idempotent and immediate: the channel is unregistered from the
/// bus and anything still queued is discarded. Dropping a subscription
/// closes it.
pub struct Subscription {
    id: Uuid,
    topic: Topic,
    receiver: mpsc::UnboundedReceiver<Arc<LifecycleEvent>>,
    bus: Weak<BusInner>,
    closed: bool,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Waits for the next event. Returns `None` once closed.
    pub async fn recv(&mut self) -> Option<Arc<LifecycleEvent>> {
        if self.closed {
            return None;
        }
        self.receiver.recv().await
    }

    /// Returns the next queued event without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<LifecycleEvent>> {
        if self.closed {
            return None;
        }
        self.receiver.try_recv().ok()
    }

    /// Unregisters this channel and stops delivery.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        // Unregister before closing the receiver so an in-flight publish never
        // sees a dead sender for a channel that is merely shutting down.
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.topic, self.id);
        }
        self.receiver.close();
        while self.receiver.try_recv().is_ok() {}

        tracing::info!(topic = %self.topic, subscription = %self.id, "subscription closed");
    }
}

impl Stream for Subscription {
    type Item = Arc<LifecycleEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.closed {
            return Poll::Ready(None);
        }
        this.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("closed", &self.closed)
            .finish()
    }
}
