/*
[INPUT]:  Channel registrations per category, decoded WsEvents
[OUTPUT]: Bounded per-subscriber channels and time-bounded fan-out
[POS]:    WebSocket layer - subscriber bookkeeping and delivery
[UPDATE]: When changing delivery semantics or channel lifecycle
*/

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, error};

use crate::ws::message::{Category, WsEvent};

/// Identifies one registered channel
pub type SubscriberId = u64;

#[derive(Debug)]
struct Subscriber {
    id: SubscriberId,
    tx: mpsc::Sender<WsEvent>,
}

/// Receive-only handle for events of a single category.
///
/// Dropping it, or removing it from the registry, closes the channel.
#[derive(Debug)]
pub struct EventReceiver {
    id: SubscriberId,
    category: Category,
    rx: mpsc::Receiver<WsEvent>,
}

impl EventReceiver {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Wait for the next event. `None` once the channel was removed and drained.
    pub async fn recv(&mut self) -> Option<WsEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Result<WsEvent, TryRecvError> {
        self.rx.try_recv()
    }

    pub fn into_inner(self) -> mpsc::Receiver<WsEvent> {
        self.rx
    }
}

/// Category to channel-list mapping.
///
/// Every channel registered under a category receives every event of that
/// category. Mutations take the write lock; fan-out only holds the read lock
/// long enough to clone the senders.
#[derive(Debug)]
pub struct SubscriptionRegistry {
    capacity: usize,
    next_id: AtomicU64,
    channels: RwLock<HashMap<Category, Vec<Subscriber>>>,
}

impl SubscriptionRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            next_id: AtomicU64::new(1),
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Create a bounded channel for `category` and append it to the list.
    pub fn new_channel(&self, category: Category) -> EventReceiver {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut channels = self
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let subscribers = channels.entry(category).or_default();
        subscribers.retain(|subscriber| !subscriber.tx.is_closed());
        subscribers.push(Subscriber { id, tx });
        debug!(
            subscriber_id = id,
            category = %category,
            subscribers = subscribers.len(),
            "ws channel registered"
        );

        EventReceiver { id, category, rx }
    }

    /// Remove a channel and close it. Returns `false` if the id is unknown.
    pub fn remove(&self, id: SubscriberId) -> bool {
        let mut channels = self
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for (category, subscribers) in channels.iter_mut() {
            if let Some(index) = subscribers.iter().position(|subscriber| subscriber.id == id) {
                subscribers.remove(index);
                debug!(subscriber_id = id, category = %category, "ws channel removed");
                return true;
            }
        }
        false
    }

    pub fn remove_channel(&self, receiver: &EventReceiver) -> bool {
        self.remove(receiver.id)
    }

    /// Open channels currently registered under `category`
    pub fn subscriber_count(&self, category: Category) -> usize {
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        channels.get(&category).map_or(0, |subscribers| {
            subscribers
                .iter()
                .filter(|subscriber| !subscriber.tx.is_closed())
                .count()
        })
    }

    /// Deliver `event` to every open channel of its category.
    ///
    /// Each send runs in its own task bounded by `timeout`; a send that
    /// misses the deadline is dropped and logged. Returns the number of
    /// deliveries scheduled.
    pub fn fan_out(&self, event: WsEvent, timeout: Duration) -> usize {
        let category = event.category();
        let senders = self.snapshot(category);
        if senders.is_empty() {
            debug!(category = %category, "ws event has no subscribers");
            return 0;
        }

        let scheduled = senders.len();
        for (subscriber_id, tx) in senders {
            let event = event.clone();
            tokio::spawn(async move {
                match tokio::time::timeout(timeout, tx.send(event)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(_)) => {
                        debug!(subscriber_id, category = %category, "ws receiver dropped");
                    }
                    Err(_) => {
                        error!(
                            subscriber_id,
                            category = %category,
                            timeout_ms = timeout.as_millis() as u64,
                            "ws event delivery timed out"
                        );
                    }
                }
            });
        }
        scheduled
    }

    fn snapshot(&self, category: Category) -> Vec<(SubscriberId, mpsc::Sender<WsEvent>)> {
        let channels = self.channels.read().unwrap_or_else(PoisonError::into_inner);
        channels
            .get(&category)
            .map(|subscribers| {
                subscribers
                    .iter()
                    .filter(|subscriber| !subscriber.tx.is_closed())
                    .map(|subscriber| (subscriber.id, subscriber.tx.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}
