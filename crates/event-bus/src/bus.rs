//! Named-topic pub/sub (C1, §5 "The event bus is implemented with one
//! `tokio::sync::mpsc` channel per subscription").
//!
//! A `sequential` subscription drains its channel one message at a time off
//! a single consumer task, preserving publish order for that subscription
//! (§5 "Event-bus callbacks" / §9). A `concurrent` subscription spawns a
//! bounded number of handler invocations that may overlap.

use {
    crate::event::{Event, Topic},
    async_trait::async_trait,
    std::{collections::HashMap, sync::Arc},
    tokio::sync::{mpsc, Mutex, Semaphore},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("handler error: {0}")]
    Handler(String),
}

/// How a subscription processes the messages it receives.
#[derive(Debug, Clone, Copy)]
pub enum Dispatch {
    /// One handler invocation at a time, in publish order (§5).
    Sequential,
    /// Handlers may overlap, up to `max_in_flight` concurrent invocations.
    Concurrent { max_in_flight: usize },
}

#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, event: Event) -> Result<(), Error>;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<(), Error>> + Send + 'static,
{
    async fn handle(&self, event: Event) -> Result<(), Error> {
        (self)(event).await
    }
}

/// Channel capacity per subscription. Publish backpressures once a slow
/// subscriber falls this far behind; extraction has a suspension point here
/// by design (§5 "Suspension points").
const CHANNEL_CAPACITY: usize = 1024;

struct Subscription {
    name: &'static str,
    sender: mpsc::Sender<Event>,
}

/// Handle returned by [`EventBus::subscribe`]; dropping or awaiting it joins
/// the consumer task (cooperative shutdown, §5 "Cancellation").
pub struct SubscriptionHandle {
    task: tokio::task::JoinHandle<()>,
}

impl SubscriptionHandle {
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

#[derive(Default)]
pub struct EventBus {
    subscriptions: Mutex<HashMap<Topic, Vec<Subscription>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` on `topic` with the given dispatch discipline.
    /// Returns a handle that can be used to await cooperative shutdown once
    /// the bus stops publishing and the sender side is dropped.
    pub async fn subscribe(
        &self,
        topic: Topic,
        name: &'static str,
        dispatch: Dispatch,
        handler: Arc<dyn Handler>,
    ) -> SubscriptionHandle {
        let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
        self.subscriptions
            .lock()
            .await
            .entry(topic)
            .or_default()
            .push(Subscription { name, sender: tx });

        let task = tokio::spawn(async move {
            match dispatch {
                Dispatch::Sequential => {
                    while let Some(event) = rx.recv().await {
                        if let Err(err) = handler.handle(event).await {
                            tracing::error!(subscription = name, topic = topic.name(), %err, "handler failed");
                        }
                    }
                }
                Dispatch::Concurrent { max_in_flight } => {
                    let semaphore = Arc::new(Semaphore::new(max_in_flight.max(1)));
                    let mut in_flight = Vec::new();
                    while let Some(event) = rx.recv().await {
                        let handler = handler.clone();
                        let semaphore = semaphore.clone();
                        let permit = semaphore.acquire_owned().await.expect("semaphore closed");
                        in_flight.push(tokio::spawn(async move {
                            let _permit = permit;
                            if let Err(err) = handler.handle(event).await {
                                tracing::error!(subscription = name, topic = topic.name(), %err, "handler failed");
                            }
                        }));
                        in_flight.retain(|h| !h.is_finished());
                    }
                    for h in in_flight {
                        let _ = h.await;
                    }
                }
            }
        });

        SubscriptionHandle { task }
    }

    /// Unsubscribes every subscription on `topic` by dropping their
    /// senders; the consumer tasks drain remaining in-flight messages and
    /// return once the channel closes (§4.2.6 "resubscribe only after fork
    /// processing completes", §5 "Cancellation").
    pub async fn unsubscribe_all(&self, topic: Topic) {
        self.subscriptions.lock().await.remove(&topic);
    }

    /// Publishes `event` to every subscription on its topic, in order. Each
    /// per-subscription send is ordered relative to prior publishes to
    /// that same subscription (§5 "Ordering guarantees").
    pub async fn publish(&self, event: Event) {
        let topic = event.topic();
        let subs = self.subscriptions.lock().await;
        if let Some(list) = subs.get(&topic) {
            for sub in list {
                if sub.sender.send(event.clone()).await.is_err() {
                    tracing::warn!(subscription = sub.name, topic = topic.name(), "subscriber gone");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        domain::event::{CutoffAllEvent, EventIndex},
        std::sync::atomic::{AtomicUsize, Ordering},
    };

    fn sample_event() -> Event {
        Event::CutoffAll(CutoffAllEvent {
            index: EventIndex {
                block_number: 1,
                log_index: 0,
            },
            protocol: Default::default(),
            owner: Default::default(),
            cutoff_time: 1,
            tx_hash: Default::default(),
        })
    }

    struct CountingHandler(Arc<AtomicUsize>);

    #[async_trait]
    impl Handler for CountingHandler {
        async fn handle(&self, _event: Event) -> Result<(), Error> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn sequential_subscription_receives_in_order() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let handle = bus
            .subscribe(
                Topic::CutoffAllEvent,
                "test",
                Dispatch::Sequential,
                Arc::new(CountingHandler(count.clone())),
            )
            .await;

        for _ in 0..5 {
            bus.publish(sample_event()).await;
        }
        bus.unsubscribe_all(Topic::CutoffAllEvent).await;
        handle.join().await;

        assert_eq!(count.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn unrelated_topics_do_not_cross_deliver() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let handle = bus
            .subscribe(
                Topic::RingMined,
                "test",
                Dispatch::Sequential,
                Arc::new(CountingHandler(count.clone())),
            )
            .await;

        bus.publish(sample_event()).await;
        bus.unsubscribe_all(Topic::RingMined).await;
        handle.join().await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
