//! Event propagation: channel publishing plus streaming fanout.
//!
//! [`EventBus::publish`] does two things with every [`Envelope`]:
//!
//! 1. Enqueues it on every streaming [`Subscription`] whose declared name
//!    matches the envelope target. Each subscription owns a bounded FIFO
//!    queue; a full queue drops the envelope for that subscriber only.
//! 2. Serializes it and hands it to the [`ChannelPublisher`] for its
//!    named channel (stream-control `QUIT` envelopes skip this step).
//!
//! The subscriber map is guarded by one mutex that is held only to add,
//! remove or snapshot entries, never while pushing into a queue.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::publisher::ChannelPublisher;
use super::{Envelope, EventKind, SubscriberId};
use crate::error::NebulaError;

type SubscriberMap = HashMap<SubscriberId, SubscriberSlot>;

#[derive(Debug)]
struct SubscriberSlot {
    name: String,
    sender: mpsc::Sender<Envelope>,
}

/// Publish/subscribe hub for registry change envelopes.
///
/// Cheap to clone; clones share the publisher and the subscriber set.
#[derive(Debug, Clone)]
pub struct EventBus {
    publisher: Arc<dyn ChannelPublisher>,
    subscribers: Arc<Mutex<SubscriberMap>>,
    queue_capacity: usize,
}

impl EventBus {
    /// Creates a bus publishing through `publisher`, with per-subscriber
    /// queues of `queue_capacity` envelopes.
    #[must_use]
    pub fn new(publisher: Arc<dyn ChannelPublisher>, queue_capacity: usize) -> Self {
        Self {
            publisher,
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Publishes an envelope to matching subscribers and to its channel.
    ///
    /// Returns the number of subscriber queues the envelope was placed on.
    /// Subscriber delivery never fails the call; only the channel publish
    /// can.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::Publish`] if the channel publisher fails and
    /// [`NebulaError::Internal`] if the envelope cannot be serialized.
    pub async fn publish(&self, envelope: Envelope) -> Result<usize, NebulaError> {
        let delivered = self.fan_out(&envelope);

        if let Some(channel) = envelope.channel() {
            let payload = serde_json::to_string(&envelope)
                .map_err(|e| NebulaError::Internal(format!("envelope serialization: {e}")))?;
            self.publisher.publish(channel, &payload).await?;
        }
        Ok(delivered)
    }

    /// Registers a streaming subscriber under `name`.
    ///
    /// The subscription receives every later envelope whose target is
    /// empty or a prefix of `name`, until a matching `QUIT` arrives or the
    /// subscription is dropped.
    #[must_use]
    pub fn subscribe(&self, name: impl Into<String>) -> Subscription {
        let name = name.into();
        let id = SubscriberId::new();
        let (sender, receiver) = mpsc::channel(self.queue_capacity);
        let count = {
            let mut map = self.lock();
            map.insert(
                id,
                SubscriberSlot {
                    name: name.clone(),
                    sender,
                },
            );
            map.len()
        };
        tracing::info!(subscriber = %name, %id, subscribers = count, "stream subscriber connected");
        Subscription {
            id,
            name,
            receiver,
            subscribers: Arc::clone(&self.subscribers),
            finished: false,
        }
    }

    /// Returns the number of registered streaming subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    /// Releases the channel publisher. Call once at shutdown.
    pub async fn close(&self) {
        self.publisher.close().await;
    }

    fn fan_out(&self, envelope: &Envelope) -> usize {
        let is_quit = envelope.kind == EventKind::Quit;
        let targets: Vec<(SubscriberId, String, mpsc::Sender<Envelope>)> = {
            let mut map = self.lock();
            if is_quit {
                // Quitting subscribers leave the map now so no later
                // envelope can be queued behind their QUIT.
                let (leaving, staying): (SubscriberMap, SubscriberMap) = std::mem::take(&mut *map)
                    .into_iter()
                    .partition(|(_, slot)| envelope.is_for(&slot.name));
                *map = staying;
                leaving
                    .into_iter()
                    .map(|(id, slot)| (id, slot.name, slot.sender))
                    .collect()
            } else {
                map.iter()
                    .filter(|(_, slot)| envelope.is_for(&slot.name))
                    .map(|(id, slot)| (*id, slot.name.clone(), slot.sender.clone()))
                    .collect()
            }
        };

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, name, sender) in targets {
            match sender.try_send(envelope.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(subscriber = %name, %id, kind = ?envelope.kind, "subscriber queue full, envelope dropped");
                }
                Err(TrySendError::Closed(_)) => closed.push(id),
            }
        }

        if !closed.is_empty() {
            let mut map = self.lock();
            for id in closed {
                map.remove(&id);
            }
        }
        delivered
    }

    fn lock(&self) -> MutexGuard<'_, SubscriberMap> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// One streaming subscriber's view of the bus.
///
/// Yields envelopes in publish order. The sequence ends after a matching
/// `QUIT` (which is consumed, not yielded) or when the bus drops the
/// subscriber. Dropping the subscription deregisters it.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    name: String,
    receiver: mpsc::Receiver<Envelope>,
    subscribers: Arc<Mutex<SubscriberMap>>,
    finished: bool,
}

impl Subscription {
    /// Subscriber id.
    #[must_use]
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Declared subscriber name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Waits for the next envelope; `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<Envelope> {
        std::future::poll_fn(|cx| self.poll_envelope(cx)).await
    }

    fn poll_envelope(&mut self, cx: &mut Context<'_>) -> Poll<Option<Envelope>> {
        if self.finished {
            return Poll::Ready(None);
        }
        match self.receiver.poll_recv(cx) {
            Poll::Ready(Some(envelope)) if envelope.kind != EventKind::Quit => {
                Poll::Ready(Some(envelope))
            }
            Poll::Ready(_) => {
                self.finished = true;
                self.receiver.close();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Stream for Subscription {
    type Item = Envelope;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Envelope>> {
        self.get_mut().poll_envelope(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let remaining = {
            let mut map = self
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            map.remove(&self.id);
            map.len()
        };
        tracing::info!(subscriber = %self.name, id = %self.id, subscribers = remaining, "stream subscriber closed");
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::publisher::LocalPublisher;
    use crate::domain::{Channel, ServerEntry};
    use futures_util::StreamExt;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    fn make_bus(capacity: usize) -> (EventBus, LocalPublisher) {
        let publisher = LocalPublisher::new(64);
        let bus = EventBus::new(Arc::new(publisher.clone()), capacity);
        (bus, publisher)
    }

    fn sync(name: &str) -> Envelope {
        Envelope::server_sync(ServerEntry::new(name, "127.0.0.1", 25565))
    }

    #[tokio::test]
    async fn publish_without_subscribers_still_hits_channel() {
        let (bus, publisher) = make_bus(8);
        let mut rx = publisher.subscribe();

        let delivered = bus.publish(sync("lobby")).await;
        assert!(matches!(delivered, Ok(0)));

        let Ok(message) = rx.recv().await else {
            panic!("channel message expected");
        };
        assert_eq!(message.channel, Channel::Servers);
        assert!(message.payload.contains("\"lobby\""));
    }

    #[tokio::test]
    async fn broadcast_reaches_all_subscribers_in_order() {
        let (bus, _publisher) = make_bus(8);
        let mut a = bus.subscribe("proxy-1");
        let mut b = bus.subscribe("proxy-2");

        let _ = bus.publish(sync("one")).await;
        let _ = bus.publish(sync("two")).await;

        for sub in [&mut a, &mut b] {
            assert_eq!(sub.recv().await, Some(sync("one")));
            assert_eq!(sub.recv().await, Some(sync("two")));
        }
    }

    #[tokio::test]
    async fn targeted_envelope_skips_other_subscribers() {
        let (bus, _publisher) = make_bus(8);
        let mut p1 = bus.subscribe("proxy-1");
        let mut p2 = bus.subscribe("proxy-2");

        let targeted = Envelope::bungee_command("alert hi").with_target("proxy-1");
        let delivered = bus.publish(targeted.clone()).await;
        assert!(matches!(delivered, Ok(1)));
        let _ = bus.publish(sync("after")).await;

        assert_eq!(p1.recv().await, Some(targeted));
        assert_eq!(p1.recv().await, Some(sync("after")));
        // proxy-2 only sees the broadcast.
        assert_eq!(p2.recv().await, Some(sync("after")));
    }

    #[tokio::test]
    async fn quit_terminates_only_the_target() {
        let (bus, _publisher) = make_bus(8);
        let mut p1 = bus.subscribe("proxy-1");
        let mut p2 = bus.subscribe("proxy-2");

        let _ = bus.publish(sync("before")).await;
        let _ = bus.publish(Envelope::quit(Some("proxy-1".to_string()))).await;
        let _ = bus.publish(sync("after")).await;

        assert_eq!(p1.recv().await, Some(sync("before")));
        assert_eq!(p1.recv().await, None);
        assert_eq!(p1.recv().await, None);

        assert_eq!(p2.recv().await, Some(sync("before")));
        assert_eq!(p2.recv().await, Some(sync("after")));
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn broadcast_quit_ends_every_stream() {
        let (bus, publisher) = make_bus(8);
        let mut rx = publisher.subscribe();
        let a = bus.subscribe("proxy-1");
        let b = bus.subscribe("proxy-2");

        let _ = bus.publish(Envelope::quit(None)).await;

        let collected: Vec<Vec<Envelope>> = vec![a.collect().await, b.collect().await];
        assert!(collected.iter().all(Vec::is_empty));
        assert_eq!(bus.subscriber_count(), 0);
        // QUIT never goes out on a channel.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_queue_drops_for_slow_subscriber_only() {
        let (bus, _publisher) = make_bus(1);
        let mut slow = bus.subscribe("slow");

        let first = bus.publish(sync("one")).await;
        let second = bus.publish(sync("two")).await;
        assert!(matches!(first, Ok(1)));
        assert!(matches!(second, Ok(0)));

        assert_eq!(slow.recv().await, Some(sync("one")));
        let mut next = task::spawn(slow.recv());
        assert_pending!(next.poll());
    }

    #[tokio::test]
    async fn dropping_subscription_deregisters() {
        let (bus, _publisher) = make_bus(8);
        let sub = bus.subscribe("proxy-1");
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(matches!(bus.publish(sync("x")).await, Ok(0)));
    }

    #[tokio::test]
    async fn pending_until_published() {
        let (bus, _publisher) = make_bus(8);
        let mut sub = bus.subscribe("proxy-1");
        {
            let mut next = task::spawn(sub.recv());
            assert_pending!(next.poll());
            let _ = bus.publish(sync("wake")).await;
            assert!(next.is_woken());
            assert_ready_eq!(next.poll(), Some(sync("wake")));
        }
        assert_eq!(sub.name(), "proxy-1");
    }
}
