//! Fire-and-forget channel publishing.
//!
//! A [`ChannelPublisher`] pushes serialized envelopes onto named pub/sub
//! channels. Publishing never waits for listeners. The publisher is an
//! explicitly constructed client: build it once at startup, hand it to the
//! [`super::EventBus`], and call [`ChannelPublisher::close`] at shutdown.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::{RwLock, broadcast};

use super::Channel;
use crate::error::NebulaError;

/// Publishes serialized envelopes on named channels.
#[async_trait]
pub trait ChannelPublisher: Send + Sync + std::fmt::Debug {
    /// Publishes `payload` on `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::Publish`] if the message could not be handed
    /// to the pub/sub backend.
    async fn publish(&self, channel: Channel, payload: &str) -> Result<(), NebulaError>;

    /// Releases the backend connection. Later publishes fail.
    async fn close(&self);
}

/// A message published on an in-process channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    /// Channel the payload was published on.
    pub channel: Channel,
    /// Serialized envelope.
    pub payload: String,
}

/// In-process publisher backed by a [`tokio::sync::broadcast`] ring.
///
/// Used when no external pub/sub is configured, and in tests. When the
/// ring is full the oldest messages are dropped for lagging receivers.
#[derive(Debug, Clone)]
pub struct LocalPublisher {
    sender: broadcast::Sender<ChannelMessage>,
}

impl LocalPublisher {
    /// Creates a publisher with the given ring capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Creates a receiver for all future messages on every channel.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelMessage> {
        self.sender.subscribe()
    }

    /// Returns the current number of in-process listeners.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl ChannelPublisher for LocalPublisher {
    async fn publish(&self, channel: Channel, payload: &str) -> Result<(), NebulaError> {
        // No listeners is not an error.
        let _ = self.sender.send(ChannelMessage {
            channel,
            payload: payload.to_string(),
        });
        Ok(())
    }

    async fn close(&self) {}
}

/// Redis `PUBLISH` client.
///
/// Wraps a [`ConnectionManager`], which reconnects on its own after
/// transient failures; a publish issued while Redis is down fails and
/// the caller decides what to do with the error.
pub struct RedisPublisher {
    conn: RwLock<Option<ConnectionManager>>,
}

impl RedisPublisher {
    /// Connects to Redis at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`NebulaError::Publish`] if the URL is invalid or the first
    /// connection attempt fails.
    pub async fn connect(url: &str) -> Result<Self, NebulaError> {
        let client = redis::Client::open(url).map_err(|e| NebulaError::Publish(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| NebulaError::Publish(e.to_string()))?;
        tracing::info!("connected to redis");
        Ok(Self {
            conn: RwLock::new(Some(conn)),
        })
    }
}

impl std::fmt::Debug for RedisPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPublisher").finish_non_exhaustive()
    }
}

#[async_trait]
impl ChannelPublisher for RedisPublisher {
    async fn publish(&self, channel: Channel, payload: &str) -> Result<(), NebulaError> {
        let Some(mut conn) = self.conn.read().await.clone() else {
            return Err(NebulaError::Publish("publisher closed".to_string()));
        };
        let receivers: i64 = conn
            .publish(channel.name(), payload)
            .await
            .map_err(|e| NebulaError::Publish(e.to_string()))?;
        tracing::trace!(channel = channel.name(), receivers, "published");
        Ok(())
    }

    async fn close(&self) {
        if self.conn.write().await.take().is_some() {
            tracing::info!("redis publisher closed");
        }
    }
}
