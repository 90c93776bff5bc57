//! Redis pub/sub transport.
//!
//! Publishes through a shared connection manager. Every `subscribe` call
//! opens its own pub/sub connection and forwards messages to the handler from
//! a background task; `unsubscribe` aborts every task of the channel.

use crate::traits::{RawHandler, Transport, TransportError};
use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::StreamExt;
use redis::aio::ConnectionManager;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Redis-backed pub/sub transport.
pub struct RedisTransport {
    /// Client used to open pub/sub connections.
    client: redis::Client,
    /// Connection used for PUBLISH.
    publisher: ConnectionManager,
    /// Channel name -> listener tasks.
    listeners: DashMap<String, Vec<JoinHandle<()>>>,
}

impl RedisTransport {
    /// Connect to the Redis server at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the server is unreachable.
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let client = redis::Client::open(url)?;
        let publisher = ConnectionManager::new(client.clone()).await?;
        info!("Connected to Redis transport");

        Ok(Self {
            client,
            publisher,
            listeners: DashMap::new(),
        })
    }
}

impl std::fmt::Debug for RedisTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisTransport")
            .field("channels", &self.listeners.len())
            .finish()
    }
}

#[async_trait]
impl Transport for RedisTransport {
    async fn publish(&self, channel: &str, message: &str) -> Result<(), TransportError> {
        let mut conn = self.publisher.clone();
        redis::cmd("PUBLISH")
            .arg(channel)
            .arg(message)
            .query_async::<i64>(&mut conn)
            .await
            .map_err(|e| TransportError::PublishFailed {
                channel: channel.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn subscribe(&self, channel: &str, handler: RawHandler) -> Result<(), TransportError> {
        let subscribe_failed = |e: redis::RedisError| TransportError::SubscribeFailed {
            channel: channel.to_string(),
            reason: e.to_string(),
        };

        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(subscribe_failed)?;
        pubsub.subscribe(channel).await.map_err(subscribe_failed)?;

        let name = channel.to_string();
        let task = tokio::spawn(async move {
            let mut messages = pubsub.into_on_message();
            while let Some(msg) = messages.next().await {
                match msg.get_payload::<String>() {
                    Ok(payload) => handler(&payload),
                    Err(e) => warn!(channel = %name, "Dropping non-text message: {}", e),
                }
            }
            debug!(channel = %name, "Listener stream ended");
        });

        self.listeners
            .entry(channel.to_string())
            .or_default()
            .push(task);
        Ok(())
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), TransportError> {
        if let Some((_, tasks)) = self.listeners.remove(channel) {
            for task in &tasks {
                task.abort();
            }
            debug!(channel = %channel, listeners = tasks.len(), "Listeners stopped");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

impl Drop for RedisTransport {
    fn drop(&mut self) {
        for entry in self.listeners.iter() {
            for task in entry.value() {
                task.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::raw_handler;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    /// Needs a live server: `MUXBUS_REDIS_URL=redis://127.0.0.1/ cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn test_subscribe_publish_unsubscribe() {
        let Ok(url) = std::env::var("MUXBUS_REDIS_URL") else {
            eprintln!("MUXBUS_REDIS_URL not set, skipping");
            return;
        };
        let transport = RedisTransport::connect(&url).await.unwrap();
        let channel = format!("muxbus-test-{}", std::process::id());

        let (tx, mut rx) = mpsc::unbounded_channel();
        transport
            .subscribe(
                &channel,
                raw_handler(move |msg| {
                    let _ = tx.send(msg.to_string());
                }),
            )
            .await
            .unwrap();

        transport.publish(&channel, "hello").await.unwrap();
        let received = timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert_eq!(received.as_deref(), Some("hello"));

        transport.unsubscribe(&channel).await.unwrap();
        transport.publish(&channel, "after").await.unwrap();

        // The aborted listener drops its sender, so the receiver either closes
        // or stays silent; it must not see the second message.
        let after = timeout(Duration::from_millis(500), rx.recv()).await;
        assert!(!matches!(after, Ok(Some(_))), "received after unsubscribe: {after:?}");
    }
}
