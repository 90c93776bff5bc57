//! Transport abstraction traits for muxbus.
//!
//! These traits define the three calls muxbus consumes from an untyped
//! pub/sub backend, allowing the multiplexer to be backend-agnostic.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Handler invoked with every raw message delivered on a subscribed channel.
pub type RawHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Wrap a closure as a [`RawHandler`].
pub fn raw_handler<F>(f: F) -> RawHandler
where
    F: Fn(&str) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to publish a message.
    #[error("Publish failed on channel '{channel}': {reason}")]
    PublishFailed {
        /// Target channel.
        channel: String,
        /// Backend error description.
        reason: String,
    },

    /// Failed to subscribe to a channel.
    #[error("Subscribe failed on channel '{channel}': {reason}")]
    SubscribeFailed {
        /// Target channel.
        channel: String,
        /// Backend error description.
        reason: String,
    },

    /// Transport handle could not be produced by its factory.
    #[error("Transport unavailable: {0}")]
    Unavailable(String),

    /// Redis error.
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// An untyped publish/subscribe transport.
///
/// Implementations deliver opaque string messages to every active handler of
/// a channel. Delivery guarantees, reconnection and ordering are the
/// transport's own concern.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Publish a message on a channel.
    async fn publish(&self, channel: &str, message: &str) -> Result<(), TransportError>;

    /// Register a raw handler for a channel.
    ///
    /// Every call adds a handler; earlier handlers on the same channel stay
    /// active.
    async fn subscribe(&self, channel: &str, handler: RawHandler) -> Result<(), TransportError>;

    /// Remove every handler registered for a channel.
    async fn unsubscribe(&self, channel: &str) -> Result<(), TransportError>;

    /// Get the transport name (e.g., "memory", "redis").
    fn name(&self) -> &'static str;
}
