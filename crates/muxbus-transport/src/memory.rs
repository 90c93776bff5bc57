//! In-process transport.
//!
//! Delivers every published message synchronously to the handlers registered
//! on its channel. Useful for single-node deployments and tests.

use crate::traits::{RawHandler, Transport, TransportError};
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, trace};

/// In-memory pub/sub transport.
#[derive(Default)]
pub struct MemoryTransport {
    /// Channel name -> registered raw handlers.
    channels: DashMap<String, Vec<RawHandler>>,
}

impl MemoryTransport {
    /// Create a new in-memory transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of raw handlers registered on a channel.
    #[must_use]
    pub fn handler_count(&self, channel: &str) -> usize {
        self.channels.get(channel).map(|h| h.len()).unwrap_or(0)
    }

    /// Get the number of channels with at least one handler.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Deliver a raw message to every handler of a channel.
    ///
    /// Returns the number of handlers invoked. Unlike [`Transport::publish`]
    /// this bypasses any encoding, so it can inject arbitrary wire data.
    pub fn deliver(&self, channel: &str, message: &str) -> usize {
        // Clone the handler list so no shard lock is held while handlers run.
        let handlers = match self.channels.get(channel) {
            Some(handlers) => handlers.clone(),
            None => return 0,
        };

        for handler in &handlers {
            handler(message);
        }

        trace!(channel = %channel, recipients = handlers.len(), "Delivered message");
        handlers.len()
    }
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("channels", &self.channels.len())
            .finish()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn publish(&self, channel: &str, message: &str) -> Result<(), TransportError> {
        self.deliver(channel, message);
        Ok(())
    }

    async fn subscribe(&self, channel: &str, handler: RawHandler) -> Result<(), TransportError> {
        let mut handlers = self.channels.entry(channel.to_string()).or_default();
        handlers.push(handler);
        debug!(channel = %channel, handlers = handlers.len(), "Handler registered");
        Ok(())
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), TransportError> {
        if let Some((_, handlers)) = self.channels.remove(channel) {
            debug!(channel = %channel, handlers = handlers.len(), "Channel released");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
