//! Typed event multiplexer for muxbus.
//!
//! The multiplexer lets many independently typed event kinds share one
//! transport channel and decides, by reference counting, when a channel
//! subscription can be torn down.

use crate::dispatch::{self, DispatchCounters};
use crate::registry::{ChannelId, ChannelRegistry, Unsubscribed};
use muxbus_protocol::{codec, EventKind, ProtocolError};
use muxbus_transport::{RawHandler, TransportError, TransportSource};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

/// Multiplexer errors.
#[derive(Debug, Error)]
pub enum MuxError {
    /// The transport call failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The payload could not be encoded.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Maximum number of channels reached.
    #[error("Maximum channels reached ({0})")]
    MaxChannelsReached(usize),

    /// Maximum registrations on a channel reached.
    #[error("Maximum registrations reached on channel '{channel}' ({limit})")]
    MaxRegistrationsReached {
        /// Channel that is full.
        channel: ChannelId,
        /// Configured limit.
        limit: usize,
    },
}

/// Multiplexer configuration.
///
/// A limit of `0` means unlimited.
#[derive(Debug, Clone, Default)]
pub struct MultiplexerConfig {
    /// Maximum number of active channels.
    pub max_channels: usize,
    /// Maximum registrations on a single channel.
    pub max_registrations_per_channel: usize,
}

/// Multiplexer statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiplexerStats {
    /// Number of active channels.
    pub channel_count: usize,
    /// Total number of registrations.
    pub registration_count: usize,
    /// Messages handed to handlers.
    pub delivered: u64,
    /// Messages ignored because they carried another event kind.
    pub ignored: u64,
    /// Messages dropped because they were malformed or invalid.
    pub dropped: u64,
}

/// The event multiplexer.
///
/// Every `subscribe` call installs its own transport subscription with a
/// dispatch adapter filtering on the event kind. The registry counts those
/// registrations per channel; the transport unsubscribe is issued only when
/// a channel's last registration is released.
pub struct Multiplexer {
    /// Where the transport handle comes from.
    source: TransportSource,
    /// Registered event kinds per channel. Held across the transport call of
    /// subscribe/unsubscribe so registry and transport never disagree.
    registry: Mutex<ChannelRegistry>,
    /// Shared by every dispatch adapter.
    counters: Arc<DispatchCounters>,
    /// Configuration.
    config: MultiplexerConfig,
}

impl Multiplexer {
    /// Create a new multiplexer with default configuration.
    #[must_use]
    pub fn new(source: impl Into<TransportSource>) -> Self {
        Self::with_config(source, MultiplexerConfig::default())
    }

    /// Create a new multiplexer with custom configuration.
    #[must_use]
    pub fn with_config(source: impl Into<TransportSource>, config: MultiplexerConfig) -> Self {
        let source = source.into();
        info!(source = ?source, "Creating multiplexer with config: {:?}", config);
        Self {
            source,
            registry: Mutex::new(ChannelRegistry::new()),
            counters: Arc::new(DispatchCounters::default()),
            config,
        }
    }

    /// Publish a typed event on a channel.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the transport publish fails.
    pub async fn publish<E: EventKind>(
        &self,
        channel: &str,
        payload: &E::Payload,
    ) -> Result<(), MuxError> {
        self.publish_raw(channel, E::NAME, payload).await
    }

    /// Publish an event under an arbitrary event kind tag.
    ///
    /// Completes once the transport accepted the message; whether anyone is
    /// subscribed is not checked.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the transport publish fails.
    pub async fn publish_raw<T: Serialize + ?Sized>(
        &self,
        channel: &str,
        event: &str,
        payload: &T,
    ) -> Result<(), MuxError> {
        let transport = self.source.resolve().await?;
        let message = codec::encode(event, payload)?;
        transport.publish(channel, &message).await?;

        trace!(channel = %channel, event = %event, bytes = message.len(), "Published event");
        Ok(())
    }

    /// Subscribe a typed handler to an event kind on a channel.
    ///
    /// # Errors
    ///
    /// Returns an error if a limit is exceeded or the transport subscribe
    /// fails. The registry is left unchanged on error.
    pub async fn subscribe<E, F>(&self, channel: &str, handler: F) -> Result<(), MuxError>
    where
        E: EventKind,
        F: Fn(E::Payload) + Send + Sync + 'static,
    {
        let adapter = dispatch::typed::<E, F>(channel, Arc::clone(&self.counters), handler);
        self.register(channel, E::NAME, adapter).await
    }

    /// Subscribe an untyped handler to an event kind tag on a channel.
    ///
    /// # Errors
    ///
    /// Returns an error if a limit is exceeded or the transport subscribe
    /// fails. The registry is left unchanged on error.
    pub async fn subscribe_raw<F>(&self, channel: &str, event: &str, handler: F) -> Result<(), MuxError>
    where
        F: Fn(serde_json::Value) + Send + Sync + 'static,
    {
        let adapter = dispatch::raw(channel, event, Arc::clone(&self.counters), handler);
        self.register(channel, event, adapter).await
    }

    /// Release one typed registration on a channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport unsubscribe fails.
    pub async fn unsubscribe<E: EventKind>(&self, channel: &str) -> Result<Unsubscribed, MuxError> {
        self.unsubscribe_raw(channel, E::NAME).await
    }

    /// Release one registration of an event kind tag on a channel.
    ///
    /// Only one entry is removed even if the event kind was subscribed
    /// several times. The transport unsubscribe is issued when the channel's
    /// last entry goes; unknown channels and event kinds are no-ops.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport handle cannot be resolved, or if the
    /// transport unsubscribe fails. The released entry is restored in the
    /// latter case.
    pub async fn unsubscribe_raw(&self, channel: &str, event: &str) -> Result<Unsubscribed, MuxError> {
        let transport = self.source.resolve().await?;
        let mut registry = self.registry.lock().await;

        let outcome = registry.release(channel, event);
        match outcome {
            Unsubscribed::NotSubscribed | Unsubscribed::NotRegistered => {
                trace!(channel = %channel, event = %event, "Nothing to unsubscribe");
            }
            Unsubscribed::Released { remaining } => {
                debug!(channel = %channel, event = %event, remaining, "Released registration");
            }
            Unsubscribed::Drained => {
                if let Err(e) = transport.unsubscribe(channel).await {
                    registry.register(channel, event);
                    warn!(channel = %channel, event = %event, "Channel teardown failed: {}", e);
                    return Err(e.into());
                }
                debug!(channel = %channel, event = %event, "Channel drained");
            }
        }

        Ok(outcome)
    }

    /// Check if a channel has an active transport subscription.
    pub async fn is_subscribed(&self, channel: &str) -> bool {
        self.registry.lock().await.contains(channel)
    }

    /// Get the event kinds registered on a channel, one per registration.
    pub async fn registrations(&self, channel: &str) -> Vec<String> {
        self.registry.lock().await.registrations(channel).to_vec()
    }

    /// Get all active channel names.
    pub async fn channels(&self) -> Vec<ChannelId> {
        self.registry.lock().await.channels()
    }

    /// Get multiplexer statistics.
    pub async fn stats(&self) -> MultiplexerStats {
        let registry = self.registry.lock().await;
        MultiplexerStats {
            channel_count: registry.channel_count(),
            registration_count: registry.registration_count(),
            delivered: self.counters.delivered(),
            ignored: self.counters.ignored(),
            dropped: self.counters.dropped(),
        }
    }

    async fn register(&self, channel: &str, event: &str, adapter: RawHandler) -> Result<(), MuxError> {
        let mut registry = self.registry.lock().await;
        self.check_limits(&registry, channel)?;

        let transport = self.source.resolve().await?;
        transport.subscribe(channel, adapter).await?;
        let entries = registry.register(channel, event);

        debug!(
            channel = %channel,
            event = %event,
            transport = transport.name(),
            entries,
            "Subscribed"
        );
        Ok(())
    }

    fn check_limits(&self, registry: &ChannelRegistry, channel: &str) -> Result<(), MuxError> {
        let max_channels = self.config.max_channels;
        if max_channels > 0 && !registry.contains(channel) && registry.channel_count() >= max_channels
        {
            return Err(MuxError::MaxChannelsReached(max_channels));
        }

        let limit = self.config.max_registrations_per_channel;
        if limit > 0 && registry.registrations(channel).len() >= limit {
            return Err(MuxError::MaxRegistrationsReached {
                channel: channel.to_string(),
                limit,
            });
        }

        Ok(())
    }
}

impl std::fmt::Debug for Multiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Multiplexer")
            .field("source", &self.source)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
