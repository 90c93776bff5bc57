//! Dispatch adapters.
//!
//! An adapter is the raw handler installed on the transport for one
//! registration. It decodes each wire message and forwards it only when the
//! envelope carries the registration's event kind. Messages that are not JSON
//! are logged and dropped; they never reach a handler or escape the adapter.
//! Valid JSON without an `event` tag is ignored like another kind's traffic.

use muxbus_protocol::{codec, typed_payload, Envelope, EventKind, ProtocolError};
use muxbus_transport::{raw_handler, RawHandler};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, trace};

/// Counters shared by every adapter of a multiplexer.
#[derive(Debug, Default)]
pub struct DispatchCounters {
    delivered: AtomicU64,
    ignored: AtomicU64,
    dropped: AtomicU64,
}

impl DispatchCounters {
    /// Messages handed to a handler.
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Well-formed messages for another event kind, or with no event tag.
    #[must_use]
    pub fn ignored(&self) -> u64 {
        self.ignored.load(Ordering::Relaxed)
    }

    /// Messages dropped because they failed to decode or validate.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Build an adapter forwarding matching envelopes to `on_envelope`.
///
/// An error returned by `on_envelope` drops the message the same way a
/// decode failure does.
pub fn adapter<F>(
    channel: &str,
    event: &str,
    counters: Arc<DispatchCounters>,
    on_envelope: F,
) -> RawHandler
where
    F: Fn(Envelope) -> Result<(), ProtocolError> + Send + Sync + 'static,
{
    let channel = channel.to_string();
    let event = event.to_string();

    raw_handler(move |message| {
        let result = codec::decode(message).and_then(|decoded| match decoded {
            Some(envelope) if envelope.is(&event) => on_envelope(envelope).map(|()| true),
            Some(envelope) => {
                trace!(
                    channel = %channel,
                    event = %event,
                    received = %envelope.event,
                    "Ignoring message for another event kind"
                );
                Ok(false)
            }
            None => {
                trace!(channel = %channel, event = %event, "Ignoring untagged message");
                Ok(false)
            }
        });

        match result {
            Ok(true) => counters.delivered.fetch_add(1, Ordering::Relaxed),
            Ok(false) => counters.ignored.fetch_add(1, Ordering::Relaxed),
            Err(e) => {
                error!(channel = %channel, event = %event, "Dropping message: {}", e);
                counters.dropped.fetch_add(1, Ordering::Relaxed)
            }
        };
    })
}

/// Build an adapter handing untyped payloads to `handler`.
pub fn raw<F>(channel: &str, event: &str, counters: Arc<DispatchCounters>, handler: F) -> RawHandler
where
    F: Fn(serde_json::Value) + Send + Sync + 'static,
{
    adapter(channel, event, counters, move |envelope| {
        handler(envelope.payload);
        Ok(())
    })
}

/// Build an adapter handing payloads of `E` to `handler`.
///
/// Payloads that do not convert into `E::Payload` or fail
/// [`EventKind::validate`] are dropped like malformed messages.
pub fn typed<E, F>(channel: &str, counters: Arc<DispatchCounters>, handler: F) -> RawHandler
where
    E: EventKind,
    F: Fn(E::Payload) + Send + Sync + 'static,
{
    adapter(channel, E::NAME, counters, move |envelope| {
        typed_payload::<E>(envelope).map(&handler)
    })
}
