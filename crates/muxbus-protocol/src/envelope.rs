//! Envelope type for the muxbus wire format.
//!
//! Every message placed on a channel is an envelope tagging the payload with
//! the event kind it belongs to, so several event kinds can share one channel.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::codec::ProtocolError;

/// An event kind tag.
pub type EventName = String;

/// A tagged message.
///
/// On the wire this is a JSON object with exactly two fields:
///
/// ```json
/// {"event": "userLogin", "payload": {"userId": "u1"}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = serde_json::Value> {
    /// Event kind tag.
    pub event: EventName,
    /// Message payload.
    pub payload: T,
}

impl<T> Envelope<T> {
    /// Create a new envelope.
    #[must_use]
    pub fn new(event: impl Into<EventName>, payload: T) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }

    /// Check whether this envelope is tagged with the given event kind.
    #[must_use]
    pub fn is(&self, event: &str) -> bool {
        self.event == event
    }

    /// Split the envelope into its event tag and payload.
    #[must_use]
    pub fn into_parts(self) -> (EventName, T) {
        (self.event, self.payload)
    }
}

impl<T: Serialize> Envelope<T> {
    /// Encode this envelope into a wire message.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        crate::codec::encode(&self.event, &self.payload)
    }
}

impl Envelope<serde_json::Value> {
    /// Convert the untyped payload into a concrete type.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Payload`] if the payload does not have the
    /// structure of `T`.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<Envelope<T>, ProtocolError> {
        let payload = serde_json::from_value(self.payload).map_err(|source| {
            ProtocolError::Payload {
                event: self.event.clone(),
                source,
            }
        })?;
        Ok(Envelope {
            event: self.event,
            payload,
        })
    }
}

/// Borrowed form used when encoding, so payloads are never cloned.
#[derive(Serialize)]
pub(crate) struct EnvelopeRef<'a, T: ?Sized> {
    pub(crate) event: &'a str,
    pub(crate) payload: &'a T,
}

/// Wire form used when decoding.
///
/// A missing `payload` field decodes as `null`.
#[derive(Deserialize)]
pub(crate) struct WireEnvelope {
    pub(crate) event: EventName,
    #[serde(default)]
    pub(crate) payload: serde_json::Value,
}

impl From<WireEnvelope> for Envelope {
    fn from(wire: WireEnvelope) -> Self {
        Envelope {
            event: wire.event,
            payload: wire.payload,
        }
    }
}
