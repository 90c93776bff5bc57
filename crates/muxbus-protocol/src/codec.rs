//! Codec for encoding and decoding muxbus envelopes.
//!
//! This module provides JSON-based serialization of `{event, payload}` pairs
//! into the opaque string messages carried by the transport.

use serde::Serialize;
use thiserror::Error;

use crate::envelope::{Envelope, EnvelopeRef, EventName, WireEnvelope};

/// Protocol errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Payload could not be serialized.
    #[error("Encoding error: {0}")]
    Encode(#[source] serde_json::Error),

    /// Wire message is not a structurally valid envelope.
    #[error("Decoding error: {0}")]
    Decode(#[source] serde_json::Error),

    /// Payload does not match the type bound to its event kind.
    #[error("Invalid payload for event '{event}': {source}")]
    Payload {
        /// Event kind the payload was tagged with.
        event: EventName,
        /// Underlying conversion error.
        #[source]
        source: serde_json::Error,
    },

    /// Payload was rejected by the event kind's validation hook.
    #[error("Payload rejected for event '{event}': {reason}")]
    Rejected {
        /// Event kind the payload was tagged with.
        event: EventName,
        /// Reason given by the validator.
        reason: String,
    },
}

/// Encode an event kind and payload into a wire message.
///
/// The encoded format is a JSON object:
/// - `event`: the event kind tag
/// - `payload`: the serialized payload
///
/// # Errors
///
/// Returns an error if the payload cannot be serialized.
pub fn encode<T: Serialize + ?Sized>(event: &str, payload: &T) -> Result<String, ProtocolError> {
    serde_json::to_string(&EnvelopeRef { event, payload }).map_err(ProtocolError::Encode)
}

/// Decode a wire message into an untyped envelope.
///
/// Returns `Ok(None)` for valid JSON that carries no string `event` tag; such
/// messages are well-formed traffic that belongs to no event kind.
///
/// # Errors
///
/// Returns [`ProtocolError::Decode`] if the message is not valid JSON.
pub fn decode(message: &str) -> Result<Option<Envelope>, ProtocolError> {
    let value: serde_json::Value = serde_json::from_str(message).map_err(ProtocolError::Decode)?;
    Ok(serde_json::from_value::<WireEnvelope>(value)
        .ok()
        .map(Envelope::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_decode_roundtrip() {
        let payload = json!({"userId": "u1", "roles": ["admin"]});
        let encoded = encode("userLogin", &payload).unwrap();
        let decoded = decode(&encoded).unwrap().unwrap();

        assert_eq!(decoded.event, "userLogin");
        assert_eq!(decoded.payload, payload);
    }

    #[test]
    fn test_encode_has_exactly_two_fields() {
        let encoded = encode("tick", &42).unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 2);
        assert_eq!(object["event"], "tick");
        assert_eq!(object["payload"], 42);
    }

    #[test]
    fn test_decode_wire_literal() {
        let decoded = decode(r#"{"event":"userLogin","payload":{"userId":"u1"}}"#).unwrap();
        assert_eq!(
            decoded,
            Some(Envelope::new("userLogin", json!({"userId": "u1"})))
        );
    }

    #[test]
    fn test_decode_not_json() {
        match decode("not json") {
            Err(ProtocolError::Decode(_)) => {}
            other => panic!("Expected Decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_untagged_json() {
        assert!(decode(r#"{"payload":1}"#).unwrap().is_none());
        assert!(decode(r#"{"event":7,"payload":1}"#).unwrap().is_none());
        assert!(decode("42").unwrap().is_none());
        assert!(decode("[1,2]").unwrap().is_none());
    }

    #[test]
    fn test_decode_missing_payload_is_null() {
        let decoded = decode(r#"{"event":"ping"}"#).unwrap().unwrap();
        assert!(decoded.payload.is_null());
    }
}
