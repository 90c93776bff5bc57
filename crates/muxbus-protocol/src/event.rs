//! Static binding between event kinds and payload types.
//!
//! The association of an event kind with its payload type only exists at
//! compile time. Decoded payloads are untyped JSON until they are converted
//! into [`EventKind::Payload`] at the call boundary.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::ProtocolError;
use crate::envelope::Envelope;

/// A named event kind bound to a payload type.
///
/// Usually declared with [`event_kind!`](crate::event_kind):
///
/// ```rust
/// use muxbus_protocol::{event_kind, EventKind};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Serialize, Deserialize)]
/// pub struct Login {
///     pub user_id: String,
/// }
///
/// event_kind!(pub UserLogin => Login, "userLogin");
///
/// assert_eq!(UserLogin::NAME, "userLogin");
/// ```
pub trait EventKind: Send + Sync + 'static {
    /// Wire tag of this event kind.
    const NAME: &'static str;

    /// Payload type carried by this event kind.
    type Payload: Serialize + DeserializeOwned + Send + 'static;

    /// Runtime validation hook for decoded payloads.
    ///
    /// Called after the payload has been converted into [`Self::Payload`].
    /// Returning an error drops the message. Accepts everything by default.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason if the payload is rejected.
    fn validate(_payload: &Self::Payload) -> Result<(), String> {
        Ok(())
    }
}

/// Convert an untyped envelope into the payload of `E`.
///
/// # Errors
///
/// Returns [`ProtocolError::Payload`] on a structural mismatch and
/// [`ProtocolError::Rejected`] if [`EventKind::validate`] fails.
pub fn typed_payload<E: EventKind>(envelope: Envelope) -> Result<E::Payload, ProtocolError> {
    let (event, payload) = envelope.into_typed::<E::Payload>()?.into_parts();
    E::validate(&payload).map_err(|reason| ProtocolError::Rejected { event, reason })?;
    Ok(payload)
}

/// Declare a marker type implementing [`EventKind`].
///
/// ```rust
/// use muxbus_protocol::event_kind;
///
/// event_kind!(pub Heartbeat => u64, "heartbeat");
/// ```
#[macro_export]
macro_rules! event_kind {
    ($(#[$meta:meta])* $vis:vis $name:ident => $payload:ty, $tag:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $name;

        impl $crate::EventKind for $name {
            const NAME: &'static str = $tag;
            type Payload = $payload;
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Reading {
        celsius: f64,
    }

    event_kind!(Temperature => Reading, "temperature");

    struct Positive;

    impl EventKind for Positive {
        const NAME: &'static str = "positive";
        type Payload = i64;

        fn validate(payload: &i64) -> Result<(), String> {
            if *payload > 0 {
                Ok(())
            } else {
                Err(format!("{payload} is not positive"))
            }
        }
    }

    #[test]
    fn test_event_kind_macro() {
        assert_eq!(Temperature::NAME, "temperature");
        let payload =
            typed_payload::<Temperature>(Envelope::new("temperature", json!({"celsius": 21.5})))
                .unwrap();
        assert_eq!(payload, Reading { celsius: 21.5 });
    }

    #[test]
    fn test_validation_hook() {
        assert_eq!(
            typed_payload::<Positive>(Envelope::new("positive", json!(3))).unwrap(),
            3
        );
        match typed_payload::<Positive>(Envelope::new("positive", json!(-1))) {
            Err(ProtocolError::Rejected { event, reason }) => {
                assert_eq!(event, "positive");
                assert_eq!(reason, "-1 is not positive");
            }
            other => panic!("Expected Rejected error, got {:?}", other),
        }
    }

    #[test]
    fn test_structural_mismatch() {
        assert!(matches!(
            typed_payload::<Temperature>(Envelope::new("temperature", json!("hot"))),
            Err(ProtocolError::Payload { .. })
        ));
    }
}
