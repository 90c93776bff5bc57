//! # muxbus-protocol
//!
//! Wire format definitions for muxbus.
//!
//! Every transport message is an envelope tagging a payload with the event
//! kind it belongs to, so several independently typed event kinds can share
//! one pub/sub channel.
//!
//! ## Wire Format
//!
//! ```json
//! {"event": "userLogin", "payload": {"userId": "u1"}}
//! ```
//!
//! ## Example
//!
//! ```rust
//! use muxbus_protocol::codec;
//!
//! let encoded = codec::encode("userLogin", &serde_json::json!({"userId": "u1"})).unwrap();
//! let decoded = codec::decode(&encoded).unwrap().unwrap();
//! assert!(decoded.is("userLogin"));
//! ```

pub mod codec;
pub mod envelope;
pub mod event;

pub use codec::{decode, encode, ProtocolError};
pub use envelope::{Envelope, EventName};
pub use event::{typed_payload, EventKind};
