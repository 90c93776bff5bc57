//! # muxbus-transport
//!
//! Transport abstraction layer for muxbus.
//!
//! muxbus only needs three calls from a pub/sub backend: `publish`,
//! `subscribe` and `unsubscribe`, all carrying opaque strings. This crate
//! defines that contract and ships two implementations:
//!
//! - **Memory** - In-process delivery, for single-node setups and tests
//! - **Redis** - Redis PUBLISH/SUBSCRIBE (feature `redis`)
//!
//! ```rust,ignore
//! use muxbus_transport::{raw_handler, MemoryTransport, Transport};
//!
//! let transport = MemoryTransport::new();
//! transport.subscribe("events", raw_handler(|msg| println!("{msg}"))).await?;
//! transport.publish("events", "hello").await?;
//! ```

pub mod memory;
pub mod source;
pub mod traits;

#[cfg(feature = "redis")]
pub mod redis;

pub use memory::MemoryTransport;
pub use source::TransportSource;
pub use traits::{raw_handler, RawHandler, Transport, TransportError};

#[cfg(feature = "redis")]
pub use self::redis::RedisTransport;
