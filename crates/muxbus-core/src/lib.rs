//! # muxbus-core
//!
//! Typed event multiplexing over an untyped pub/sub transport.
//!
//! This crate provides the fundamental building blocks:
//!
//! - **Multiplexer** - Publish, subscribe and reference-counted unsubscribe
//! - **Registry** - Per-channel multiset of registered event kinds
//! - **Dispatch** - Adapters filtering incoming messages by event kind
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Application │────▶│ Multiplexer │────▶│  Transport  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        ▲                   │                   │
//!        │                   ▼                   │
//!        │            ┌─────────────┐            │
//!        └────────────│  Dispatch   │◀───────────┘
//!                     └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use muxbus_core::{event_kind, Multiplexer};
//! use muxbus_transport::MemoryTransport;
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Login {
//!     user_id: String,
//! }
//!
//! event_kind!(UserLogin => Login, "userLogin");
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mux = Multiplexer::new(Arc::new(MemoryTransport::new()));
//! mux.subscribe::<UserLogin, _>("sessions", |login| println!("{} logged in", login.user_id))
//!     .await
//!     .unwrap();
//! mux.publish::<UserLogin>("sessions", &Login { user_id: "u1".into() })
//!     .await
//!     .unwrap();
//! mux.unsubscribe::<UserLogin>("sessions").await.unwrap();
//! # }
//! ```

pub mod dispatch;
pub mod multiplexer;
pub mod registry;

pub use dispatch::DispatchCounters;
pub use multiplexer::{Multiplexer, MultiplexerConfig, MultiplexerStats, MuxError};
pub use registry::{ChannelId, ChannelRegistry, Unsubscribed};

pub use muxbus_protocol::{event_kind, Envelope, EventKind};
