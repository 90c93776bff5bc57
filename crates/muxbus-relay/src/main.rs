//! # muxbus relay
//!
//! HTTP relay publishing JSON events onto a muxbus transport.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings (in-memory transport)
//! muxbus
//!
//! # Run with a custom config
//! MUXBUS_CONFIG=/path/to/muxbus.toml muxbus
//!
//! # Publish an event
//! curl -X POST localhost:8080/publish/sessions/userLogin -d '{"userId":"u1"}' \
//!     -H 'content-type: application/json'
//! ```

mod config;
mod handlers;
mod metrics;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "muxbus=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::load()?;

    tracing::info!(
        "Starting muxbus relay on {}:{} ({:?} transport)",
        config.host,
        config.port,
        config.transport.kind
    );

    // Initialize metrics
    metrics::init_metrics();

    // Start the server
    handlers::run_server(config).await?;

    Ok(())
}
