//! HTTP handlers for the muxbus relay.
//!
//! The relay publishes JSON events onto the configured transport and keeps
//! logging subscriptions whose lifecycle can be managed over HTTP.

use crate::config::{Config, TransportConfig, TransportKind};
use crate::metrics;
use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use muxbus_core::{Multiplexer, MultiplexerConfig, MuxError, Unsubscribed};
use muxbus_transport::{MemoryTransport, TransportSource};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Shared relay state.
pub struct AppState {
    /// The event multiplexer.
    pub mux: Multiplexer,
    /// Relay configuration.
    pub config: Config,
}

impl AppState {
    /// Create new app state on top of a transport source.
    #[must_use]
    pub fn new(config: Config, source: TransportSource) -> Self {
        let mux_config = MultiplexerConfig::from(&config.limits);
        Self {
            mux: Multiplexer::with_config(source, mux_config),
            config,
        }
    }
}

/// Run the relay HTTP server.
///
/// # Errors
///
/// Returns an error if the transport or server fails to start.
pub async fn run_server(config: Config) -> Result<()> {
    let source = build_transport(&config.transport).await?;
    let state = Arc::new(AppState::new(config.clone(), source));

    // Start metrics server if enabled
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    for subscription in &config.subscriptions {
        for event in &subscription.events {
            state
                .mux
                .subscribe_raw(
                    &subscription.channel,
                    event,
                    logging_handler(&subscription.channel, event),
                )
                .await
                .with_context(|| {
                    format!("Failed to subscribe to {}/{}", subscription.channel, event)
                })?;
        }
    }
    metrics::record_stats(&state.mux.stats().await);

    let app = router(state);

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!("muxbus relay listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the HTTP router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/channels", get(channels_handler))
        .route("/publish/:channel/:event", post(publish_handler))
        .route(
            "/subscriptions/:channel/:event",
            post(subscribe_handler).delete(unsubscribe_handler),
        )
        .with_state(state)
}

async fn build_transport(config: &TransportConfig) -> Result<TransportSource> {
    match config.kind {
        TransportKind::Memory => {
            info!("Using in-memory transport");
            Ok(TransportSource::from(Arc::new(MemoryTransport::new())))
        }
        TransportKind::Redis => redis_transport(&config.url).await,
    }
}

#[cfg(feature = "redis")]
async fn redis_transport(url: &str) -> Result<TransportSource> {
    let transport = muxbus_transport::RedisTransport::connect(url)
        .await
        .with_context(|| format!("Failed to connect to Redis at {url}"))?;
    Ok(TransportSource::from(Arc::new(transport)))
}

#[cfg(not(feature = "redis"))]
async fn redis_transport(_url: &str) -> Result<TransportSource> {
    anyhow::bail!("Redis transport requested but the relay was built without the `redis` feature")
}

/// Handler that logs and counts every received event.
fn logging_handler(channel: &str, event: &str) -> impl Fn(Value) + Send + Sync + 'static {
    let channel = channel.to_string();
    let event = event.to_string();
    move |payload: Value| {
        metrics::record_received(&channel, &event);
        info!(channel = %channel, event = %event, payload = %payload, "Event received");
    }
}

/// Map a multiplexer error to an HTTP status.
fn error_status(err: &MuxError) -> StatusCode {
    match err {
        MuxError::Transport(_) => StatusCode::BAD_GATEWAY,
        MuxError::Protocol(_) => StatusCode::BAD_REQUEST,
        MuxError::MaxChannelsReached(_) | MuxError::MaxRegistrationsReached { .. } => {
            StatusCode::TOO_MANY_REQUESTS
        }
    }
}

fn error_response(err: &MuxError) -> Response {
    (error_status(err), Json(json!({ "error": err.to_string() }))).into_response()
}

fn outcome_label(outcome: Unsubscribed) -> &'static str {
    match outcome {
        Unsubscribed::NotSubscribed => "not_subscribed",
        Unsubscribed::NotRegistered => "not_registered",
        Unsubscribed::Released { .. } => "released",
        Unsubscribed::Drained => "drained",
    }
}

/// Health check handler.
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "transport": format!("{:?}", state.config.transport.kind).to_lowercase(),
    }))
}

/// List active channels and their registrations.
async fn channels_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut channels = Vec::new();
    for name in state.mux.channels().await {
        let registrations = state.mux.registrations(&name).await;
        channels.push(json!({ "channel": name, "registrations": registrations }));
    }

    let stats = state.mux.stats().await;
    metrics::record_stats(&stats);

    Json(json!({
        "channels": channels,
        "stats": {
            "channels": stats.channel_count,
            "registrations": stats.registration_count,
            "delivered": stats.delivered,
            "ignored": stats.ignored,
            "dropped": stats.dropped,
        }
    }))
}

/// Publish the request body as an event.
async fn publish_handler(
    State(state): State<Arc<AppState>>,
    Path((channel, event)): Path<(String, String)>,
    Json(payload): Json<Value>,
) -> Response {
    match state.mux.publish_raw(&channel, &event, &payload).await {
        Ok(()) => {
            metrics::record_publish(&channel, &event);
            StatusCode::ACCEPTED.into_response()
        }
        Err(e) => {
            warn!(channel = %channel, event = %event, "Publish failed: {}", e);
            metrics::record_publish_error(&channel);
            error_response(&e)
        }
    }
}

/// Add a logging subscription for an event kind.
async fn subscribe_handler(
    State(state): State<Arc<AppState>>,
    Path((channel, event)): Path<(String, String)>,
) -> Response {
    let handler = logging_handler(&channel, &event);
    match state.mux.subscribe_raw(&channel, &event, handler).await {
        Ok(()) => {
            metrics::record_stats(&state.mux.stats().await);
            (
                StatusCode::CREATED,
                Json(json!({ "channel": channel, "event": event })),
            )
                .into_response()
        }
        Err(e) => {
            warn!(channel = %channel, event = %event, "Subscribe failed: {}", e);
            error_response(&e)
        }
    }
}

/// Response body for a released subscription.
///
/// Every relay subscription installs its own transport listener, and the
/// transport only stops listeners per channel. A `released` registration is
/// gone from the bookkeeping but its listener keeps logging matching events
/// until the channel drains; `listener_stopped` says which case applies.
fn unsubscribe_body(channel: &str, event: &str, outcome: Unsubscribed) -> Value {
    let remaining = match outcome {
        Unsubscribed::Released { remaining } => remaining,
        _ => 0,
    };
    json!({
        "channel": channel,
        "event": event,
        "outcome": outcome_label(outcome),
        "remaining": remaining,
        "listener_stopped": outcome.is_drained(),
    })
}

/// Release one logging subscription for an event kind.
///
/// The channel's listeners stop only once its last registration is
/// released; see [`unsubscribe_body`].
async fn unsubscribe_handler(
    State(state): State<Arc<AppState>>,
    Path((channel, event)): Path<(String, String)>,
) -> Response {
    match state.mux.unsubscribe_raw(&channel, &event).await {
        Ok(outcome) => {
            metrics::record_stats(&state.mux.stats().await);
            Json(unsubscribe_body(&channel, &event, outcome)).into_response()
        }
        Err(e) => {
            warn!(channel = %channel, event = %event, "Unsubscribe failed: {}", e);
            error_response(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muxbus_transport::TransportError;

    #[test]
    fn test_error_status() {
        let transport = MuxError::Transport(TransportError::Other("down".into()));
        assert_eq!(error_status(&transport), StatusCode::BAD_GATEWAY);

        let limit = MuxError::MaxRegistrationsReached {
            channel: "c".into(),
            limit: 1,
        };
        assert_eq!(error_status(&limit), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_outcome_label() {
        assert_eq!(outcome_label(Unsubscribed::Drained), "drained");
        assert_eq!(
            outcome_label(Unsubscribed::Released { remaining: 2 }),
            "released"
        );
        assert_eq!(outcome_label(Unsubscribed::NotSubscribed), "not_subscribed");
    }

    #[test]
    fn test_unsubscribe_body_reports_listener_state() {
        let released = unsubscribe_body("c", "a", Unsubscribed::Released { remaining: 1 });
        assert_eq!(released["outcome"], "released");
        assert_eq!(released["remaining"], 1);
        assert_eq!(released["listener_stopped"], false);

        let drained = unsubscribe_body("c", "a", Unsubscribed::Drained);
        assert_eq!(drained["outcome"], "drained");
        assert_eq!(drained["listener_stopped"], true);

        let missing = unsubscribe_body("c", "a", Unsubscribed::NotSubscribed);
        assert_eq!(missing["listener_stopped"], false);
    }

    #[tokio::test]
    async fn test_memory_transport_relay_roundtrip() {
        let config = Config::default();
        let source = build_transport(&config.transport).await.unwrap();
        let state = AppState::new(config, source);

        state
            .mux
            .subscribe_raw("sessions", "userLogin", logging_handler("sessions", "userLogin"))
            .await
            .unwrap();
        state
            .mux
            .publish_raw("sessions", "userLogin", &json!({"userId": "u1"}))
            .await
            .unwrap();

        let stats = state.mux.stats().await;
        assert_eq!(stats.delivered, 1);
        assert_eq!(
            state.mux.unsubscribe_raw("sessions", "userLogin").await.unwrap(),
            Unsubscribed::Drained
        );
    }
}
