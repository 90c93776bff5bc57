//! Relay configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (MUXBUS_*)
//! - TOML configuration file

use anyhow::{Context, Result};
use muxbus_core::MultiplexerConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Transport configuration.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Resource limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Subscriptions installed at startup.
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionConfig>,
}

/// Which transport backs the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// In-process delivery.
    Memory,
    /// Redis pub/sub.
    Redis,
}

/// Transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Transport backend.
    #[serde(default = "default_transport_kind")]
    pub kind: TransportKind,

    /// Connection URL (Redis only).
    #[serde(default = "default_redis_url")]
    pub url: String,
}

/// Resource limits configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum number of active channels (0 = unlimited).
    #[serde(default)]
    pub max_channels: usize,

    /// Maximum registrations on one channel (0 = unlimited).
    #[serde(default)]
    pub max_registrations_per_channel: usize,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics export.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

/// A channel and the event kinds to log on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// Channel name.
    pub channel: String,
    /// Event kinds to subscribe to.
    pub events: Vec<String>,
}

// Default value functions
fn default_host() -> String {
    std::env::var("MUXBUS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string())
}

fn default_port() -> u16 {
    std::env::var("MUXBUS_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080)
}

fn default_true() -> bool {
    true
}

fn default_transport_kind() -> TransportKind {
    TransportKind::Memory
}

fn default_redis_url() -> String {
    std::env::var("MUXBUS_REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            transport: TransportConfig::default(),
            limits: LimitsConfig::default(),
            metrics: MetricsConfig::default(),
            subscriptions: Vec::new(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: default_transport_kind(),
            url: default_redis_url(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_metrics_port(),
        }
    }
}

impl From<&LimitsConfig> for MultiplexerConfig {
    fn from(limits: &LimitsConfig) -> Self {
        MultiplexerConfig {
            max_channels: limits.max_channels,
            max_registrations_per_channel: limits.max_registrations_per_channel,
        }
    }
}

impl Config {
    /// Load configuration from file or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var("MUXBUS_CONFIG") {
            return Self::from_file(shellexpand::tilde(&path).as_ref());
        }

        let config_paths = [
            "muxbus.toml",
            "/etc/muxbus/muxbus.toml",
            "~/.config/muxbus/muxbus.toml",
        ];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        // Fall back to defaults with environment overrides
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Get the socket address to bind to.
    ///
    /// # Errors
    ///
    /// Returns an error if host and port do not form a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.transport.kind, TransportKind::Memory);
        assert!(config.metrics.enabled);
        assert!(config.subscriptions.is_empty());
        assert_eq!(config.limits.max_channels, 0);
    }

    #[test]
    fn test_config_bind_addr() {
        let config = Config {
            host: "127.0.0.1".into(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.bind_addr().unwrap().port(), 8080);

        let bad = Config {
            host: "not a host".into(),
            ..config
        };
        assert!(bad.bind_addr().is_err());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            host = "0.0.0.0"
            port = 9000

            [transport]
            kind = "redis"
            url = "redis://cache:6379"

            [limits]
            max_registrations_per_channel = 16

            [[subscriptions]]
            channel = "sessions"
            events = ["userLogin", "userLogout"]
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.transport.kind, TransportKind::Redis);
        assert_eq!(config.transport.url, "redis://cache:6379");
        assert_eq!(config.limits.max_registrations_per_channel, 16);
        assert_eq!(
            config.subscriptions,
            vec![SubscriptionConfig {
                channel: "sessions".into(),
                events: vec!["userLogin".into(), "userLogout".into()],
            }]
        );

        let mux_config = MultiplexerConfig::from(&config.limits);
        assert_eq!(mux_config.max_registrations_per_channel, 16);
        assert_eq!(mux_config.max_channels, 0);
    }

    #[test]
    fn test_unknown_transport_kind_rejected() {
        let toml_str = r#"
            [transport]
            kind = "carrier-pigeon"
        "#;
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }
}
