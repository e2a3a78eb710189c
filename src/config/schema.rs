//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits so the same structure can be read from (and
//! written to) TOML or JSON files.

use std::net::{AddrParseError, SocketAddr};

use serde::{Deserialize, Serialize};

/// Name of the route every configuration must define.
pub const DEFAULT_ROUTE: &str = "default";

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, admission limit).
    pub listener: ListenerConfig,

    /// Per-stage time budgets.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Ordered route definitions. Later routes win when several match.
    pub routes: Vec<RouteConfig>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
            routes: vec![RouteConfig {
                name: DEFAULT_ROUTE.to_string(),
                backend: "127.0.0.1:25566".to_string(),
                pattern: ".".to_string(),
            }],
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:25565"). A bare ":25565" binds all interfaces.
    pub bind_address: String,

    /// Maximum concurrent sessions (backpressure).
    pub max_connections: usize,
}

impl ListenerConfig {
    /// Parse the bind address, expanding a bare `:port` to all interfaces.
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        with_default_host(&self.bind_address, "0.0.0.0").parse()
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:25565".to_string(),
            max_connections: 4096,
        }
    }
}

/// Timeout configuration for the stages of a session.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Backend dial timeout in seconds.
    pub connect_secs: u64,

    /// Budget for reading the handshake and for each status exchange step.
    pub handshake_secs: u64,

    /// Longest silence tolerated on either side of a login relay.
    pub idle_secs: u64,

    /// How long shutdown waits for live sessions to finish.
    pub shutdown_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            handshake_secs: 10,
            idle_secs: 30,
            shutdown_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// A named virtual-host route.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Backend address (e.g., "10.0.0.5:25565" or "lobby.internal:25565").
    /// A bare ":port" refers to localhost.
    pub backend: String,

    /// Regular expression searched for in the requested "host:port".
    pub pattern: String,
}

impl RouteConfig {
    /// Backend address with a bare `:port` expanded to localhost.
    pub fn backend_address(&self) -> String {
        with_default_host(&self.backend, "127.0.0.1")
    }
}

fn with_default_host(address: &str, host: &str) -> String {
    if address.starts_with(':') {
        format!("{}{}", host, address)
    } else {
        address.to_string()
    }
}
