//! Virtual-host proxy for game-server handshakes.
//!
//! Every inbound connection starts with a handshake naming a virtual host,
//! a port and a next state. The proxy decodes it, picks a backend by matching
//! `host:port` against the configured routes, then either relays one status
//! exchange or rewrites the handshake with the client's address and pipes the
//! login session through.

// Core subsystems
pub mod config;
pub mod protocol;
pub mod proxy;
pub mod routing;

// Plumbing
pub mod net;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::ProxyConfig;
pub use lifecycle::Shutdown;
pub use proxy::ProxyServer;
