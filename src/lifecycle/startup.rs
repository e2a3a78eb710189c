//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the route table from validated configuration
//! - Start the metrics exporter when enabled
//! - Bind the listener
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listener binds last (traffic only when ready)

use thiserror::Error;

use crate::config::ProxyConfig;
use crate::net::{Listener, ListenerError};
use crate::observability::metrics;
use crate::proxy::ProxyServer;
use crate::routing::RouteError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid route table: {0}")]
    Routes(#[from] RouteError),

    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Prepare a server and its bound listener from `config`.
pub async fn start(config: &ProxyConfig) -> Result<(ProxyServer, Listener), StartupError> {
    let server = ProxyServer::from_config(config)?;
    for route in server.routes().routes() {
        tracing::info!(
            route = %route.name(),
            backend = %route.backend(),
            pattern = %route.pattern().as_str(),
            "Route loaded"
        );
    }

    let observability = &config.observability;
    if observability.metrics_enabled {
        let addr = observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let listener = Listener::bind(&config.listener).await?;
    Ok((server, listener))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;

    #[tokio::test]
    async fn binds_after_building_routes() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();

        let (server, listener) = start(&config).await.unwrap();
        assert_eq!(server.routes().fallback().name(), "default");
        assert!(listener.local_addr().unwrap().port() > 0);
    }

    #[tokio::test]
    async fn route_errors_are_fatal() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();
        config.routes = vec![RouteConfig {
            name: "lobby".into(),
            backend: "127.0.0.1:25566".into(),
            pattern: ".".into(),
        }];

        assert!(matches!(
            start(&config).await,
            Err(StartupError::Routes(RouteError::MissingDefault))
        ));
    }

    #[tokio::test]
    async fn bad_metrics_address_is_fatal() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "metrics".into();

        assert!(matches!(start(&config).await, Err(StartupError::MetricsAddress(_))));
    }
}
