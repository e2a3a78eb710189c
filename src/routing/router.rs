//! Route lookup.
//!
//! # Responsibilities
//! - Resolve backend addresses and compile patterns at startup
//! - Keep routes in definition order
//! - Pick the route for a requested host and port
//!
//! # Design Decisions
//! - Immutable after construction (shared via Arc without locks)
//! - Last match wins: later definitions override earlier ones, so a
//!   catch-all `default` listed first acts as a base rule
//! - The fallback route is resolved once and held by index

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

use thiserror::Error;

use crate::config::{RouteConfig, DEFAULT_ROUTE};
use crate::routing::matcher::HostPattern;

/// Errors raised while building the route table. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("route {route:?}: cannot resolve backend {address:?}: {source}")]
    Resolve {
        route: String,
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("route {route:?}: invalid pattern: {source}")]
    Pattern {
        route: String,
        #[source]
        source: regex::Error,
    },

    #[error("no route named \"default\"")]
    MissingDefault,
}

/// A compiled route.
#[derive(Debug, Clone)]
pub struct Route {
    name: String,
    backend: SocketAddr,
    pattern: HostPattern,
}

impl Route {
    /// Resolve and compile a configured route.
    pub fn from_config(config: &RouteConfig) -> Result<Self, RouteError> {
        let address = config.backend_address();
        let backend = resolve(&address).map_err(|source| RouteError::Resolve {
            route: config.name.clone(),
            address: address.clone(),
            source,
        })?;
        let pattern = HostPattern::compile(&config.pattern).map_err(|source| RouteError::Pattern {
            route: config.name.clone(),
            source,
        })?;

        Ok(Self {
            name: config.name.clone(),
            backend,
            pattern,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backend(&self) -> SocketAddr {
        self.backend
    }

    pub fn pattern(&self) -> &HostPattern {
        &self.pattern
    }
}

fn resolve(address: &str) -> io::Result<SocketAddr> {
    address.to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "address resolved to nothing")
    })
}

/// Ordered, immutable set of routes with an explicit fallback.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
    fallback: usize,
}

impl RouteTable {
    /// Build the table from configuration, preserving definition order.
    pub fn from_config(configs: &[RouteConfig]) -> Result<Self, RouteError> {
        let routes = configs
            .iter()
            .map(Route::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(routes)
    }

    /// Build the table from already compiled routes.
    pub fn new(routes: Vec<Route>) -> Result<Self, RouteError> {
        let fallback = routes
            .iter()
            .position(|r| r.name == DEFAULT_ROUTE)
            .ok_or(RouteError::MissingDefault)?;
        Ok(Self { routes, fallback })
    }

    /// Select the route for a requested host and port.
    ///
    /// With a single configured route the fallback is returned without
    /// evaluating any pattern. Otherwise the last route whose pattern matches
    /// `"{host}:{port}"` wins, and the fallback covers the no-match case.
    pub fn select(&self, host: &str, port: u16) -> &Route {
        if self.routes.len() == 1 {
            return self.fallback();
        }

        let target = format!("{}:{}", host, port);
        self.routes
            .iter()
            .rev()
            .find(|route| route.pattern.matches(&target))
            .unwrap_or_else(|| self.fallback())
    }

    /// The route named `default`.
    pub fn fallback(&self) -> &Route {
        &self.routes[self.fallback]
    }

    /// Routes in match order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
