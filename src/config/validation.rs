//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check value ranges (timeouts > 0, admission limit > 0)
//! - Check route integrity (unique names, compilable patterns, a `default` route)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - Backend name resolution is left to route table construction

use std::collections::HashSet;

use regex::Regex;
use thiserror::Error;

use crate::config::schema::{ProxyConfig, DEFAULT_ROUTE};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid listener bind address {0:?}")]
    InvalidBindAddress(String),

    #[error("listener.max_connections must be greater than zero")]
    ZeroMaxConnections,

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("route #{0} has an empty name")]
    EmptyRouteName(usize),

    #[error("route {0:?} is defined more than once")]
    DuplicateRoute(String),

    #[error("route {0:?} has an empty backend address")]
    EmptyBackend(String),

    #[error("route {route:?} has an invalid pattern: {message}")]
    InvalidPattern { route: String, message: String },

    #[error("no route named \"default\"")]
    MissingDefaultRoute,
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.socket_addr().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }

    let timeouts = &config.timeouts;
    for (field, value) in [
        ("connect_secs", timeouts.connect_secs),
        ("handshake_secs", timeouts.handshake_secs),
        ("idle_secs", timeouts.idle_secs),
        ("shutdown_secs", timeouts.shutdown_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(field));
        }
    }

    let mut seen = HashSet::new();
    for (index, route) in config.routes.iter().enumerate() {
        if route.name.is_empty() {
            errors.push(ValidationError::EmptyRouteName(index));
        } else if !seen.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.name.clone()));
        }
        if route.backend.trim().is_empty() {
            errors.push(ValidationError::EmptyBackend(route.name.clone()));
        }
        if let Err(e) = Regex::new(&route.pattern) {
            errors.push(ValidationError::InvalidPattern {
                route: route.name.clone(),
                message: e.to_string(),
            });
        }
    }
    if !seen.contains(DEFAULT_ROUTE) {
        errors.push(ValidationError::MissingDefaultRoute);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
