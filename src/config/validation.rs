//! Configuration validation.
//!
//! Catches mistakes at startup that would otherwise surface as confusing
//! runtime behavior (a route that can never match, a backend that can never
//! be dialed). Pure functions over the parsed config, so every rule is unit
//! testable without touching the filesystem.

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single configuration problem. Loading reports all of them at once
/// rather than stopping at the first.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener bind_address '{0}' is not a valid socket address")]
    InvalidBindAddress(String),

    #[error("route '{0}' has neither a host nor a path_prefix condition (use path_prefix = \"/\" for a catch-all)")]
    RouteWithoutConditions(String),

    #[error("route '{route}' references unknown service '{service}'")]
    UnknownService { route: String, service: String },

    #[error("service '{service}': backend address '{address}' is not a valid socket address")]
    InvalidBackendAddress { service: String, address: String },

    #[error("service '{service}': backend '{address}' listed more than once")]
    DuplicateBackend { service: String, address: String },

    #[error("service '{service}': backend '{address}' has weight 0 (minimum is 1)")]
    ZeroWeight { service: String, address: String },

    #[error("health_check.interval_secs must be greater than 0")]
    ZeroHealthInterval,

    #[error("health_check.timeout_secs must be greater than 0")]
    ZeroHealthTimeout,

    #[error("forwarding.request_timeout_secs must be greater than 0")]
    ZeroRequestTimeout,

    #[error("circuit_breaker.failure_threshold must be greater than 0")]
    ZeroCircuitThreshold,
}

/// Validate a parsed configuration, returning every problem found.
pub fn validate_config(config: &ProxyConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let known_services: HashSet<&str> = config.services.iter().map(|s| s.name.as_str()).collect();

    for route in &config.routes {
        if route.host.is_none() && route.path_prefix.is_none() {
            errors.push(ValidationError::RouteWithoutConditions(route.name.clone()));
        }
        if !known_services.contains(route.service.as_str()) {
            errors.push(ValidationError::UnknownService {
                route: route.name.clone(),
                service: route.service.clone(),
            });
        }
    }

    for service in &config.services {
        let mut seen = HashSet::new();
        for backend in &service.backends {
            if backend.address.parse::<SocketAddr>().is_err() {
                errors.push(ValidationError::InvalidBackendAddress {
                    service: service.name.clone(),
                    address: backend.address.clone(),
                });
            } else if !seen.insert(backend.address.as_str()) {
                errors.push(ValidationError::DuplicateBackend {
                    service: service.name.clone(),
                    address: backend.address.clone(),
                });
            }
            if backend.weight == Some(0) {
                errors.push(ValidationError::ZeroWeight {
                    service: service.name.clone(),
                    address: backend.address.clone(),
                });
            }
        }
    }

    if config.health_check.interval_secs == 0 {
        errors.push(ValidationError::ZeroHealthInterval);
    }
    if config.health_check.timeout_secs == 0 {
        errors.push(ValidationError::ZeroHealthTimeout);
    }
    if config.forwarding.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }
    if config.circuit_breaker.failure_threshold == 0 {
        errors.push(ValidationError::ZeroCircuitThreshold);
    }

    errors
}
