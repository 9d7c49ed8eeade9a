//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so a minimal config stays minimal.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Route definitions mapping requests to logical services.
    pub routes: Vec<RouteConfig>,

    /// Static seed backends per service. Dynamic membership arrives through
    /// the discovery feed at runtime.
    pub services: Vec<ServiceConfig>,

    /// Active health check settings.
    pub health_check: HealthCheckConfig,

    /// Per-backend circuit breaker settings.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Forwarding, timeout and retry settings.
    pub forwarding: ForwardingConfig,

    /// Weight for backends configured or discovered without one.
    pub default_weight: u32,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            routes: Vec::new(),
            services: Vec::new(),
            health_check: HealthCheckConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            forwarding: ForwardingConfig::default(),
            default_weight: 1,
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Route configuration mapping requests to a logical service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Host header to match (exact match, port ignored).
    pub host: Option<String>,

    /// Path prefix to match.
    pub path_prefix: Option<String>,

    /// Logical service to forward to.
    pub service: String,

    /// Route priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,
}

/// Static seed for one logical service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Logical service name, referenced by routes and discovery events.
    pub name: String,

    /// Initial backends; discovery may add or remove more later.
    #[serde(default)]
    pub backends: Vec<BackendSeed>,
}

/// One statically configured backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendSeed {
    /// Backend address (e.g., "127.0.0.1:3000").
    pub address: String,

    /// Weight for weighted round-robin; absent uses `default_weight`.
    pub weight: Option<u32>,
}

/// Active health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable active health checks. When disabled, backends are assumed
    /// healthy (nothing else would ever mark them so).
    pub enabled: bool,

    /// Probe interval in seconds.
    pub interval_secs: u64,

    /// Per-probe timeout in seconds.
    pub timeout_secs: u64,

    /// Path to probe on each backend.
    pub path: String,

    /// Consecutive probe failures before marking unhealthy. A single
    /// success restores health regardless of prior failures.
    pub failure_threshold: u32,

    /// Consecutive probe failures before removing the backend from the
    /// pool entirely. Disabled when absent.
    pub eviction_threshold: Option<u32>,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 5,
            timeout_secs: 2,
            path: "/health".to_string(),
            failure_threshold: 3,
            eviction_threshold: None,
        }
    }
}

/// Circuit breaker configuration, applied per backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive forwarding failures before the circuit opens.
    pub failure_threshold: u32,

    /// Seconds an open circuit fails fast before admitting one trial.
    pub open_timeout_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            open_timeout_secs: 30,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_secs(self.open_timeout_secs)
    }
}

/// Forwarding, timeout and retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Per-attempt timeout in seconds for outbound calls.
    pub request_timeout_secs: u64,

    /// Maximum retries after the initial attempt, each against a backend
    /// not yet tried by this request.
    pub max_retries: u32,

    /// Base delay for retry backoff in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Cap for retry backoff in milliseconds.
    pub retry_max_delay_ms: u64,

    /// Upstream status codes counted as attempt failures.
    pub retryable_statuses: Vec<u16>,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            max_retries: 2,
            retry_base_delay_ms: 50,
            retry_max_delay_ms: 1000,
            retryable_statuses: vec![502, 503, 504],
        }
    }
}

impl ForwardingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = ProxyConfig::default();
        assert_eq!(config.circuit_breaker.failure_threshold, 3);
        assert_eq!(config.circuit_breaker.open_timeout_secs, 30);
        assert_eq!(config.forwarding.max_retries, 2);
        assert_eq!(config.health_check.path, "/health");
        assert_eq!(config.health_check.failure_threshold, 3);
        assert_eq!(config.default_weight, 1);
        assert!(config.health_check.eviction_threshold.is_none());
    }

    #[test]
    fn test_minimal_toml_parses_with_defaults() {
        let toml = r#"
            [listener]
            bind_address = "127.0.0.1:9999"

            [[routes]]
            name = "all"
            path_prefix = "/"
            service = "web"

            [[services]]
            name = "web"

            [[services.backends]]
            address = "127.0.0.1:3001"
            weight = 2
        "#;
        let config: ProxyConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9999");
        assert_eq!(config.services[0].backends[0].weight, Some(2));
        assert_eq!(config.forwarding.retryable_statuses, vec![502, 503, 504]);
        assert!(config.health_check.enabled);
    }
}
