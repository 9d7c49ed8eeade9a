//! Configuration subsystem.
//!
//! # Responsibilities
//! - Define the full config schema with serde defaults (`schema.rs`)
//! - Load and parse TOML config files (`loader.rs`)
//! - Validate semantic rules the parser cannot express (`validation.rs`)

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BackendSeed, CircuitBreakerConfig, ForwardingConfig, HealthCheckConfig, ListenerConfig,
    ObservabilityConfig, ProxyConfig, RouteConfig, ServiceConfig,
};
pub use validation::{validate_config, ValidationError};
