//! Shunt: a health-aware, circuit-breaking load-balancing proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client Request
//!        │
//!        ▼
//!   ┌─────────┐     ┌──────────┐     ┌───────────────┐
//!   │  http   │────▶│ routing  │────▶│     pool      │
//!   │ server  │     │  table   │     │ (per-service) │
//!   └─────────┘     └──────────┘     └───────┬───────┘
//!        ▲                                   │ eligible = healthy
//!        │                                   │            ∧ circuit admits
//!        │                                   ▼
//!   ┌─────────┐     ┌──────────┐     ┌───────────────┐
//!   │response │◀────│ forward  │◀────│   balancer    │
//!   │         │     │ + retry  │     │ weighted RR   │
//!   └─────────┘     └──────────┘     └───────────────┘
//!
//!   Background tasks, off the request path:
//!   ┌────────────────┐   ┌─────────────────────┐
//!   │ health checker │   │ discovery applier   │
//!   │ (active probes)│   │ (add/remove/update) │
//!   └────────────────┘   └─────────────────────┘
//!
//!   Cross-cutting: config · resilience (circuit breaker, backoff)
//!                  observability (tracing, metrics) · lifecycle
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod routing;

// Traffic management
pub mod balancer;
pub mod discovery;
pub mod health;
pub mod pool;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::{load_config, ConfigError, ProxyConfig};
pub use discovery::{DiscoveryEvent, DiscoveryOp};
pub use http::{ProxyError, ProxyServer};
pub use lifecycle::Shutdown;
pub use pool::BackendPool;
