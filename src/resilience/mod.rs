//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Forwarding attempt outcome
//!     → circuit_breaker.rs (per-backend failure gating)
//!     → pool eligibility (Open circuits excluded, fail fast)
//!
//! Attempt failed and retries remain
//!     → backoff.rs (jittered delay before the next attempt)
//! ```
//!
//! # Design Decisions
//! - The breaker is embedded in each `Backend`, never shared across backends
//! - Transitions are total functions of (state, elapsed time, outcome)
//! - Retry delay is the forwarding proxy's concern; the breaker only gates

pub mod backoff;
pub mod circuit_breaker;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
