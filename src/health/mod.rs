//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! interval tick
//!     → active.rs derives probe set from current pool membership
//!     → concurrent GET {probe_path} per backend, bounded timeout
//!     → outcome applied to the backend's health flag
//!         (discarded if the backend left the pool meanwhile)
//! ```
//!
//! # Design Decisions
//! - Probing is out-of-band: request traffic never waits on a probe
//! - Asymmetric thresholds: fast recovery (one success), slow condemnation
//!   (N consecutive failures) to avoid flapping
//! - Forwarding failures feed the circuit breaker, not the health flag;
//!   the two eligibility inputs stay independent

pub mod active;

pub use active::HealthChecker;
