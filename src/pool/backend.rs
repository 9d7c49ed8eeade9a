//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent one addressable instance of a downstream service
//! - Track health state maintained by the active health checker
//! - Gate traffic through the embedded circuit breaker
//!
//! # Design Decisions
//! - Health recovery is asymmetric: one successful probe restores health,
//!   `failure_threshold` consecutive failed probes condemn it
//! - A new backend is unhealthy (unknown) until its first probe succeeds,
//!   unless the pool is configured to assume health (probing disabled)
//! - All mutation goes through `&self` methods; the pool never hands out
//!   mutable references

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Instant;
use url::Url;
use uuid::Uuid;

use crate::resilience::{CircuitBreaker, CircuitState};

/// A single backend server.
#[derive(Debug)]
pub struct Backend {
    /// Stable identity, assigned at creation.
    pub id: Uuid,
    /// The address of the backend.
    pub addr: SocketAddr,
    /// Pre-calculated base URL for forwarding and probing.
    pub base_url: Url,
    /// Weight for weighted round-robin selection, always >= 1.
    weight: AtomicU32,
    /// Health flag maintained by the active health checker.
    healthy: AtomicBool,
    /// Consecutive failed probes since the last successful one.
    health_failures: AtomicU32,
    /// When the last probe (of either outcome) completed.
    last_probe: Mutex<Option<Instant>>,
    /// Per-backend failure gate; the mutex linearizes transitions.
    circuit: Mutex<CircuitBreaker>,
}

impl Backend {
    pub fn new(addr: SocketAddr, weight: u32, healthy: bool, circuit: CircuitBreaker) -> Self {
        // SocketAddr always formats into a valid authority.
        let base_url = Url::parse(&format!("http://{addr}")).expect("valid backend url");
        Self {
            id: Uuid::new_v4(),
            addr,
            base_url,
            weight: AtomicU32::new(weight.max(1)),
            healthy: AtomicBool::new(healthy),
            health_failures: AtomicU32::new(0),
            last_probe: Mutex::new(None),
            circuit: Mutex::new(circuit),
        }
    }

    pub fn weight(&self) -> u32 {
        self.weight.load(Ordering::Relaxed)
    }

    /// Update the weight, clamped to >= 1. Health and circuit state are
    /// deliberately untouched: a discovery weight update is not a restart.
    pub fn set_weight(&self, weight: u32) {
        self.weight.store(weight.max(1), Ordering::Relaxed);
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn health_failures(&self) -> u32 {
        self.health_failures.load(Ordering::Relaxed)
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit.lock().expect("circuit lock").state()
    }

    /// Eligible for selection: healthy and admitted by the circuit breaker.
    ///
    /// The circuit check may transition Open → Half-Open when `open_timeout`
    /// has elapsed; the health check is evaluated first so an unhealthy
    /// backend never consumes that transition.
    pub fn is_eligible(&self, now: Instant) -> bool {
        self.is_healthy() && self.circuit.lock().expect("circuit lock").admits(now)
    }

    /// Claim the Half-Open trial slot on dispatch.
    pub fn begin_attempt(&self, now: Instant) {
        self.circuit.lock().expect("circuit lock").begin_trial(now);
    }

    /// Report a successful forwarding attempt.
    pub fn record_success(&self) {
        self.circuit.lock().expect("circuit lock").record_success();
    }

    /// Report a failed forwarding attempt. Returns the resulting circuit
    /// state so callers can log the transition.
    pub fn record_failure(&self, now: Instant) -> CircuitState {
        let mut circuit = self.circuit.lock().expect("circuit lock");
        circuit.record_failure(now);
        circuit.state()
    }

    /// Report a successful health probe. Returns true if the backend was
    /// previously unhealthy (i.e. this probe restored it).
    pub fn record_probe_success(&self, now: Instant) -> bool {
        self.health_failures.store(0, Ordering::Relaxed);
        *self.last_probe.lock().expect("probe lock") = Some(now);
        !self.healthy.swap(true, Ordering::Relaxed)
    }

    /// Report a failed health probe. Returns the consecutive failure count;
    /// at `threshold` the backend is marked unhealthy.
    pub fn record_probe_failure(&self, now: Instant, threshold: u32) -> u32 {
        let failures = self.health_failures.fetch_add(1, Ordering::Relaxed) + 1;
        *self.last_probe.lock().expect("probe lock") = Some(now);
        if failures >= threshold {
            self.healthy.store(false, Ordering::Relaxed);
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn backend(healthy: bool) -> Backend {
        let circuit = CircuitBreaker::new(3, Duration::from_secs(30));
        Backend::new("127.0.0.1:3000".parse().unwrap(), 1, healthy, circuit)
    }

    #[test]
    fn test_new_backend_starts_unhealthy() {
        let b = backend(false);
        assert!(!b.is_healthy());
        assert!(!b.is_eligible(Instant::now()));
        assert_eq!(b.circuit_state(), CircuitState::Closed);
    }

    #[test]
    fn test_single_probe_success_restores_health() {
        let b = backend(false);
        let now = Instant::now();

        // Pile up failures well past the threshold.
        for _ in 0..10 {
            b.record_probe_failure(now, 3);
        }
        assert!(!b.is_healthy());

        assert!(b.record_probe_success(now));
        assert!(b.is_healthy());
        assert_eq!(b.health_failures(), 0);
    }

    #[test]
    fn test_condemnation_needs_threshold_failures() {
        let b = backend(false);
        let now = Instant::now();
        b.record_probe_success(now);

        b.record_probe_failure(now, 3);
        b.record_probe_failure(now, 3);
        assert!(b.is_healthy());

        b.record_probe_failure(now, 3);
        assert!(!b.is_healthy());
    }

    #[test]
    fn test_open_circuit_blocks_eligibility() {
        let b = backend(true);
        let now = Instant::now();
        assert!(b.is_eligible(now));

        for _ in 0..3 {
            b.record_failure(now);
        }
        assert_eq!(b.circuit_state(), CircuitState::Open);
        assert!(!b.is_eligible(now + Duration::from_secs(1)));

        // Health flag is orthogonal to the circuit.
        assert!(b.is_healthy());
    }

    #[test]
    fn test_weight_clamped_to_one() {
        let b = backend(true);
        b.set_weight(0);
        assert_eq!(b.weight(), 1);
        b.set_weight(5);
        assert_eq!(b.weight(), 5);
    }
}
