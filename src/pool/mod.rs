//! Backend pool management.
//!
//! # Responsibilities
//! - Own the set of backends for each logical service
//! - Apply discovery mutations (upsert / remove) under a per-service
//!   exclusive section
//! - Answer eligibility snapshots and selection requests
//!
//! # Design Decisions
//! - One `DashMap` entry per service; the shard lock is the per-service
//!   critical section, so unrelated services never contend
//! - `eligible()` returns cloned `Arc`s: callers observe a point-in-time
//!   snapshot that a concurrent mutation cannot tear
//! - Outcomes for backends that have left the pool are discarded; the
//!   in-flight request itself completes independently
//! - The weighted round-robin cursor only ever increments; validity across
//!   membership changes comes from taking it modulo the current snapshot

pub mod backend;

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

use crate::balancer::Selector;
use crate::pool::backend::Backend;
use crate::resilience::{CircuitBreaker, CircuitState};

/// Defaults applied to every backend the pool creates.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// Forwarding failures before a backend's circuit opens.
    pub circuit_failure_threshold: u32,
    /// How long an open circuit fails fast before admitting a trial.
    pub circuit_open_timeout: Duration,
    /// Weight for backends added without one.
    pub default_weight: u32,
    /// Treat new backends as healthy immediately. Set when active probing
    /// is disabled, otherwise nothing would ever become eligible.
    pub assume_healthy: bool,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            circuit_failure_threshold: 3,
            circuit_open_timeout: Duration::from_secs(30),
            default_weight: 1,
            assume_healthy: false,
        }
    }
}

/// Per-service state: ordered backends plus the selection cursor.
#[derive(Debug, Default)]
struct ServiceState {
    backends: Vec<Arc<Backend>>,
    cursor: u64,
}

/// Thread-safe registry of backends keyed by logical service name.
pub struct BackendPool {
    services: DashMap<String, ServiceState>,
    settings: PoolSettings,
    selector: Arc<dyn Selector>,
}

impl BackendPool {
    pub fn new(settings: PoolSettings, selector: Arc<dyn Selector>) -> Self {
        Self {
            services: DashMap::new(),
            settings,
            selector,
        }
    }

    /// Add a backend or update the weight of an existing one.
    ///
    /// An upsert of a known address touches weight only; health and circuit
    /// state survive. Returns true if a new backend was created.
    pub fn upsert(&self, service: &str, addr: SocketAddr, weight: Option<u32>) -> bool {
        let mut entry = self.services.entry(service.to_string()).or_default();

        if let Some(existing) = entry.backends.iter().find(|b| b.addr == addr) {
            if let Some(weight) = weight {
                existing.set_weight(weight);
                tracing::debug!(service, %addr, weight, "Backend weight updated");
            }
            return false;
        }

        let circuit = CircuitBreaker::new(
            self.settings.circuit_failure_threshold,
            self.settings.circuit_open_timeout,
        );
        let backend = Arc::new(Backend::new(
            addr,
            weight.unwrap_or(self.settings.default_weight),
            self.settings.assume_healthy,
            circuit,
        ));
        tracing::info!(service, %addr, weight = backend.weight(), "Backend added");
        entry.backends.push(backend);
        true
    }

    /// Remove a backend by address. Idempotent: removing an unknown address
    /// is a no-op. The service entry survives empty so `eligible()` keeps
    /// answering with an empty list.
    pub fn remove(&self, service: &str, addr: SocketAddr) -> bool {
        let Some(mut entry) = self.services.get_mut(service) else {
            return false;
        };
        let before = entry.backends.len();
        entry.backends.retain(|b| b.addr != addr);
        let removed = entry.backends.len() < before;
        if removed {
            tracing::info!(service, %addr, "Backend removed");
        }
        removed
    }

    /// Remove a backend by id (health-checker eviction path).
    pub fn remove_by_id(&self, service: &str, id: Uuid) -> bool {
        let Some(mut entry) = self.services.get_mut(service) else {
            return false;
        };
        let before = entry.backends.len();
        entry.backends.retain(|b| b.id != id);
        entry.backends.len() < before
    }

    /// Point-in-time snapshot of the eligible backends, in insertion order.
    ///
    /// Evaluating eligibility performs each backend's Open → Half-Open
    /// admission check when its open timeout has elapsed.
    pub fn eligible(&self, service: &str) -> Vec<Arc<Backend>> {
        let now = Instant::now();
        self.services
            .get(service)
            .map(|entry| {
                entry
                    .backends
                    .iter()
                    .filter(|b| b.is_eligible(now))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Select the next backend for a request, skipping `exclude` (backends
    /// already tried in this request). Advances the service cursor and claims
    /// the Half-Open trial slot on the chosen backend.
    pub fn select(&self, service: &str, exclude: &HashSet<Uuid>) -> Option<Arc<Backend>> {
        let now = Instant::now();
        let mut entry = self.services.get_mut(service)?;

        let candidates: Vec<Arc<Backend>> = entry
            .backends
            .iter()
            .filter(|b| !exclude.contains(&b.id) && b.is_eligible(now))
            .cloned()
            .collect();

        let cursor = entry.cursor;
        entry.cursor = entry.cursor.wrapping_add(1);

        let chosen = self.selector.select(&candidates, cursor)?;
        chosen.begin_attempt(now);
        Some(chosen)
    }

    /// Whether the backend still belongs to the service.
    pub fn contains(&self, service: &str, id: Uuid) -> bool {
        self.services
            .get(service)
            .map(|entry| entry.backends.iter().any(|b| b.id == id))
            .unwrap_or(false)
    }

    /// Report a successful forwarding attempt. Discarded if the backend has
    /// been removed meanwhile.
    pub fn report_success(&self, service: &str, backend: &Backend) {
        if !self.contains(service, backend.id) {
            tracing::debug!(service, addr = %backend.addr, "Outcome discarded, backend gone");
            return;
        }
        backend.record_success();
    }

    /// Report a failed forwarding attempt, same discard rule.
    pub fn report_failure(&self, service: &str, backend: &Backend) {
        if !self.contains(service, backend.id) {
            tracing::debug!(service, addr = %backend.addr, "Outcome discarded, backend gone");
            return;
        }
        let state = backend.record_failure(Instant::now());
        if state == CircuitState::Open {
            tracing::warn!(
                service,
                addr = %backend.addr,
                "Circuit open, backend failing fast"
            );
        }
    }

    /// All backends across all services, for the health checker to re-derive
    /// its probe set each cycle.
    pub fn all_backends(&self) -> Vec<(String, Arc<Backend>)> {
        self.services
            .iter()
            .flat_map(|entry| {
                let service = entry.key().clone();
                entry
                    .value()
                    .backends
                    .iter()
                    .map(move |b| (service.clone(), b.clone()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Total backend count, for startup logging.
    pub fn backend_count(&self) -> usize {
        self.services.iter().map(|e| e.backends.len()).sum()
    }
}

impl std::fmt::Debug for BackendPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendPool")
            .field("services", &self.services.len())
            .field("backends", &self.backend_count())
            .finish()
    }
}
