//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: backend assumed down, requests fail fast
//! - Half-Open: testing if backend recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= failure_threshold
//! Open → Half-Open: first eligibility check after open_timeout
//! Half-Open → Closed: trial request succeeds
//! Half-Open → Open: trial request fails
//! ```
//!
//! # Design Decisions
//! - Per-backend breaker (not global); the owning `Backend` wraps it in a
//!   mutex so transitions are linearized per backend
//! - Fail fast in Open state, no network call attempted
//! - Single outstanding trial in Half-Open; a trial that never reports an
//!   outcome is reclaimed after another `open_timeout`
//! - Every (state, elapsed, outcome) combination is handled; there is no
//!   undefined flag state

use std::time::{Duration, Instant};

/// Breaker state. `Closed` is the initial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Failure-gating state machine for a single backend.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: CircuitState,
    failure_count: u32,
    opened_at: Option<Instant>,
    trial_started_at: Option<Instant>,
    failure_threshold: u32,
    open_timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, open_timeout: Duration) -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            opened_at: None,
            trial_started_at: None,
            failure_threshold: failure_threshold.max(1),
            open_timeout,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    /// Eligibility check. Returns whether a request may be routed to the
    /// backend right now.
    ///
    /// While Open this fails fast until `open_timeout` has elapsed, at which
    /// point exactly the next check transitions to Half-Open and admits one
    /// trial. The trial slot itself is claimed by [`begin_trial`] once the
    /// backend is actually picked, so an eligibility check that does not lead
    /// to a dispatch never blocks the trial.
    ///
    /// [`begin_trial`]: CircuitBreaker::begin_trial
    pub fn admits(&mut self, now: Instant) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = self
                    .opened_at
                    .map(|t| now.duration_since(t) >= self.open_timeout)
                    .unwrap_or(true);
                if elapsed {
                    self.state = CircuitState::HalfOpen;
                    self.trial_started_at = None;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => match self.trial_started_at {
                None => true,
                // Reclaim a trial whose outcome never arrived (e.g. the
                // backend was removed mid-flight and the outcome discarded).
                Some(started) => now.duration_since(started) >= self.open_timeout,
            },
        }
    }

    /// Claim the Half-Open trial slot. Called when the backend is dispatched
    /// to, not when it is merely inspected. No-op outside Half-Open.
    pub fn begin_trial(&mut self, now: Instant) {
        if self.state == CircuitState::HalfOpen {
            self.trial_started_at = Some(now);
        }
    }

    /// Record a successful forwarding outcome.
    pub fn record_success(&mut self) {
        match self.state {
            CircuitState::Closed => {
                self.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                self.state = CircuitState::Closed;
                self.failure_count = 0;
                self.opened_at = None;
                self.trial_started_at = None;
            }
            // Outcome of an attempt admitted before the circuit opened;
            // the open timer keeps running.
            CircuitState::Open => {}
        }
    }

    /// Record a failed forwarding outcome.
    pub fn record_failure(&mut self, now: Instant) {
        match self.state {
            CircuitState::Closed => {
                self.failure_count += 1;
                if self.failure_count >= self.failure_threshold {
                    self.state = CircuitState::Open;
                    self.opened_at = Some(now);
                }
            }
            CircuitState::HalfOpen => {
                self.state = CircuitState::Open;
                self.opened_at = Some(now);
                self.trial_started_at = None;
            }
            CircuitState::Open => {}
        }
    }
}
