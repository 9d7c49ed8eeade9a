//! Backend selection strategies.
//!
//! # Data Flow
//! ```text
//! Pool snapshot (eligible backends, insertion order) + pool-held cursor
//!     → Selector implementation:
//!         - weighted_round_robin.rs (default, deterministic)
//!         - random.rs (uniform pick)
//!     → chosen backend, or None when the list is empty
//! ```
//!
//! # Design Decisions
//! - Selectors are pure per call; the only state is the cursor the pool owns
//! - Empty eligible list returns None, never an error or panic
//! - Equal weights tie-break by insertion order, keeping selection testable

pub mod random;
pub mod weighted_round_robin;

pub use random::Random;
pub use weighted_round_robin::WeightedRoundRobin;

use std::sync::Arc;

use crate::pool::backend::Backend;

/// A selection policy over an eligible-candidate snapshot.
///
/// `cursor` is a monotonically increasing counter held by the pool; stateless
/// policies may ignore it.
pub trait Selector: Send + Sync + std::fmt::Debug {
    fn select(&self, eligible: &[Arc<Backend>], cursor: u64) -> Option<Arc<Backend>>;
}
