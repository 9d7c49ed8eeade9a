//! Weighted round-robin selection strategy.

use std::sync::Arc;

use crate::pool::backend::Backend;

use super::Selector;

/// Weighted round-robin selector.
///
/// Each backend conceptually occupies `weight` consecutive slots in a virtual
/// sequence of length `Σweight`; the cursor indexes into that sequence modulo
/// its length. With equal weights this degenerates to plain round robin in
/// insertion order.
///
/// The modulo is taken against the current snapshot, so the cursor stays
/// valid across membership and weight changes without being rebased.
#[derive(Debug, Default)]
pub struct WeightedRoundRobin;

impl WeightedRoundRobin {
    pub fn new() -> Self {
        Self
    }
}

impl Selector for WeightedRoundRobin {
    fn select(&self, eligible: &[Arc<Backend>], cursor: u64) -> Option<Arc<Backend>> {
        if eligible.is_empty() {
            return None;
        }

        let total: u64 = eligible.iter().map(|b| u64::from(b.weight())).sum();
        let mut slot = cursor % total;

        for backend in eligible {
            let weight = u64::from(backend.weight());
            if slot < weight {
                return Some(backend.clone());
            }
            slot -= weight;
        }

        // Unreachable: slot < total and the weights sum to total.
        eligible.last().cloned()
    }
}
