//! Uniform random selection strategy.

use std::sync::Arc;

use crate::pool::backend::Backend;

use super::Selector;

/// Random selector. Ignores the cursor and weights; useful when traffic
/// shaping does not matter and cache-unfriendly striping is acceptable.
#[derive(Debug, Default)]
pub struct Random;

impl Random {
    pub fn new() -> Self {
        Self
    }
}

impl Selector for Random {
    fn select(&self, eligible: &[Arc<Backend>], _cursor: u64) -> Option<Arc<Backend>> {
        if eligible.is_empty() {
            return None;
        }
        Some(eligible[fastrand::usize(..eligible.len())].clone())
    }
}
