//! First Fit algorithm.

use crate::core::common::{Allocation, AllocationVerdict};
use crate::core::placement_algorithm::PlacementAlgorithm;
use crate::core::resource_pool::ResourcePool;

/// Uses the first suitable candidate.
#[derive(Default)]
pub struct FirstFit;

impl FirstFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl PlacementAlgorithm for FirstFit {
    fn select_target(&self, alloc: &Allocation, candidates: &[u32], pool: &ResourcePool) -> Option<u32> {
        candidates
            .iter()
            .copied()
            .find(|&target| pool.can_allocate(alloc, target) == AllocationVerdict::Success)
    }
}
