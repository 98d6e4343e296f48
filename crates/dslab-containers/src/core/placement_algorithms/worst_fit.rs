//! Worst Fit algorithm.

use crate::core::common::{Allocation, AllocationVerdict};
use crate::core::placement_algorithm::PlacementAlgorithm;
use crate::core::resource_pool::ResourcePool;

/// Uses the suitable candidate with the largest amount of available cores.
#[derive(Default)]
pub struct WorstFit;

impl WorstFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl PlacementAlgorithm for WorstFit {
    fn select_target(&self, alloc: &Allocation, candidates: &[u32], pool: &ResourcePool) -> Option<u32> {
        let mut result: Option<u32> = None;
        let mut max_available_cpu: u32 = 0;

        for &target in candidates {
            if pool.can_allocate(alloc, target) == AllocationVerdict::Success
                && (result.is_none() || pool.get_available_cpu(target) > max_available_cpu)
            {
                max_available_cpu = pool.get_available_cpu(target);
                result = Some(target);
            }
        }
        result
    }
}
