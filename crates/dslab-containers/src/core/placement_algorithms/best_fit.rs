//! Best Fit algorithm.

use crate::core::common::{Allocation, AllocationVerdict};
use crate::core::placement_algorithm::PlacementAlgorithm;
use crate::core::resource_pool::ResourcePool;

/// Uses the suitable candidate with the least amount of available cores.
/// Ties are resolved in favor of the earlier candidate.
#[derive(Default)]
pub struct BestFit;

impl BestFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl PlacementAlgorithm for BestFit {
    fn select_target(&self, alloc: &Allocation, candidates: &[u32], pool: &ResourcePool) -> Option<u32> {
        let mut result: Option<u32> = None;
        let mut min_available_cpu: u32 = u32::MAX;

        for &target in candidates {
            if pool.can_allocate(alloc, target) == AllocationVerdict::Success
                && (result.is_none() || pool.get_available_cpu(target) < min_available_cpu)
            {
                min_available_cpu = pool.get_available_cpu(target);
                result = Some(target);
            }
        }
        result
    }
}
