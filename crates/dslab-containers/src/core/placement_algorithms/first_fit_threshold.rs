//! First Fit with threshold algorithm.

use crate::core::common::{Allocation, AllocationVerdict};
use crate::core::config::options::parse_options;
use crate::core::config::ConfigError;
use crate::core::placement_algorithm::PlacementAlgorithm;
use crate::core::resource_pool::ResourcePool;

/// Uses the first suitable candidate whose CPU and memory load after placement do not exceed `threshold`.
pub struct FirstFitThreshold {
    threshold: f64,
}

impl FirstFitThreshold {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        let options = parse_options(s);
        let value = options.get("threshold").cloned().unwrap_or_default();
        let threshold = value.parse::<f64>().map_err(|_| ConfigError::InvalidOption {
            option: "threshold".to_string(),
            value,
        })?;
        Ok(Self { threshold })
    }

    fn load_after(used: f64, requested: f64, total: f64) -> f64 {
        if total == 0. {
            return 1.;
        }
        (used + requested) / total
    }
}

impl PlacementAlgorithm for FirstFitThreshold {
    fn select_target(&self, alloc: &Allocation, candidates: &[u32], pool: &ResourcePool) -> Option<u32> {
        candidates.iter().copied().find(|&target| {
            if pool.can_allocate(alloc, target) != AllocationVerdict::Success {
                return false;
            }
            let cpu_total = pool.get_total_cpu(target) as f64;
            let memory_total = pool.get_total_memory(target) as f64;
            let cpu_load = Self::load_after(
                cpu_total - pool.get_available_cpu(target) as f64,
                alloc.cpu_usage as f64,
                cpu_total,
            );
            let memory_load = Self::load_after(
                memory_total - pool.get_available_memory(target) as f64,
                alloc.memory_usage as f64,
                memory_total,
            );
            cpu_load <= self.threshold && memory_load <= self.threshold
        })
    }
}
