//! Placement algorithms used by allocation policies.

use crate::core::common::Allocation;
use crate::core::config::options::parse_config_value;
use crate::core::config::ConfigError;
use crate::core::placement_algorithms::best_fit::BestFit;
use crate::core::placement_algorithms::first_fit::FirstFit;
use crate::core::placement_algorithms::first_fit_threshold::FirstFitThreshold;
use crate::core::placement_algorithms::worst_fit::WorstFit;
use crate::core::resource_pool::ResourcePool;

/// Trait for implementation of placement algorithms.
///
/// The algorithm is defined as a function of allocation request, candidate targets and current resource pool state,
/// which returns an ID of the target selected for placement or `None` if there is no suitable target.
/// Candidates are examined in the order they are passed, targets unknown to the pool are skipped.
pub trait PlacementAlgorithm {
    fn select_target(&self, alloc: &Allocation, candidates: &[u32], pool: &ResourcePool) -> Option<u32>;
}

/// Creates placement algorithm from config string such as `BestFit` or `FirstFitThreshold[threshold=0.8]`.
pub fn placement_algorithm_resolver(config_str: &str) -> Result<Box<dyn PlacementAlgorithm>, ConfigError> {
    let (algorithm_name, options) = parse_config_value(config_str);
    match algorithm_name.as_str() {
        "FirstFit" => Ok(Box::new(FirstFit::new())),
        "BestFit" => Ok(Box::new(BestFit::new())),
        "WorstFit" => Ok(Box::new(WorstFit::new())),
        "FirstFitThreshold" => Ok(Box::new(FirstFitThreshold::from_str(
            options.as_deref().unwrap_or_default(),
        )?)),
        _ => Err(ConfigError::UnknownAlgorithm(config_str.to_string())),
    }
}
