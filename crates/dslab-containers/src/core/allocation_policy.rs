//! Allocation policies deciding where VMs and compute units are placed.

use std::collections::BTreeMap;

use crate::core::common::{Allocation, AllocationVerdict};
use crate::core::placement_algorithm::PlacementAlgorithm;
use crate::core::resource_pool::ResourcePool;

/// Decides placement of entities (VMs or compute units) onto targets (hosts or VMs) and remembers the decisions.
///
/// The datacenter holds policies as shared handles, so the same policy object may be inspected or replaced
/// from outside the controller.
pub trait AllocationPolicy {
    /// Registers placement target with the given capacity.
    fn add_target(&mut self, target: u32, cpu_total: u32, memory_total: u64);

    /// Forgets the target and all placements on it.
    fn remove_target(&mut self, target: u32);

    /// Places the entity on one of the candidate targets and returns the selected target.
    /// Returns `None` if no candidate fits or if the entity is already placed.
    fn allocate(&mut self, alloc: &Allocation, candidates: &[u32]) -> Option<u32>;

    /// Records an existing placement of the entity on the target without consulting the placement algorithm.
    /// Returns `false` if the entity is already placed or the target lacks capacity.
    fn restore(&mut self, alloc: &Allocation, target: u32) -> bool;

    /// Releases resources held by the entity and returns the target it was placed on.
    fn deallocate(&mut self, entity: u32) -> Option<u32>;

    /// Returns the target the entity is placed on.
    fn locate(&self, entity: u32) -> Option<u32>;
}

/// Allocation policy backed by a resource pool and a placement algorithm.
pub struct PlacementPolicy {
    algorithm: Box<dyn PlacementAlgorithm>,
    pool: ResourcePool,
    placements: BTreeMap<u32, u32>,
}

impl PlacementPolicy {
    pub fn new(algorithm: Box<dyn PlacementAlgorithm>) -> Self {
        Self {
            algorithm,
            pool: ResourcePool::new(),
            placements: BTreeMap::new(),
        }
    }

    pub fn pool(&self) -> &ResourcePool {
        &self.pool
    }
}

impl AllocationPolicy for PlacementPolicy {
    fn add_target(&mut self, target: u32, cpu_total: u32, memory_total: u64) {
        self.pool.add_target(target, cpu_total, memory_total);
    }

    fn remove_target(&mut self, target: u32) {
        if let Some(info) = self.pool.remove_target(target) {
            for entity in info.allocations.keys() {
                self.placements.remove(entity);
            }
        }
    }

    fn allocate(&mut self, alloc: &Allocation, candidates: &[u32]) -> Option<u32> {
        if self.placements.contains_key(&alloc.id) {
            return None;
        }
        let target = self.algorithm.select_target(alloc, candidates, &self.pool)?;
        if self.pool.allocate(alloc, target) != AllocationVerdict::Success {
            return None;
        }
        self.placements.insert(alloc.id, target);
        Some(target)
    }

    fn restore(&mut self, alloc: &Allocation, target: u32) -> bool {
        if self.placements.contains_key(&alloc.id) {
            return false;
        }
        if self.pool.allocate(alloc, target) != AllocationVerdict::Success {
            return false;
        }
        self.placements.insert(alloc.id, target);
        true
    }

    fn deallocate(&mut self, entity: u32) -> Option<u32> {
        let target = self.placements.remove(&entity)?;
        self.pool.release(entity, target);
        Some(target)
    }

    fn locate(&self, entity: u32) -> Option<u32> {
        self.placements.get(&entity).copied()
    }
}
