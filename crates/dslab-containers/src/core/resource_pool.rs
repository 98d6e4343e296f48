//! Resource pool state.

use std::collections::BTreeMap;

use crate::core::common::{Allocation, AllocationVerdict};

/// Stores capacity and current allocations of a single placement target (host or VM).
#[derive(Clone, Debug)]
pub struct TargetInfo {
    pub cpu_total: u32,
    pub memory_total: u64,

    pub cpu_available: u32,
    pub memory_available: u64,

    pub allocations: BTreeMap<u32, Allocation>,
}

impl TargetInfo {
    pub fn new(cpu_total: u32, memory_total: u64) -> Self {
        Self {
            cpu_total,
            memory_total,
            cpu_available: cpu_total,
            memory_available: memory_total,
            allocations: BTreeMap::new(),
        }
    }
}

/// Tracks resources of placement targets. Targets are never overcommitted.
#[derive(Clone, Debug, Default)]
pub struct ResourcePool {
    targets: BTreeMap<u32, TargetInfo>,
}

impl ResourcePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_target(&mut self, id: u32, cpu_total: u32, memory_total: u64) {
        self.targets.insert(id, TargetInfo::new(cpu_total, memory_total));
    }

    /// Removes target together with its allocations.
    pub fn remove_target(&mut self, id: u32) -> Option<TargetInfo> {
        self.targets.remove(&id)
    }

    pub fn contains_target(&self, id: u32) -> bool {
        self.targets.contains_key(&id)
    }

    /// Checks if the specified allocation is currently possible on the specified target.
    pub fn can_allocate(&self, alloc: &Allocation, target_id: u32) -> AllocationVerdict {
        let target = match self.targets.get(&target_id) {
            Some(target) => target,
            None => return AllocationVerdict::TargetNotFound,
        };
        if target.cpu_available < alloc.cpu_usage {
            return AllocationVerdict::NotEnoughCPU;
        }
        if target.memory_available < alloc.memory_usage {
            return AllocationVerdict::NotEnoughMemory;
        }
        AllocationVerdict::Success
    }

    /// Applies the allocation on the target if it fits, returns the verdict.
    pub fn allocate(&mut self, alloc: &Allocation, target_id: u32) -> AllocationVerdict {
        let verdict = self.can_allocate(alloc, target_id);
        if verdict != AllocationVerdict::Success {
            return verdict;
        }
        if let Some(target) = self.targets.get_mut(&target_id) {
            if target.allocations.contains_key(&alloc.id) {
                return AllocationVerdict::Success;
            }
            target.cpu_available -= alloc.cpu_usage;
            target.memory_available -= alloc.memory_usage;
            target.allocations.insert(alloc.id, alloc.clone());
        }
        verdict
    }

    /// Removes the allocation with the specified id from the target.
    pub fn release(&mut self, alloc_id: u32, target_id: u32) -> Option<Allocation> {
        let target = self.targets.get_mut(&target_id)?;
        let alloc = target.allocations.remove(&alloc_id)?;
        target.cpu_available += alloc.cpu_usage;
        target.memory_available += alloc.memory_usage;
        Some(alloc)
    }

    pub fn get_allocation(&self, alloc_id: u32, target_id: u32) -> Option<&Allocation> {
        self.targets.get(&target_id)?.allocations.get(&alloc_id)
    }

    pub fn get_total_cpu(&self, target_id: u32) -> u32 {
        self.targets[&target_id].cpu_total
    }

    pub fn get_total_memory(&self, target_id: u32) -> u64 {
        self.targets[&target_id].memory_total
    }

    pub fn get_available_cpu(&self, target_id: u32) -> u32 {
        self.targets[&target_id].cpu_available
    }

    pub fn get_available_memory(&self, target_id: u32) -> u64 {
        self.targets[&target_id].memory_available
    }

    /// Returns the CPU allocation rate (ratio of allocated to total resources) of the target.
    pub fn get_cpu_load(&self, target_id: u32) -> f64 {
        let target = &self.targets[&target_id];
        if target.cpu_total == 0 {
            return 1.;
        }
        1. - target.cpu_available as f64 / target.cpu_total as f64
    }

    /// Returns the memory allocation rate (ratio of allocated to total resources) of the target.
    pub fn get_memory_load(&self, target_id: u32) -> f64 {
        let target = &self.targets[&target_id];
        if target.memory_total == 0 {
            return 1.;
        }
        1. - target.memory_available as f64 / target.memory_total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alloc(id: u32, cpu_usage: u32, memory_usage: u64) -> Allocation {
        Allocation {
            id,
            cpu_usage,
            memory_usage,
        }
    }

    #[test]
    fn test_allocate_and_release() {
        let mut pool = ResourcePool::new();
        pool.add_target(0, 8, 16);

        assert_eq!(pool.allocate(&alloc(1, 6, 4), 0), AllocationVerdict::Success);
        assert_eq!(pool.can_allocate(&alloc(2, 4, 4), 0), AllocationVerdict::NotEnoughCPU);
        assert_eq!(pool.can_allocate(&alloc(2, 2, 14), 0), AllocationVerdict::NotEnoughMemory);
        assert_eq!(pool.can_allocate(&alloc(2, 2, 4), 1), AllocationVerdict::TargetNotFound);
        assert_eq!(pool.get_cpu_load(0), 0.75);
        assert_eq!(pool.get_memory_load(0), 0.25);

        // rejected allocations leave the pool untouched
        assert_eq!(pool.allocate(&alloc(2, 4, 4), 0), AllocationVerdict::NotEnoughCPU);
        assert_eq!(pool.get_available_cpu(0), 2);

        assert_eq!(pool.release(1, 0), Some(alloc(1, 6, 4)));
        assert_eq!(pool.release(1, 0), None);
        assert_eq!(pool.get_available_cpu(0), 8);
        assert_eq!(pool.get_available_memory(0), 16);
    }

    #[test]
    fn test_repeated_allocation_is_counted_once() {
        let mut pool = ResourcePool::new();
        pool.add_target(3, 4, 4);
        pool.allocate(&alloc(1, 2, 2), 3);
        pool.allocate(&alloc(1, 2, 2), 3);
        assert_eq!(pool.get_available_cpu(3), 2);
        assert!(pool.get_allocation(1, 3).is_some());
        assert!(pool.remove_target(3).is_some());
        assert!(!pool.contains_target(3));
    }
}
