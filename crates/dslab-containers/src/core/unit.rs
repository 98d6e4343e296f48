use serde::Serialize;

use dslab_core::component::Id;

use crate::core::common::Allocation;
use crate::core::task_scheduler::{TaskScheduler, TaskSchedulerKind};

/// Compute unit (container) creation parameters sent by users.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct UnitSpec {
    pub id: u32,
    pub owner: Id,
    pub cores: u32,
    pub memory: u64,
    pub scheduler: TaskSchedulerKind,
}

impl UnitSpec {
    pub fn new(id: u32, owner: Id, cores: u32, memory: u64) -> Self {
        Self {
            id,
            owner,
            cores,
            memory,
            scheduler: TaskSchedulerKind::TimeShared,
        }
    }

    pub fn with_scheduler(mut self, scheduler: TaskSchedulerKind) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn allocation(&self) -> Allocation {
        Allocation {
            id: self.id,
            cpu_usage: self.cores,
            memory_usage: self.memory,
        }
    }
}

/// Container running inside a VM and executing tasks.
pub struct ComputeUnit {
    pub id: u32,
    pub owner: Id,
    pub cores: u32,
    pub memory: u64,
    vm_id: Option<u32>,
    being_instantiated: bool,
    in_migration: bool,
    granted_mips: f64,
    scheduler: Box<dyn TaskScheduler>,
}

impl ComputeUnit {
    pub fn new(spec: UnitSpec) -> Self {
        Self {
            id: spec.id,
            owner: spec.owner,
            cores: spec.cores,
            memory: spec.memory,
            vm_id: None,
            being_instantiated: true,
            in_migration: false,
            granted_mips: 0.,
            scheduler: spec.scheduler.build(spec.cores),
        }
    }

    pub fn allocation(&self) -> Allocation {
        Allocation {
            id: self.id,
            cpu_usage: self.cores,
            memory_usage: self.memory,
        }
    }

    pub fn vm_id(&self) -> Option<u32> {
        self.vm_id
    }

    pub fn is_being_instantiated(&self) -> bool {
        self.being_instantiated
    }

    pub fn is_in_migration(&self) -> bool {
        self.in_migration
    }

    pub fn granted_mips(&self) -> f64 {
        self.granted_mips
    }

    pub fn scheduler(&self) -> &dyn TaskScheduler {
        self.scheduler.as_ref()
    }

    pub(crate) fn scheduler_mut(&mut self) -> &mut dyn TaskScheduler {
        self.scheduler.as_mut()
    }

    pub(crate) fn set_vm(&mut self, vm_id: Option<u32>) {
        self.vm_id = vm_id;
    }

    pub(crate) fn set_being_instantiated(&mut self, value: bool) {
        self.being_instantiated = value;
    }

    pub(crate) fn set_in_migration(&mut self, value: bool) {
        self.in_migration = value;
    }

    pub(crate) fn set_granted_mips(&mut self, mips: f64) {
        self.granted_mips = mips;
    }
}
