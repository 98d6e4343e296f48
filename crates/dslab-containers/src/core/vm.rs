use std::collections::BTreeSet;

use serde::Serialize;

use dslab_core::component::Id;

use crate::core::common::Allocation;

/// VM creation parameters sent by users.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct VmSpec {
    pub id: u32,
    pub owner: Id,
    pub cores: u32,
    pub memory: u64,
}

impl VmSpec {
    pub fn new(id: u32, owner: Id, cores: u32, memory: u64) -> Self {
        Self {
            id,
            owner,
            cores,
            memory,
        }
    }

    pub fn allocation(&self) -> Allocation {
        Allocation {
            id: self.id,
            cpu_usage: self.cores,
            memory_usage: self.memory,
        }
    }
}

/// Virtual machine running on a host and hosting compute units.
#[derive(Clone, Debug)]
pub struct VirtualMachine {
    pub id: u32,
    pub owner: Id,
    pub cores: u32,
    pub memory: u64,
    host_id: Option<u32>,
    being_instantiated: bool,
    in_migration: bool,
    in_waiting: bool,
    units: BTreeSet<u32>,
    units_migrating_in: BTreeSet<u32>,
    granted_mips: f64,
}

impl VirtualMachine {
    pub fn new(spec: VmSpec) -> Self {
        Self {
            id: spec.id,
            owner: spec.owner,
            cores: spec.cores,
            memory: spec.memory,
            host_id: None,
            being_instantiated: true,
            in_migration: false,
            in_waiting: false,
            units: BTreeSet::new(),
            units_migrating_in: BTreeSet::new(),
            granted_mips: 0.,
        }
    }

    pub fn allocation(&self) -> Allocation {
        Allocation {
            id: self.id,
            cpu_usage: self.cores,
            memory_usage: self.memory,
        }
    }

    pub fn host_id(&self) -> Option<u32> {
        self.host_id
    }

    pub fn is_being_instantiated(&self) -> bool {
        self.being_instantiated
    }

    pub fn is_in_migration(&self) -> bool {
        self.in_migration
    }

    /// Whether the VM waits for a unit scheduled to migrate to it.
    pub fn is_in_waiting(&self) -> bool {
        self.in_waiting
    }

    /// Compute units currently placed on this VM.
    pub fn units(&self) -> &BTreeSet<u32> {
        &self.units
    }

    pub fn units_migrating_in(&self) -> &BTreeSet<u32> {
        &self.units_migrating_in
    }

    pub fn granted_mips(&self) -> f64 {
        self.granted_mips
    }

    pub(crate) fn set_host(&mut self, host_id: Option<u32>) {
        self.host_id = host_id;
    }

    pub(crate) fn set_being_instantiated(&mut self, value: bool) {
        self.being_instantiated = value;
    }

    pub(crate) fn set_in_migration(&mut self, value: bool) {
        self.in_migration = value;
    }

    pub(crate) fn set_in_waiting(&mut self, value: bool) {
        self.in_waiting = value;
    }

    pub(crate) fn set_granted_mips(&mut self, mips: f64) {
        self.granted_mips = mips;
    }

    pub(crate) fn add_unit(&mut self, unit_id: u32) {
        self.units.insert(unit_id);
    }

    pub(crate) fn remove_unit(&mut self, unit_id: u32) -> bool {
        self.units.remove(&unit_id)
    }

    pub(crate) fn add_migrating_in(&mut self, unit_id: u32) {
        self.units_migrating_in.insert(unit_id);
    }

    pub(crate) fn remove_migrating_in(&mut self, unit_id: u32) -> bool {
        self.units_migrating_in.remove(&unit_id)
    }
}
