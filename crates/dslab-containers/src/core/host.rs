use std::collections::BTreeSet;

/// Physical machine hosting VMs.
#[derive(Clone, Debug)]
pub struct Host {
    pub id: u32,
    pub name: String,
    pub cores: u32,
    pub memory: u64,
    /// Processing speed of a single core in MIPS.
    pub core_speed: f64,
    vms: BTreeSet<u32>,
    vms_migrating_in: BTreeSet<u32>,
}

impl Host {
    pub fn new(id: u32, name: &str, cores: u32, memory: u64, core_speed: f64) -> Self {
        Self {
            id,
            name: name.to_string(),
            cores,
            memory,
            core_speed,
            vms: BTreeSet::new(),
            vms_migrating_in: BTreeSet::new(),
        }
    }

    /// VMs currently placed on this host.
    pub fn vms(&self) -> &BTreeSet<u32> {
        &self.vms
    }

    pub fn has_vm(&self, vm_id: u32) -> bool {
        self.vms.contains(&vm_id)
    }

    /// VMs scheduled to migrate to this host.
    pub fn vms_migrating_in(&self) -> &BTreeSet<u32> {
        &self.vms_migrating_in
    }

    pub fn total_mips(&self) -> f64 {
        self.cores as f64 * self.core_speed
    }

    pub(crate) fn add_vm(&mut self, vm_id: u32) {
        self.vms.insert(vm_id);
    }

    pub(crate) fn remove_vm(&mut self, vm_id: u32) -> bool {
        self.vms.remove(&vm_id)
    }

    pub(crate) fn add_migrating_in(&mut self, vm_id: u32) {
        self.vms_migrating_in.insert(vm_id);
    }

    pub(crate) fn remove_migrating_in(&mut self, vm_id: u32) -> bool {
        self.vms_migrating_in.remove(&vm_id)
    }
}
