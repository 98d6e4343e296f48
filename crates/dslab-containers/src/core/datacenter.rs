//! Resource lifecycle controller of a container datacenter.

mod task_handlers;
mod unit_handlers;
mod vm_handlers;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Serialize;

use dslab_core::cast;
use dslab_core::component::Id;
use dslab_core::context::SimulationContext;
use dslab_core::event::{Event, EventId};
use dslab_core::handler::EventHandler;
use dslab_core::{log_debug, log_error, log_warn};

use crate::core::allocation_policy::AllocationPolicy;
use crate::core::config::SimulationConfig;
use crate::core::error::{DatacenterError, EntityRef};
use crate::core::events::datacenter::{Characteristics, CharacteristicsRequest, CheckTaskCompletion, UpdateProcessing};
use crate::core::events::task::{
    TaskCancelRequest, TaskMoveRequest, TaskPauseRequest, TaskResumeRequest, TaskReturned, TaskStatusRequest,
    TaskSubmitRequest,
};
use crate::core::events::unit::{UnitDestroyRequest, UnitMigrateRequest, UnitSubmitRequest};
use crate::core::events::vm::{VmCreateRequest, VmDestroyRequest, VmMigrateRequest};
use crate::core::host::Host;
use crate::core::storage::TransferTimeEstimator;
use crate::core::task::TaskRef;
use crate::core::unit::ComputeUnit;
use crate::core::vm::VirtualMachine;

/// Kind of a migrated entity.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MigrationKind {
    Vm,
    Unit,
}

impl Display for MigrationKind {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            MigrationKind::Vm => write!(f, "vm"),
            MigrationKind::Unit => write!(f, "unit"),
        }
    }
}

/// Completed migration of a VM or a compute unit.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct MigrationRecord {
    pub time: f64,
    pub kind: MigrationKind,
    pub entity_id: u32,
    /// Host or VM the entity was placed on before the migration.
    pub source_id: Option<u32>,
    pub target_id: u32,
}

/// Datacenter controller.
///
/// Owns the host → VM → unit hierarchy, delegates placement decisions to the VM and unit allocation policies,
/// drives task processing in compute units and replies to requesters.
pub struct Datacenter {
    pub id: Id,
    hosts: BTreeMap<u32, Host>,
    vms: IndexMap<u32, VirtualMachine>,
    units: IndexMap<u32, ComputeUnit>,
    vm_allocation_policy: Rc<RefCell<dyn AllocationPolicy>>,
    unit_allocation_policy: Rc<RefCell<dyn AllocationPolicy>>,
    transfer_estimator: Box<dyn TransferTimeEstimator>,
    next_update: Option<(EventId, f64)>,
    migrations: Vec<MigrationRecord>,
    fatal_error: Option<DatacenterError>,
    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl Datacenter {
    pub fn new(
        vm_allocation_policy: Rc<RefCell<dyn AllocationPolicy>>,
        unit_allocation_policy: Rc<RefCell<dyn AllocationPolicy>>,
        transfer_estimator: Box<dyn TransferTimeEstimator>,
        ctx: SimulationContext,
        sim_config: Rc<SimulationConfig>,
    ) -> Self {
        Self {
            id: ctx.id(),
            hosts: BTreeMap::new(),
            vms: IndexMap::new(),
            units: IndexMap::new(),
            vm_allocation_policy,
            unit_allocation_policy,
            transfer_estimator,
            next_update: None,
            migrations: Vec::new(),
            fatal_error: None,
            ctx,
            sim_config,
        }
    }

    /// Adds a host and registers it as a placement target of the VM allocation policy.
    pub fn add_host(&mut self, name: &str, cores: u32, memory: u64, core_speed: f64) -> u32 {
        let id = self.hosts.keys().next_back().map_or(0, |id| id + 1);
        self.hosts.insert(id, Host::new(id, name, cores, memory, core_speed));
        self.vm_allocation_policy.borrow_mut().add_target(id, cores, memory);
        log_debug!(self.ctx, "added host #{} ({}): {} cores, {} memory", id, name, cores, memory);
        id
    }

    /// Replaces the VM allocation policy. Hosts and current VM placements are registered in the new policy
    /// as they are, regardless of its placement algorithm.
    pub fn set_vm_allocation_policy(&mut self, policy: Rc<RefCell<dyn AllocationPolicy>>) {
        {
            let mut new_policy = policy.borrow_mut();
            for host in self.hosts.values() {
                new_policy.add_target(host.id, host.cores, host.memory);
            }
            for vm in self.vms.values() {
                if let Some(host_id) = vm.host_id() {
                    if !new_policy.restore(&vm.allocation(), host_id) {
                        log_warn!(self.ctx, "vm #{} does not fit into host #{} of the new policy", vm.id, host_id);
                    }
                }
            }
        }
        self.vm_allocation_policy = policy;
    }

    /// Replaces the unit allocation policy. VMs and current unit placements are registered in the new policy
    /// as they are, regardless of its placement algorithm.
    pub fn set_unit_allocation_policy(&mut self, policy: Rc<RefCell<dyn AllocationPolicy>>) {
        {
            let mut new_policy = policy.borrow_mut();
            for vm in self.vms.values() {
                new_policy.add_target(vm.id, vm.cores, vm.memory);
            }
            for unit in self.units.values() {
                if let Some(vm_id) = unit.vm_id() {
                    if !new_policy.restore(&unit.allocation(), vm_id) {
                        log_warn!(self.ctx, "unit #{} does not fit into vm #{} of the new policy", unit.id, vm_id);
                    }
                }
            }
        }
        self.unit_allocation_policy = policy;
    }

    pub fn host(&self, host_id: u32) -> Option<&Host> {
        self.hosts.get(&host_id)
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values()
    }

    pub fn vm(&self, vm_id: u32) -> Option<&VirtualMachine> {
        self.vms.get(&vm_id)
    }

    /// IDs of VMs owned by the datacenter in creation order.
    pub fn vm_list(&self) -> Vec<u32> {
        self.vms.keys().copied().collect()
    }

    pub fn unit(&self, unit_id: u32) -> Option<&ComputeUnit> {
        self.units.get(&unit_id)
    }

    /// IDs of compute units owned by the datacenter in creation order.
    pub fn unit_list(&self) -> Vec<u32> {
        self.units.keys().copied().collect()
    }

    /// Returns the host of the VM according to the VM allocation policy.
    pub fn vm_location(&self, vm_id: u32) -> Option<u32> {
        self.vm_allocation_policy.borrow().locate(vm_id)
    }

    /// Returns the VM of the unit according to the unit allocation policy.
    pub fn unit_location(&self, unit_id: u32) -> Option<u32> {
        self.unit_allocation_policy.borrow().locate(unit_id)
    }

    pub fn migrations(&self) -> &[MigrationRecord] {
        &self.migrations
    }

    /// Error which halted the datacenter, if any.
    pub fn fatal_error(&self) -> Option<&DatacenterError> {
        self.fatal_error.as_ref()
    }

    pub fn characteristics(&self) -> Characteristics {
        Characteristics {
            datacenter: self.id,
            host_count: self.hosts.len() as u32,
            cores: self.hosts.values().map(|host| host.cores).sum(),
            memory: self.hosts.values().map(|host| host.memory).sum(),
            total_mips: self.hosts.values().map(|host| host.total_mips()).sum(),
            cost_per_second: self.sim_config.cost_per_second,
            cost_per_bw: self.sim_config.cost_per_bw,
        }
    }

    /// Writes completed migrations to a CSV file.
    pub fn save_migration_log(&self, path: &str) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_path(path)?;
        for record in &self.migrations {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Advances task processing in all resident units to the current time
    /// and schedules the next wake-up at the earliest predicted task event.
    pub fn update_task_processing(&mut self) {
        let now = self.ctx.time();
        let mut next_time: Option<f64> = None;
        let mut running_tasks = 0;
        for unit_id in self.resident_units() {
            if let Some(unit) = self.units.get_mut(&unit_id) {
                let mips = unit.granted_mips();
                if let Some(time) = unit.scheduler_mut().update_processing(now, mips) {
                    next_time = Some(next_time.map_or(time, |t| t.min(time)));
                }
                running_tasks += unit.scheduler().task_count();
            }
        }
        if self.sim_config.scheduling_interval > 0. && running_tasks > 0 {
            let interval_time = now + self.sim_config.scheduling_interval;
            next_time = Some(next_time.map_or(interval_time, |t| t.min(interval_time)));
        }
        if let Some(time) = next_time {
            self.schedule_update_at(time);
        }
    }

    /// Returns finished tasks of all resident units to their owners, returns the number of returned tasks.
    ///
    /// The scan walks hosts → VMs → units, so it only reaches units attached to the hierarchy.
    pub fn check_task_completion(&mut self) -> usize {
        let mut returned = 0;
        for unit_id in self.resident_units() {
            if let Some(unit) = self.units.get_mut(&unit_id) {
                while let Some(task) = unit.scheduler_mut().next_finished() {
                    log_debug!(
                        self.ctx,
                        "task #{} finished on unit #{}, returning it to {}",
                        task.id,
                        unit_id,
                        self.ctx.lookup_name(task.owner)
                    );
                    let owner = task.owner;
                    self.ctx.emit_now(
                        TaskReturned {
                            datacenter: self.id,
                            task,
                        },
                        owner,
                    );
                    returned += 1;
                }
            }
        }
        returned
    }

    /// Schedules processing update at the given time unless an earlier one is already pending.
    fn schedule_update_at(&mut self, time: f64) {
        let now = self.ctx.time();
        if !time.is_finite() {
            return;
        }
        let time = time.max(now);
        if let Some((event_id, pending_time)) = self.next_update {
            if pending_time <= time {
                return;
            }
            self.ctx.cancel_event(event_id);
        }
        let event_id = self.ctx.emit_self(UpdateProcessing {}, time - now);
        self.next_update = Some((event_id, time));
    }

    /// Units reachable through the hosts → VMs → units hierarchy.
    fn resident_units(&self) -> Vec<u32> {
        let mut result = Vec::new();
        for host in self.hosts.values() {
            for vm_id in host.vms() {
                if let Some(vm) = self.vms.get(vm_id) {
                    result.extend(vm.units().iter().copied());
                }
            }
        }
        result
    }

    /// Resolves host → VM → unit chain of the task reference, checking ownership of the VM and the unit.
    fn resolve_unit(&self, task: &TaskRef) -> Result<u32, DatacenterError> {
        let vm = self
            .vms
            .get(&task.vm_id)
            .filter(|vm| vm.owner == task.owner)
            .ok_or(DatacenterError::NotFound(EntityRef::Vm(task.vm_id)))?;
        let host_id = vm.host_id().ok_or(DatacenterError::NotFound(EntityRef::Vm(vm.id)))?;
        self.hosts
            .get(&host_id)
            .filter(|host| host.has_vm(vm.id))
            .ok_or(DatacenterError::NotFound(EntityRef::Host(host_id)))?;
        self.units
            .get(&task.unit_id)
            .filter(|unit| unit.owner == task.owner && unit.vm_id() == Some(vm.id))
            .ok_or(DatacenterError::NotFound(EntityRef::Unit(task.unit_id)))?;
        Ok(task.unit_id)
    }

    fn host_core_speed(&self, host_id: Option<u32>) -> f64 {
        host_id
            .and_then(|id| self.hosts.get(&id))
            .map_or(0., |host| host.core_speed)
    }

    fn vm_core_speed(&self, vm_id: u32) -> f64 {
        self.host_core_speed(self.vms.get(&vm_id).and_then(|vm| vm.host_id()))
    }

    /// Sets granted capacity of the unit and advances its tasks with the previous capacity.
    fn regrant_unit(&mut self, unit_id: u32) {
        let now = self.ctx.time();
        let core_speed = match self.units.get(&unit_id).and_then(|unit| unit.vm_id()) {
            Some(vm_id) => self.vm_core_speed(vm_id),
            None => 0.,
        };
        let next_time = match self.units.get_mut(&unit_id) {
            Some(unit) => {
                let mips = unit.cores as f64 * core_speed;
                unit.set_granted_mips(mips);
                unit.scheduler_mut().update_processing(now, mips)
            }
            None => None,
        };
        if let Some(time) = next_time {
            self.schedule_update_at(time);
        }
    }

    /// Logs the error, fatal errors halt the datacenter.
    fn report(&mut self, error: DatacenterError) {
        if error.is_fatal() {
            log_error!(self.ctx, "{}, halting", error);
            self.fatal_error = Some(error);
        } else {
            log_warn!(self.ctx, "{}", error);
        }
    }

    fn on_characteristics_request(&mut self, requester: Id) {
        let characteristics = self.characteristics();
        self.ctx.emit_now(characteristics, requester);
    }

    fn on_update_processing(&mut self) {
        self.next_update = None;
        self.update_task_processing();
        self.check_task_completion();
    }
}

impl EventHandler for Datacenter {
    fn on(&mut self, event: Event) {
        if let Some(error) = &self.fatal_error {
            log_error!(
                self.ctx,
                "dropping event from {}: {}",
                self.ctx.lookup_name(event.src),
                DatacenterError::Halted(error.to_string())
            );
            return;
        }
        cast!(match event.data {
            VmCreateRequest { vm, ack } => {
                self.on_vm_create(vm, ack);
            }
            VmDestroyRequest { vm_id, ack } => {
                self.on_vm_destroy(vm_id, ack, event.src);
            }
            VmMigrateRequest { vm_id, host_id, ack } => {
                self.on_vm_migrate(vm_id, host_id, ack, event.src);
            }
            UnitSubmitRequest { units, ack } => {
                self.on_unit_submit(units, ack, event.src);
            }
            UnitMigrateRequest { unit_id, vm_id, ack } => {
                self.on_unit_migrate(unit_id, vm_id, ack, event.src);
            }
            UnitDestroyRequest { unit_id, ack } => {
                self.on_unit_destroy(unit_id, ack, event.src);
            }
            TaskSubmitRequest { task, ack } => {
                self.on_task_submit(task, ack);
            }
            TaskPauseRequest { payload, ack } => {
                self.on_task_pause(payload, ack);
            }
            TaskResumeRequest { payload, ack } => {
                self.on_task_resume(payload, ack);
            }
            TaskCancelRequest { payload, ack } => {
                self.on_task_cancel(payload, ack);
            }
            TaskStatusRequest { payload } => {
                self.on_task_status(payload);
            }
            TaskMoveRequest {
                task,
                vm_id,
                unit_id,
                datacenter,
                ack,
            } => {
                self.on_task_move(task, vm_id, unit_id, datacenter, ack);
            }
            CharacteristicsRequest {} => {
                self.on_characteristics_request(event.src);
            }
            UpdateProcessing {} => {
                self.on_update_processing();
            }
            CheckTaskCompletion {} => {
                self.check_task_completion();
            }
        })
    }
}
