//! Compute unit lifecycle: submission, destruction and migration.

use dslab_core::component::Id;
use dslab_core::{log_debug, log_info, log_warn};

use crate::core::datacenter::{Datacenter, MigrationKind, MigrationRecord};
use crate::core::error::{DatacenterError, EntityRef};
use crate::core::events::task::{TaskCancelled, TaskReturned};
use crate::core::events::unit::{UnitCreateAck, UnitDestroyAck, UnitMigrateAck, UnitMigrateRequest};
use crate::core::unit::{ComputeUnit, UnitSpec};

impl Datacenter {
    /// Places the unit on one of the VMs and returns the selected VM.
    pub fn submit_unit(&mut self, spec: UnitSpec) -> Result<u32, DatacenterError> {
        if self.units.contains_key(&spec.id) {
            return Err(DatacenterError::AlreadyExists(EntityRef::Unit(spec.id)));
        }
        let candidates = self.vm_list();
        let vm_id = self
            .unit_allocation_policy
            .borrow_mut()
            .allocate(&spec.allocation(), &candidates)
            .ok_or(DatacenterError::PlacementFailure(EntityRef::Unit(spec.id)))?;

        let mut unit = ComputeUnit::new(spec);
        match self.vms.get_mut(&vm_id) {
            Some(vm) => vm.add_unit(unit.id),
            None => {
                self.unit_allocation_policy.borrow_mut().deallocate(unit.id);
                return Err(DatacenterError::NotFound(EntityRef::Vm(vm_id)));
            }
        }
        unit.set_vm(Some(vm_id));
        unit.set_being_instantiated(false);
        let unit_id = unit.id;
        log_debug!(self.ctx, "unit #{} is placed on vm #{}", unit_id, vm_id);
        self.units.insert(unit_id, unit);
        self.regrant_unit(unit_id);
        Ok(vm_id)
    }

    /// Destroys the unit. Finished tasks are returned to their owners, unfinished ones are cancelled.
    pub fn destroy_unit(&mut self, unit_id: u32) -> Result<(), DatacenterError> {
        let now = self.ctx.time();
        let mut unit = self
            .units
            .shift_remove(&unit_id)
            .ok_or(DatacenterError::NotFound(EntityRef::Unit(unit_id)))?;
        self.unit_allocation_policy.borrow_mut().deallocate(unit_id);
        for vm in self.vms.values_mut() {
            vm.remove_unit(unit_id);
            // nothing left to wait for
            if vm.remove_migrating_in(unit_id) && vm.units_migrating_in().is_empty() {
                vm.set_in_waiting(false);
            }
        }

        let mips = unit.granted_mips();
        unit.scheduler_mut().update_processing(now, mips);
        while let Some(task) = unit.scheduler_mut().next_finished() {
            let owner = task.owner;
            self.ctx.emit_now(
                TaskReturned {
                    datacenter: self.id,
                    task,
                },
                owner,
            );
        }
        for task in unit.scheduler_mut().drain_unfinished(now) {
            let owner = task.owner;
            self.ctx.emit_now(
                TaskCancelled {
                    datacenter: self.id,
                    task_id: task.id,
                    task: Some(task),
                },
                owner,
            );
        }
        log_debug!(self.ctx, "unit #{} is destroyed", unit_id);
        Ok(())
    }

    /// Moves the unit to the VM: releases it on the current VM, then allocates it on the destination.
    ///
    /// Failure of the second phase leaves the unit without a VM and is returned as a fatal
    /// [`DatacenterError::MigrationFailure`].
    pub fn migrate_unit(&mut self, unit_id: u32, vm_id: u32) -> Result<(), DatacenterError> {
        if !self.vms.contains_key(&vm_id) {
            return Err(DatacenterError::NotFound(EntityRef::Vm(vm_id)));
        }
        let alloc = match self.units.get_mut(&unit_id) {
            Some(unit) => {
                unit.set_in_migration(true);
                unit.allocation()
            }
            None => return Err(DatacenterError::NotFound(EntityRef::Unit(unit_id))),
        };
        // account progress made on the source VM
        self.update_task_processing();

        let source = self.unit_allocation_policy.borrow_mut().deallocate(unit_id);
        if let Some(source_id) = source {
            if let Some(vm) = self.vms.get_mut(&source_id) {
                vm.remove_unit(unit_id);
            }
        }
        if let Some(vm) = self.vms.get_mut(&vm_id) {
            vm.remove_migrating_in(unit_id);
        }
        if let Some(unit) = self.units.get_mut(&unit_id) {
            unit.set_vm(None);
        }

        if self
            .unit_allocation_policy
            .borrow_mut()
            .allocate(&alloc, &[vm_id])
            .is_none()
        {
            return Err(DatacenterError::MigrationFailure {
                entity: EntityRef::Unit(unit_id),
                target: EntityRef::Vm(vm_id),
            });
        }
        if let Some(vm) = self.vms.get_mut(&vm_id) {
            vm.add_unit(unit_id);
            if vm.is_in_waiting() {
                vm.set_in_waiting(false);
            }
        }
        if let Some(unit) = self.units.get_mut(&unit_id) {
            unit.set_vm(Some(vm_id));
        }
        self.regrant_unit(unit_id);
        if let Some(unit) = self.units.get_mut(&unit_id) {
            unit.set_in_migration(false);
        }

        self.migrations.push(MigrationRecord {
            time: self.ctx.time(),
            kind: MigrationKind::Unit,
            entity_id: unit_id,
            source_id: source,
            target_id: vm_id,
        });
        log_info!(self.ctx, "migration of unit #{} to vm #{} is completed", unit_id, vm_id);
        Ok(())
    }

    /// Starts migration of the unit to the VM, the unit is moved after `memory / network_throughput`.
    /// If `wait` is set, the destination VM is marked as waiting for the unit until it arrives.
    /// Returns the migration delay.
    pub fn schedule_unit_migration(&mut self, unit_id: u32, vm_id: u32, wait: bool) -> Result<f64, DatacenterError> {
        let vm = self
            .vms
            .get_mut(&vm_id)
            .ok_or(DatacenterError::NotFound(EntityRef::Vm(vm_id)))?;
        let unit = self
            .units
            .get_mut(&unit_id)
            .ok_or(DatacenterError::NotFound(EntityRef::Unit(unit_id)))?;
        if unit.is_in_migration() {
            return Err(DatacenterError::InMigration(EntityRef::Unit(unit_id)));
        }
        unit.set_in_migration(true);
        vm.add_migrating_in(unit_id);
        if wait {
            vm.set_in_waiting(true);
        }
        let delay = unit.memory as f64 / self.sim_config.network_throughput;
        self.ctx.emit_self(
            UnitMigrateRequest {
                unit_id,
                vm_id,
                ack: false,
            },
            delay,
        );
        log_debug!(self.ctx, "unit #{} will be migrated to vm #{} in {:.3}", unit_id, vm_id, delay);
        Ok(delay)
    }

    pub(super) fn on_unit_submit(&mut self, units: Vec<UnitSpec>, ack: bool, requester: Id) {
        for spec in units {
            let unit_id = spec.id;
            let result = self.submit_unit(spec);
            if let Err(error) = &result {
                log_warn!(self.ctx, "failed to create unit #{}: {}", unit_id, error);
            }
            if ack {
                self.ctx.emit_now(
                    UnitCreateAck {
                        vm_id: result.as_ref().ok().copied(),
                        unit_id,
                        success: result.is_ok(),
                    },
                    requester,
                );
            }
        }
    }

    pub(super) fn on_unit_destroy(&mut self, unit_id: u32, ack: bool, requester: Id) {
        if let Err(error) = self.destroy_unit(unit_id) {
            log_warn!(self.ctx, "failed to destroy unit #{}: {}", unit_id, error);
        }
        if ack {
            self.ctx.emit_now(
                UnitDestroyAck {
                    datacenter: self.id,
                    unit_id,
                    success: true,
                },
                requester,
            );
        }
    }

    pub(super) fn on_unit_migrate(&mut self, unit_id: u32, vm_id: u32, ack: bool, requester: Id) {
        let result = match self.units.get(&unit_id) {
            // scheduled migrations are sent by the datacenter itself
            Some(unit) if unit.is_in_migration() && requester != self.id => {
                Err(DatacenterError::InMigration(EntityRef::Unit(unit_id)))
            }
            _ => self.migrate_unit(unit_id, vm_id),
        };
        if ack {
            self.ctx.emit_now(
                UnitMigrateAck {
                    datacenter: self.id,
                    unit_id,
                    success: result.is_ok(),
                },
                requester,
            );
        }
        if let Err(error) = result {
            self.report(error);
        }
    }
}
