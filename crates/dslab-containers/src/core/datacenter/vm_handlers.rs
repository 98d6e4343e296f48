//! VM lifecycle: creation, destruction and migration.

use dslab_core::component::Id;
use dslab_core::{log_debug, log_info, log_warn};

use crate::core::datacenter::{Datacenter, MigrationKind, MigrationRecord};
use crate::core::error::{DatacenterError, EntityRef};
use crate::core::events::vm::{VmCreateAck, VmDestroyAck, VmMigrateAck, VmMigrateRequest};
use crate::core::vm::{VirtualMachine, VmSpec};

impl Datacenter {
    /// Places the VM on one of the hosts and returns the selected host.
    pub fn create_vm(&mut self, spec: VmSpec) -> Result<u32, DatacenterError> {
        if self.vms.contains_key(&spec.id) {
            return Err(DatacenterError::AlreadyExists(EntityRef::Vm(spec.id)));
        }
        let candidates: Vec<u32> = self.hosts.keys().copied().collect();
        let host_id = self
            .vm_allocation_policy
            .borrow_mut()
            .allocate(&spec.allocation(), &candidates)
            .ok_or(DatacenterError::PlacementFailure(EntityRef::Vm(spec.id)))?;

        let mut vm = VirtualMachine::new(spec);
        let core_speed = self.host_core_speed(Some(host_id));
        if let Some(host) = self.hosts.get_mut(&host_id) {
            host.add_vm(vm.id);
        }
        vm.set_host(Some(host_id));
        vm.set_being_instantiated(false);
        vm.set_granted_mips(vm.cores as f64 * core_speed);
        self.unit_allocation_policy
            .borrow_mut()
            .add_target(vm.id, vm.cores, vm.memory);
        log_debug!(self.ctx, "vm #{} is placed on host #{}", vm.id, host_id);
        self.vms.insert(vm.id, vm);
        Ok(host_id)
    }

    /// Destroys the VM together with its compute units.
    pub fn destroy_vm(&mut self, vm_id: u32) -> Result<(), DatacenterError> {
        let (unit_ids, incoming): (Vec<u32>, Vec<u32>) = match self.vms.get(&vm_id) {
            Some(vm) => (
                vm.units().iter().copied().collect(),
                vm.units_migrating_in().iter().copied().collect(),
            ),
            None => return Err(DatacenterError::NotFound(EntityRef::Vm(vm_id))),
        };
        for unit_id in unit_ids {
            self.destroy_unit(unit_id)?;
        }
        // units scheduled to migrate here stay where they are
        for unit_id in incoming {
            if let Some(unit) = self.units.get_mut(&unit_id) {
                unit.set_in_migration(false);
            }
        }
        if let Some(host_id) = self.vm_allocation_policy.borrow_mut().deallocate(vm_id) {
            if let Some(host) = self.hosts.get_mut(&host_id) {
                host.remove_vm(vm_id);
            }
        }
        for host in self.hosts.values_mut() {
            host.remove_migrating_in(vm_id);
        }
        self.unit_allocation_policy.borrow_mut().remove_target(vm_id);
        self.vms.shift_remove(&vm_id);
        log_debug!(self.ctx, "vm #{} is destroyed", vm_id);
        Ok(())
    }

    /// Moves the VM to the host: releases it on the current host, then allocates it on the destination.
    ///
    /// Failure of the second phase leaves the VM without a host and is returned as a fatal
    /// [`DatacenterError::MigrationFailure`].
    pub fn migrate_vm(&mut self, vm_id: u32, host_id: u32) -> Result<(), DatacenterError> {
        if !self.hosts.contains_key(&host_id) {
            return Err(DatacenterError::NotFound(EntityRef::Host(host_id)));
        }
        let alloc = match self.vms.get_mut(&vm_id) {
            Some(vm) => {
                vm.set_in_migration(true);
                vm.allocation()
            }
            None => return Err(DatacenterError::NotFound(EntityRef::Vm(vm_id))),
        };
        // account progress made on the source host
        self.update_task_processing();

        let source = self.vm_allocation_policy.borrow_mut().deallocate(vm_id);
        if let Some(source_id) = source {
            if let Some(host) = self.hosts.get_mut(&source_id) {
                host.remove_vm(vm_id);
            }
        }
        if let Some(host) = self.hosts.get_mut(&host_id) {
            host.remove_migrating_in(vm_id);
        }
        if let Some(vm) = self.vms.get_mut(&vm_id) {
            vm.set_host(None);
        }

        if self.vm_allocation_policy.borrow_mut().allocate(&alloc, &[host_id]).is_none() {
            return Err(DatacenterError::MigrationFailure {
                entity: EntityRef::Vm(vm_id),
                target: EntityRef::Host(host_id),
            });
        }
        let core_speed = self.host_core_speed(Some(host_id));
        if let Some(host) = self.hosts.get_mut(&host_id) {
            host.add_vm(vm_id);
        }
        let unit_ids: Vec<u32> = match self.vms.get_mut(&vm_id) {
            Some(vm) => {
                vm.set_host(Some(host_id));
                vm.set_granted_mips(vm.cores as f64 * core_speed);
                vm.set_in_migration(false);
                vm.units().iter().copied().collect()
            }
            None => Vec::new(),
        };
        for unit_id in unit_ids {
            self.regrant_unit(unit_id);
        }

        self.migrations.push(MigrationRecord {
            time: self.ctx.time(),
            kind: MigrationKind::Vm,
            entity_id: vm_id,
            source_id: source,
            target_id: host_id,
        });
        log_info!(self.ctx, "migration of vm #{} to host #{} is completed", vm_id, host_id);
        Ok(())
    }

    /// Starts migration of the VM to the host, the VM is moved after `memory / network_throughput`.
    /// Returns the migration delay.
    pub fn schedule_vm_migration(&mut self, vm_id: u32, host_id: u32) -> Result<f64, DatacenterError> {
        let host = self
            .hosts
            .get_mut(&host_id)
            .ok_or(DatacenterError::NotFound(EntityRef::Host(host_id)))?;
        let vm = self
            .vms
            .get_mut(&vm_id)
            .ok_or(DatacenterError::NotFound(EntityRef::Vm(vm_id)))?;
        if vm.is_in_migration() {
            return Err(DatacenterError::InMigration(EntityRef::Vm(vm_id)));
        }
        vm.set_in_migration(true);
        host.add_migrating_in(vm_id);
        let delay = vm.memory as f64 / self.sim_config.network_throughput;
        self.ctx.emit_self(
            VmMigrateRequest {
                vm_id,
                host_id,
                ack: false,
            },
            delay,
        );
        log_debug!(self.ctx, "vm #{} will be migrated to host #{} in {:.3}", vm_id, host_id, delay);
        Ok(delay)
    }

    pub(super) fn on_vm_create(&mut self, spec: VmSpec, ack: bool) {
        let vm_id = spec.id;
        let owner = spec.owner;
        let result = self.create_vm(spec);
        if let Err(error) = &result {
            log_warn!(self.ctx, "failed to create vm #{}: {}", vm_id, error);
        }
        if ack {
            self.ctx.emit_now(
                VmCreateAck {
                    datacenter: self.id,
                    vm_id,
                    success: result.is_ok(),
                },
                owner,
            );
        }
    }

    pub(super) fn on_vm_destroy(&mut self, vm_id: u32, ack: bool, requester: Id) {
        let owner = self.vms.get(&vm_id).map_or(requester, |vm| vm.owner);
        if let Err(error) = self.destroy_vm(vm_id) {
            log_warn!(self.ctx, "failed to destroy vm #{}: {}", vm_id, error);
        }
        if ack {
            self.ctx.emit_now(
                VmDestroyAck {
                    datacenter: self.id,
                    vm_id,
                    success: true,
                },
                owner,
            );
        }
    }

    pub(super) fn on_vm_migrate(&mut self, vm_id: u32, host_id: u32, ack: bool, requester: Id) {
        let result = match self.vms.get(&vm_id) {
            // scheduled migrations are sent by the datacenter itself
            Some(vm) if vm.is_in_migration() && requester != self.id => {
                Err(DatacenterError::InMigration(EntityRef::Vm(vm_id)))
            }
            _ => self.migrate_vm(vm_id, host_id),
        };
        if ack {
            self.ctx.emit_now(
                VmMigrateAck {
                    datacenter: self.id,
                    vm_id,
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
