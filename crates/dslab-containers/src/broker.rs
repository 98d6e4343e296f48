//! User-side component sending lifecycle requests to a datacenter and recording the replies.

use dslab_core::cast;
use dslab_core::component::Id;
use dslab_core::context::SimulationContext;
use dslab_core::event::{Event, EventData};
use dslab_core::handler::EventHandler;
use dslab_core::{log_debug, log_info};

use crate::core::events::datacenter::{Characteristics, CharacteristicsRequest};
use crate::core::events::task::{
    TaskCancelAck, TaskCancelRequest, TaskCancelled, TaskMoveAck, TaskMoveRequest, TaskPauseAck, TaskPauseRequest,
    TaskResumeAck, TaskResumeRequest, TaskReturned, TaskStatusReply, TaskStatusRequest, TaskSubmitAck,
    TaskSubmitRequest,
};
use crate::core::events::unit::{
    UnitCreateAck, UnitDestroyAck, UnitDestroyRequest, UnitMigrateAck, UnitMigrateRequest, UnitSubmitRequest,
};
use crate::core::events::vm::{
    VmCreateAck, VmCreateRequest, VmDestroyAck, VmDestroyRequest, VmMigrateAck, VmMigrateRequest,
};
use crate::core::task::{Task, TaskPayload, TaskRef};
use crate::core::unit::UnitSpec;
use crate::core::vm::VmSpec;

/// Sends requests to a single datacenter. Every reply is stored in arrival order.
pub struct Broker {
    pub id: Id,
    datacenter_id: Id,
    pub vm_create_acks: Vec<VmCreateAck>,
    pub vm_destroy_acks: Vec<VmDestroyAck>,
    pub vm_migrate_acks: Vec<VmMigrateAck>,
    pub unit_create_acks: Vec<UnitCreateAck>,
    pub unit_migrate_acks: Vec<UnitMigrateAck>,
    pub unit_destroy_acks: Vec<UnitDestroyAck>,
    pub task_submit_acks: Vec<TaskSubmitAck>,
    pub task_pause_acks: Vec<TaskPauseAck>,
    pub task_resume_acks: Vec<TaskResumeAck>,
    pub task_cancel_acks: Vec<TaskCancelAck>,
    pub task_move_acks: Vec<TaskMoveAck>,
    pub status_replies: Vec<TaskStatusReply>,
    /// Tasks returned by datacenters together with the time they were received.
    pub returned_tasks: Vec<(f64, Task)>,
    pub cancelled_tasks: Vec<TaskCancelled>,
    pub characteristics: Vec<Characteristics>,
    ctx: SimulationContext,
}

impl Broker {
    pub fn new(datacenter_id: Id, ctx: SimulationContext) -> Self {
        Self {
            id: ctx.id(),
            datacenter_id,
            vm_create_acks: Vec::new(),
            vm_destroy_acks: Vec::new(),
            vm_migrate_acks: Vec::new(),
            unit_create_acks: Vec::new(),
            unit_migrate_acks: Vec::new(),
            unit_destroy_acks: Vec::new(),
            task_submit_acks: Vec::new(),
            task_pause_acks: Vec::new(),
            task_resume_acks: Vec::new(),
            task_cancel_acks: Vec::new(),
            task_move_acks: Vec::new(),
            status_replies: Vec::new(),
            returned_tasks: Vec::new(),
            cancelled_tasks: Vec::new(),
            characteristics: Vec::new(),
            ctx,
        }
    }

    pub fn datacenter_id(&self) -> Id {
        self.datacenter_id
    }

    /// Sends arbitrary request to the datacenter after the specified delay.
    pub fn send<T: EventData>(&mut self, request: T, delay: f64) {
        self.ctx.emit(request, self.datacenter_id, delay);
    }

    /// Requests creation of a VM owned by this broker.
    pub fn create_vm(&mut self, vm_id: u32, cores: u32, memory: u64, ack: bool) {
        let vm = VmSpec::new(vm_id, self.id, cores, memory);
        self.send(VmCreateRequest { vm, ack }, 0.);
    }

    pub fn destroy_vm(&mut self, vm_id: u32, ack: bool) {
        self.send(VmDestroyRequest { vm_id, ack }, 0.);
    }

    pub fn migrate_vm(&mut self, vm_id: u32, host_id: u32, ack: bool) {
        self.send(VmMigrateRequest { vm_id, host_id, ack }, 0.);
    }

    pub fn submit_units(&mut self, units: Vec<UnitSpec>, ack: bool) {
        self.send(UnitSubmitRequest { units, ack }, 0.);
    }

    pub fn migrate_unit(&mut self, unit_id: u32, vm_id: u32, ack: bool) {
        self.send(UnitMigrateRequest { unit_id, vm_id, ack }, 0.);
    }

    pub fn destroy_unit(&mut self, unit_id: u32, ack: bool) {
        self.send(UnitDestroyRequest { unit_id, ack }, 0.);
    }

    pub fn submit_task(&mut self, task: Task, ack: bool) {
        self.send(TaskSubmitRequest { task, ack }, 0.);
    }

    pub fn pause_task<P: Into<TaskPayload>>(&mut self, payload: P, ack: bool) {
        self.send(
            TaskPauseRequest {
                payload: payload.into(),
                ack,
            },
            0.,
        );
    }

    pub fn resume_task<P: Into<TaskPayload>>(&mut self, payload: P, ack: bool) {
        self.send(
            TaskResumeRequest {
                payload: payload.into(),
                ack,
            },
            0.,
        );
    }

    pub fn cancel_task<P: Into<TaskPayload>>(&mut self, payload: P, ack: bool) {
        self.send(
            TaskCancelRequest {
                payload: payload.into(),
                ack,
            },
            0.,
        );
    }

    pub fn request_task_status<P: Into<TaskPayload>>(&mut self, payload: P) {
        self.send(
            TaskStatusRequest {
                payload: payload.into(),
            },
            0.,
        );
    }

    /// Moves the task to the unit of the given datacenter (which may be the current one).
    pub fn move_task(&mut self, task: TaskRef, vm_id: u32, unit_id: u32, datacenter: Id, ack: bool) {
        self.send(
            TaskMoveRequest {
                task,
                vm_id,
                unit_id,
                datacenter,
                ack,
            },
            0.,
        );
    }

    pub fn request_characteristics(&mut self) {
        self.send(CharacteristicsRequest {}, 0.);
    }
}

impl EventHandler for Broker {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            VmCreateAck {
                datacenter,
                vm_id,
                success,
            } => {
                log_debug!(self.ctx, "vm #{} created: {}", vm_id, success);
                self.vm_create_acks.push(VmCreateAck {
                    datacenter,
                    vm_id,
                    success,
                });
            }
            VmDestroyAck {
                datacenter,
                vm_id,
                success,
            } => {
                self.vm_destroy_acks.push(VmDestroyAck {
                    datacenter,
                    vm_id,
                    success,
                });
            }
            VmMigrateAck {
                datacenter,
                vm_id,
                success,
            } => {
                self.vm_migrate_acks.push(VmMigrateAck {
                    datacenter,
                    vm_id,
                    success,
                });
            }
            UnitCreateAck {
                vm_id,
                unit_id,
                success,
            } => {
                log_debug!(self.ctx, "unit #{} created on vm {:?}: {}", unit_id, vm_id, success);
                self.unit_create_acks.push(UnitCreateAck {
                    vm_id,
                    unit_id,
                    success,
                });
            }
            UnitMigrateAck {
                datacenter,
                unit_id,
                success,
            } => {
                self.unit_migrate_acks.push(UnitMigrateAck {
                    datacenter,
                    unit_id,
                    success,
                });
            }
            UnitDestroyAck {
                datacenter,
                unit_id,
                success,
            } => {
                self.unit_destroy_acks.push(UnitDestroyAck {
                    datacenter,
                    unit_id,
                    success,
                });
            }
            TaskSubmitAck {
                datacenter,
                task_id,
                success,
            } => {
                self.task_submit_acks.push(TaskSubmitAck {
                    datacenter,
                    task_id,
                    success,
                });
            }
            TaskPauseAck {
                datacenter,
                task_id,
                success,
            } => {
                self.task_pause_acks.push(TaskPauseAck {
                    datacenter,
                    task_id,
                    success,
                });
            }
            TaskResumeAck {
                datacenter,
                task_id,
                success,
            } => {
                self.task_resume_acks.push(TaskResumeAck {
                    datacenter,
                    task_id,
                    success,
                });
            }
            TaskCancelAck {
                datacenter,
                task_id,
                success,
            } => {
                self.task_cancel_acks.push(TaskCancelAck {
                    datacenter,
                    task_id,
                    success,
                });
            }
            TaskMoveAck {
                datacenter,
                task_id,
                success,
            } => {
                self.task_move_acks.push(TaskMoveAck {
                    datacenter,
                    task_id,
                    success,
                });
            }
            TaskStatusReply {
                datacenter,
                task_id,
                status,
            } => {
                self.status_replies.push(TaskStatusReply {
                    datacenter,
                    task_id,
                    status,
                });
            }
            TaskReturned { datacenter: _, task } => {
                log_info!(
                    self.ctx,
                    "task #{} returned with status {}, cost {:.3}",
                    task.id,
                    task.status(),
                    task.processing_cost()
                );
                self.returned_tasks.push((self.ctx.time(), task));
            }
            TaskCancelled {
                datacenter,
                task_id,
                task,
            } => {
                self.cancelled_tasks.push(TaskCancelled {
                    datacenter,
                    task_id,
                    task,
                });
            }
            Characteristics {
                datacenter,
                host_count,
                cores,
                memory,
                total_mips,
                cost_per_second,
                cost_per_bw,
            } => {
                self.characteristics.push(Characteristics {
                    datacenter,
                    host_count,
                    cores,
                    memory,
                    total_mips,
                    cost_per_second,
                    cost_per_bw,
                });
            }
        })
    }
}
