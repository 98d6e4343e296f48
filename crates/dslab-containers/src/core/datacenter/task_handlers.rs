//! Task lifecycle: submission, pause, resume, cancellation, status queries and moves.

use dslab_core::component::Id;
use dslab_core::{log_debug, log_warn};

use crate::core::datacenter::Datacenter;
use crate::core::error::{DatacenterError, EntityRef};
use crate::core::events::task::{
    TaskCancelAck, TaskCancelled, TaskMoveAck, TaskPauseAck, TaskResumeAck, TaskReturned, TaskStatusReply,
    TaskSubmitAck, TaskSubmitRequest,
};
use crate::core::task::{ResourceCost, Task, TaskPayload, TaskRef, TaskStatus, UNKNOWN_STATUS_CODE};
use crate::core::unit::ComputeUnit;

impl Datacenter {
    /// Pauses the task, returns `false` if the task is not running or waiting.
    pub fn pause_task(&mut self, task: &TaskRef) -> Result<bool, DatacenterError> {
        let now = self.ctx.time();
        let unit = self.resolved_unit_mut(task)?;
        Ok(unit.scheduler_mut().pause(task.task_id, now))
    }

    /// Resumes the paused task, returns `false` if the task is not paused.
    pub fn resume_task(&mut self, task: &TaskRef) -> Result<bool, DatacenterError> {
        let now = self.ctx.time();
        let unit = self.resolved_unit_mut(task)?;
        match unit.scheduler_mut().resume(task.task_id, now) {
            Some(finish_time) => {
                if finish_time > now {
                    self.schedule_update_at(finish_time);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes the task from its compute unit and returns it.
    pub fn cancel_task(&mut self, task: &TaskRef) -> Result<Option<Task>, DatacenterError> {
        let now = self.ctx.time();
        let unit = self.resolved_unit_mut(task)?;
        Ok(unit.scheduler_mut().cancel(task.task_id, now))
    }

    pub fn task_status(&self, task: &TaskRef) -> Result<TaskStatus, DatacenterError> {
        let unit_id = self.resolve_unit(task)?;
        self.units
            .get(&unit_id)
            .and_then(|unit| unit.scheduler().status(task.task_id))
            .ok_or(DatacenterError::NotFound(EntityRef::Task(task.task_id)))
    }

    fn resolved_unit_mut(&mut self, task: &TaskRef) -> Result<&mut ComputeUnit, DatacenterError> {
        let unit_id = self.resolve_unit(task)?;
        self.units
            .get_mut(&unit_id)
            .ok_or(DatacenterError::NotFound(EntityRef::Unit(unit_id)))
    }

    /// Hands the task to the scheduler of its compute unit.
    /// On failure the task is given back together with the error.
    fn submit_task(&mut self, mut task: Task) -> Result<(), (DatacenterError, Task)> {
        let task_ref = match task.task_ref() {
            Ok(task_ref) => task_ref,
            Err(error) => return Err((error, task)),
        };
        let unit_id = match self.resolve_unit(&task_ref) {
            Ok(unit_id) => unit_id,
            Err(error) => return Err((error, task)),
        };
        task.set_resource(ResourceCost {
            datacenter: self.id,
            cost_per_second: self.sim_config.cost_per_second,
            cost_per_bw: self.sim_config.cost_per_bw,
        });
        let transfer_time = self.transfer_estimator.estimate(&task.input_files);
        let now = self.ctx.time();
        let estimate = match self.units.get_mut(&unit_id) {
            Some(unit) => unit.scheduler_mut().submit(task, transfer_time, now),
            None => return Err((DatacenterError::NotFound(EntityRef::Unit(unit_id)), task)),
        };
        log_debug!(
            self.ctx,
            "task #{} is submitted to unit #{}, transfer time {:.3}, estimated execution time {:.3}",
            task_ref.task_id,
            unit_id,
            transfer_time,
            estimate
        );
        if estimate > 0. && estimate.is_finite() {
            self.schedule_update_at(now + estimate + transfer_time);
        }
        Ok(())
    }

    fn return_task(&mut self, task: Task) {
        let owner = task.owner;
        self.ctx.emit_now(
            TaskReturned {
                datacenter: self.id,
                task,
            },
            owner,
        );
    }

    pub(super) fn on_task_submit(&mut self, mut task: Task, ack: bool) {
        self.update_task_processing();
        let task_id = task.id;
        let owner = task.owner;

        if task.is_finished() {
            log_warn!(
                self.ctx,
                "task #{} of {} is already finished, it is returned without execution",
                task_id,
                self.ctx.lookup_name(owner)
            );
            if ack {
                self.ctx.emit_now(
                    TaskSubmitAck {
                        datacenter: self.id,
                        task_id,
                        success: false,
                    },
                    owner,
                );
            }
            self.return_task(task);
            return;
        }

        task.set_status(TaskStatus::Created);
        let result = self.submit_task(task);
        if ack {
            self.ctx.emit_now(
                TaskSubmitAck {
                    datacenter: self.id,
                    task_id,
                    success: result.is_ok(),
                },
                owner,
            );
        }
        if let Err((error, mut task)) = result {
            log_warn!(self.ctx, "failed to submit task #{}: {}", task_id, error);
            task.set_status(TaskStatus::Failed);
            self.return_task(task);
        }
        self.check_task_completion();
    }

    pub(super) fn on_task_pause(&mut self, payload: TaskPayload, ack: bool) {
        self.update_task_processing();
        let task_id = payload.task_id();
        let owner = payload.owner();
        let success = match payload.resolve().and_then(|task| self.pause_task(&task)) {
            Ok(paused) => paused,
            Err(error) => {
                log_warn!(self.ctx, "failed to pause task #{}: {}", task_id, error);
                false
            }
        };
        if ack {
            self.ctx.emit_now(
                TaskPauseAck {
                    datacenter: self.id,
                    task_id,
                    success,
                },
                owner,
            );
        }
    }

    pub(super) fn on_task_resume(&mut self, payload: TaskPayload, ack: bool) {
        self.update_task_processing();
        let task_id = payload.task_id();
        let owner = payload.owner();
        let success = match payload.resolve().and_then(|task| self.resume_task(&task)) {
            Ok(resumed) => resumed,
            Err(error) => {
                log_warn!(self.ctx, "failed to resume task #{}: {}", task_id, error);
                false
            }
        };
        if ack {
            self.ctx.emit_now(
                TaskResumeAck {
                    datacenter: self.id,
                    task_id,
                    success,
                },
                owner,
            );
        }
    }

    pub(super) fn on_task_cancel(&mut self, payload: TaskPayload, ack: bool) {
        self.update_task_processing();
        let task_id = payload.task_id();
        let owner = payload.owner();
        let task = match payload.resolve().and_then(|task| self.cancel_task(&task)) {
            Ok(task) => task,
            Err(error) => {
                log_warn!(self.ctx, "failed to cancel task #{}: {}", task_id, error);
                None
            }
        };
        if ack {
            self.ctx.emit_now(
                TaskCancelAck {
                    datacenter: self.id,
                    task_id,
                    success: task.is_some(),
                },
                owner,
            );
        }
        self.ctx.emit_now(
            TaskCancelled {
                datacenter: self.id,
                task_id,
                task,
            },
            owner,
        );
    }

    pub(super) fn on_task_status(&mut self, payload: TaskPayload) {
        self.update_task_processing();
        let task_id = payload.task_id();
        let owner = payload.owner();
        let status = match payload.resolve().and_then(|task| self.task_status(&task)) {
            Ok(status) => status.code(),
            Err(error) => {
                log_warn!(self.ctx, "status of task #{} is unknown: {}", task_id, error);
                UNKNOWN_STATUS_CODE
            }
        };
        self.ctx.emit_now(
            TaskStatusReply {
                datacenter: self.id,
                task_id,
                status,
            },
            owner,
        );
    }

    pub(super) fn on_task_move(&mut self, task: TaskRef, vm_id: u32, unit_id: u32, destination: Id, ack: bool) {
        self.update_task_processing();
        let success = match self.move_task(&task, vm_id, unit_id, destination) {
            Ok(()) => true,
            Err(error) => {
                log_warn!(self.ctx, "failed to move task #{}: {}", task.task_id, error);
                false
            }
        };
        if ack {
            self.ctx.emit_now(
                TaskMoveAck {
                    datacenter: self.id,
                    task_id: task.task_id,
                    success,
                },
                task.owner,
            );
        }
    }

    /// Cancels the task at its current location and submits it to the destination compute unit,
    /// forwarding the task if the destination belongs to another datacenter.
    ///
    /// A task that has already finished is returned to its owner first and then moved as well.
    /// Forwarded submissions are not acknowledged by the destination, the move ack is sent by this datacenter.
    fn move_task(
        &mut self,
        task_ref: &TaskRef,
        vm_id: u32,
        unit_id: u32,
        destination: Id,
    ) -> Result<(), DatacenterError> {
        let mut task = self
            .cancel_task(task_ref)?
            .ok_or(DatacenterError::NotFound(EntityRef::Task(task_ref.task_id)))?;
        if task.is_finished() {
            log_debug!(self.ctx, "task #{} is already finished, returning it before the move", task.id);
            self.return_task(task.clone());
        }
        task.vm_id = Some(vm_id);
        task.unit_id = Some(unit_id);
        task.set_status(TaskStatus::Created);

        if destination == self.id {
            if let Err((error, mut task)) = self.submit_task(task) {
                task.set_status(TaskStatus::Cancelled);
                self.return_task(task);
                return Err(error);
            }
            log_debug!(self.ctx, "task #{} is moved to unit #{}", task_ref.task_id, unit_id);
        } else {
            log_debug!(
                self.ctx,
                "task #{} is forwarded to {}",
                task_ref.task_id,
                self.ctx.lookup_name(destination)
            );
            self.ctx.emit_now(TaskSubmitRequest { task, ack: false }, destination);
        }
        Ok(())
    }
}
