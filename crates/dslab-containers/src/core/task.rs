//! Tasks executed inside compute units.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use dslab_core::component::Id;

use crate::core::error::{DatacenterError, EntityRef};

/// Status code reported for tasks the datacenter does not know about.
pub const UNKNOWN_STATUS_CODE: i32 = -1;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    Created,
    Queued,
    Executing,
    Paused,
    Finished,
    Cancelled,
    Failed,
}

impl TaskStatus {
    /// Numeric code sent in status replies.
    pub fn code(&self) -> i32 {
        match self {
            TaskStatus::Created => 0,
            TaskStatus::Queued => 2,
            TaskStatus::Executing => 3,
            TaskStatus::Finished => 4,
            TaskStatus::Failed => 5,
            TaskStatus::Cancelled => 6,
            TaskStatus::Paused => 7,
        }
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            TaskStatus::Created => write!(f, "created"),
            TaskStatus::Queued => write!(f, "queued"),
            TaskStatus::Executing => write!(f, "executing"),
            TaskStatus::Paused => write!(f, "paused"),
            TaskStatus::Finished => write!(f, "finished"),
            TaskStatus::Cancelled => write!(f, "cancelled"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Cost metadata recorded on a task by the datacenter that executes it.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ResourceCost {
    pub datacenter: Id,
    pub cost_per_second: f64,
    pub cost_per_bw: f64,
}

/// Unit of work submitted by a user to a compute unit.
#[derive(Serialize, Clone, Debug)]
pub struct Task {
    pub id: u32,
    pub owner: Id,
    pub vm_id: Option<u32>,
    pub unit_id: Option<u32>,
    /// Task length in millions of instructions.
    pub length: f64,
    pub input_files: Vec<String>,
    status: TaskStatus,
    resource: Option<ResourceCost>,
    exec_start_time: Option<f64>,
    finish_time: Option<f64>,
    cpu_time: f64,
}

impl Task {
    pub fn new(id: u32, owner: Id, length: f64) -> Self {
        Self {
            id,
            owner,
            vm_id: None,
            unit_id: None,
            length,
            input_files: Vec::new(),
            status: TaskStatus::Created,
            resource: None,
            exec_start_time: None,
            finish_time: None,
            cpu_time: 0.,
        }
    }

    /// Binds the task to the compute unit it should be executed on.
    pub fn bind(mut self, vm_id: u32, unit_id: u32) -> Self {
        self.vm_id = Some(vm_id);
        self.unit_id = Some(unit_id);
        self
    }

    pub fn with_input_files(mut self, input_files: Vec<String>) -> Self {
        self.input_files = input_files;
        self
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn is_finished(&self) -> bool {
        self.status == TaskStatus::Finished
    }

    pub fn resource(&self) -> Option<&ResourceCost> {
        self.resource.as_ref()
    }

    pub fn exec_start_time(&self) -> Option<f64> {
        self.exec_start_time
    }

    pub fn finish_time(&self) -> Option<f64> {
        self.finish_time
    }

    /// Total time the task spent executing.
    pub fn cpu_time(&self) -> f64 {
        self.cpu_time
    }

    /// Processing cost of the task according to the cost metadata of the executing datacenter.
    pub fn processing_cost(&self) -> f64 {
        self.resource
            .as_ref()
            .map(|resource| resource.cost_per_second * self.cpu_time)
            .unwrap_or(0.)
    }

    /// Returns the reference to this task, fails if the task is not bound to a compute unit.
    pub fn task_ref(&self) -> Result<TaskRef, DatacenterError> {
        match (self.vm_id, self.unit_id) {
            (Some(vm_id), Some(unit_id)) => Ok(TaskRef {
                task_id: self.id,
                owner: self.owner,
                vm_id,
                unit_id,
            }),
            _ => Err(DatacenterError::MalformedPayload(format!(
                "{} is not bound to a compute unit",
                EntityRef::Task(self.id)
            ))),
        }
    }

    pub(crate) fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
    }

    pub(crate) fn set_resource(&mut self, resource: ResourceCost) {
        self.resource = Some(resource);
    }

    pub(crate) fn mark_started(&mut self, time: f64) {
        if self.exec_start_time.is_none() {
            self.exec_start_time = Some(time);
        }
    }

    pub(crate) fn mark_finished(&mut self, time: f64) {
        self.status = TaskStatus::Finished;
        self.finish_time = Some(time);
    }

    pub(crate) fn add_cpu_time(&mut self, duration: f64) {
        self.cpu_time += duration;
    }
}

/// Identifies a task placed in some compute unit.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskRef {
    pub task_id: u32,
    pub owner: Id,
    pub vm_id: u32,
    pub unit_id: u32,
}

/// Payload of task requests: either a full task or a reference to it.
#[derive(Serialize, Clone, Debug)]
pub enum TaskPayload {
    Ref(TaskRef),
    Task(Task),
}

impl TaskPayload {
    /// Normalizes the payload to a task reference.
    pub fn resolve(&self) -> Result<TaskRef, DatacenterError> {
        match self {
            TaskPayload::Ref(task_ref) => Ok(*task_ref),
            TaskPayload::Task(task) => task.task_ref(),
        }
    }

    pub fn task_id(&self) -> u32 {
        match self {
            TaskPayload::Ref(task_ref) => task_ref.task_id,
            TaskPayload::Task(task) => task.id,
        }
    }

    pub fn owner(&self) -> Id {
        match self {
            TaskPayload::Ref(task_ref) => task_ref.owner,
            TaskPayload::Task(task) => task.owner,
        }
    }
}

impl From<TaskRef> for TaskPayload {
    fn from(task_ref: TaskRef) -> Self {
        TaskPayload::Ref(task_ref)
    }
}

impl From<Task> for TaskPayload {
    fn from(task: Task) -> Self {
        TaskPayload::Task(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_resolution() {
        let task = Task::new(1, 7, 100.).bind(2, 3);
        let expected = TaskRef {
            task_id: 1,
            owner: 7,
            vm_id: 2,
            unit_id: 3,
        };
        assert_eq!(TaskPayload::from(task).resolve(), Ok(expected));
        assert_eq!(TaskPayload::from(expected).resolve(), Ok(expected));

        let unbound = TaskPayload::from(Task::new(5, 7, 100.));
        assert!(matches!(unbound.resolve(), Err(DatacenterError::MalformedPayload(_))));
        assert_eq!(unbound.task_id(), 5);
        assert_eq!(unbound.owner(), 7);
    }

    #[test]
    fn test_processing_cost() {
        let mut task = Task::new(1, 0, 100.);
        task.add_cpu_time(2.);
        assert_eq!(task.processing_cost(), 0.);
        task.set_resource(ResourceCost {
            datacenter: 1,
            cost_per_second: 3.,
            cost_per_bw: 0.05,
        });
        assert_eq!(task.processing_cost(), 6.);
    }
}
