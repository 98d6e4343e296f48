//! Events exchanged between users and the datacenter.
//!
//! Requests carry an `ack` flag. When it is set, the datacenter replies with the corresponding acknowledgment.

pub mod vm {
    use serde::Serialize;

    use dslab_core::component::Id;

    use crate::core::vm::VmSpec;

    #[derive(Serialize, Clone)]
    pub struct VmCreateRequest {
        pub vm: VmSpec,
        pub ack: bool,
    }

    /// Sent to the VM owner.
    #[derive(Serialize, Clone)]
    pub struct VmCreateAck {
        pub datacenter: Id,
        pub vm_id: u32,
        pub success: bool,
    }

    /// Destroys the VM together with its compute units.
    #[derive(Serialize, Clone)]
    pub struct VmDestroyRequest {
        pub vm_id: u32,
        pub ack: bool,
    }

    #[derive(Serialize, Clone)]
    pub struct VmDestroyAck {
        pub datacenter: Id,
        pub vm_id: u32,
        pub success: bool,
    }

    /// Moves the VM to the specified host immediately.
    #[derive(Serialize, Clone)]
    pub struct VmMigrateRequest {
        pub vm_id: u32,
        pub host_id: u32,
        pub ack: bool,
    }

    #[derive(Serialize, Clone)]
    pub struct VmMigrateAck {
        pub datacenter: Id,
        pub vm_id: u32,
        pub success: bool,
    }
}

pub mod unit {
    use serde::Serialize;

    use dslab_core::component::Id;

    use crate::core::unit::UnitSpec;

    #[derive(Serialize, Clone)]
    pub struct UnitSubmitRequest {
        pub units: Vec<UnitSpec>,
        pub ack: bool,
    }

    /// Sent to the requester for every submitted unit, `vm_id` is `None` if no VM could host the unit.
    #[derive(Serialize, Clone)]
    pub struct UnitCreateAck {
        pub vm_id: Option<u32>,
        pub unit_id: u32,
        pub success: bool,
    }

    /// Moves the unit to the specified VM immediately.
    #[derive(Serialize, Clone)]
    pub struct UnitMigrateRequest {
        pub unit_id: u32,
        pub vm_id: u32,
        pub ack: bool,
    }

    #[derive(Serialize, Clone)]
    pub struct UnitMigrateAck {
        pub datacenter: Id,
        pub unit_id: u32,
        pub success: bool,
    }

    /// Destroys the unit, its unfinished tasks are cancelled and sent back to their owners.
    #[derive(Serialize, Clone)]
    pub struct UnitDestroyRequest {
        pub unit_id: u32,
        pub ack: bool,
    }

    #[derive(Serialize, Clone)]
    pub struct UnitDestroyAck {
        pub datacenter: Id,
        pub unit_id: u32,
        pub success: bool,
    }
}

pub mod task {
    use serde::Serialize;

    use dslab_core::component::Id;

    use crate::core::task::{Task, TaskPayload, TaskRef};

    #[derive(Serialize, Clone)]
    pub struct TaskSubmitRequest {
        pub task: Task,
        pub ack: bool,
    }

    /// Sent to the task owner.
    #[derive(Serialize, Clone)]
    pub struct TaskSubmitAck {
        pub datacenter: Id,
        pub task_id: u32,
        pub success: bool,
    }

    #[derive(Serialize, Clone)]
    pub struct TaskPauseRequest {
        pub payload: TaskPayload,
        pub ack: bool,
    }

    #[derive(Serialize, Clone)]
    pub struct TaskPauseAck {
        pub datacenter: Id,
        pub task_id: u32,
        pub success: bool,
    }

    #[derive(Serialize, Clone)]
    pub struct TaskResumeRequest {
        pub payload: TaskPayload,
        pub ack: bool,
    }

    #[derive(Serialize, Clone)]
    pub struct TaskResumeAck {
        pub datacenter: Id,
        pub task_id: u32,
        pub success: bool,
    }

    #[derive(Serialize, Clone)]
    pub struct TaskCancelRequest {
        pub payload: TaskPayload,
        pub ack: bool,
    }

    #[derive(Serialize, Clone)]
    pub struct TaskCancelAck {
        pub datacenter: Id,
        pub task_id: u32,
        pub success: bool,
    }

    /// Sent to the task owner after every cancel request, `task` is `None` if the task was not found.
    #[derive(Serialize, Clone)]
    pub struct TaskCancelled {
        pub datacenter: Id,
        pub task_id: u32,
        pub task: Option<Task>,
    }

    /// Always answered with [`TaskStatusReply`] sent to the task owner.
    #[derive(Serialize, Clone)]
    pub struct TaskStatusRequest {
        pub payload: TaskPayload,
    }

    /// Carries [`crate::core::task::TaskStatus::code`] or -1 if the task is unknown.
    #[derive(Serialize, Clone)]
    pub struct TaskStatusReply {
        pub datacenter: Id,
        pub task_id: u32,
        pub status: i32,
    }

    /// Moves the task to another compute unit of this or another datacenter.
    #[derive(Serialize, Clone)]
    pub struct TaskMoveRequest {
        pub task: TaskRef,
        pub vm_id: u32,
        pub unit_id: u32,
        pub datacenter: Id,
        pub ack: bool,
    }

    #[derive(Serialize, Clone)]
    pub struct TaskMoveAck {
        pub datacenter: Id,
        pub task_id: u32,
        pub success: bool,
    }

    /// Finished or rejected task sent back to its owner.
    #[derive(Serialize, Clone)]
    pub struct TaskReturned {
        pub datacenter: Id,
        pub task: Task,
    }
}

pub mod datacenter {
    use serde::Serialize;

    use dslab_core::component::Id;

    #[derive(Serialize, Clone)]
    pub struct CharacteristicsRequest {}

    #[derive(Serialize, Clone)]
    pub struct Characteristics {
        pub datacenter: Id,
        pub host_count: u32,
        pub cores: u32,
        pub memory: u64,
        pub total_mips: f64,
        pub cost_per_second: f64,
        pub cost_per_bw: f64,
    }

    /// Wake-up event the datacenter sends to itself to advance task processing.
    #[derive(Serialize, Clone)]
    pub struct UpdateProcessing {}

    /// Makes the datacenter return finished tasks without advancing processing.
    #[derive(Serialize, Clone)]
    pub struct CheckTaskCompletion {}
}
