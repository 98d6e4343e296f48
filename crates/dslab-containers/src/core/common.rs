use serde::Serialize;

/// Resources requested by a VM from a host or by a compute unit from a VM.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Allocation {
    pub id: u32,
    pub cpu_usage: u32,
    pub memory_usage: u64,
}

#[derive(Debug, PartialEq)]
pub enum AllocationVerdict {
    NotEnoughCPU,
    NotEnoughMemory,
    Success,
    TargetNotFound,
}
