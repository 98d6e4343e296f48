//! Datacenter model, controller and the policies it delegates to.

pub mod allocation_policy;
pub mod common;
pub mod config;
pub mod datacenter;
pub mod error;
pub mod events;
pub mod execution_queue;
pub mod host;
pub mod placement_algorithm;
pub mod placement_algorithms;
pub mod resource_pool;
pub mod storage;
pub mod task;
pub mod task_scheduler;
pub mod unit;
pub mod vm;
