//! Task schedulers sharing compute unit capacity between tasks.

use serde::{Deserialize, Serialize};

use crate::core::execution_queue::ExecutionQueue;
use crate::core::task::{Task, TaskStatus};

/// Executes tasks of a single compute unit.
///
/// Progress is accounted lazily: every call that takes `time` first advances the tasks up to that time using the
/// capacity granted by the last [`TaskScheduler::update_processing`] call.
pub trait TaskScheduler {
    /// Advances tasks to `time`, then switches to the new granted capacity.
    /// Returns the time of the next task completion or start, if any.
    fn update_processing(&mut self, time: f64, mips: f64) -> Option<f64>;

    /// Accepts a task whose input files are delivered after `transfer_time`.
    /// Returns the estimated execution time excluding the transfer, or zero if the task has to wait for a slot.
    fn submit(&mut self, task: Task, transfer_time: f64, time: f64) -> f64;

    /// Suspends the task, returns `false` if it is not running or waiting.
    fn pause(&mut self, task_id: u32, time: f64) -> bool;

    /// Resumes a paused task and returns its estimated finish time.
    fn resume(&mut self, task_id: u32, time: f64) -> Option<f64>;

    /// Removes the task from the scheduler. Finished tasks which were not collected yet are returned as is,
    /// other tasks are returned with [`TaskStatus::Cancelled`] status.
    fn cancel(&mut self, task_id: u32, time: f64) -> Option<Task>;

    fn status(&self, task_id: u32) -> Option<TaskStatus>;

    fn has_finished(&self) -> bool;

    /// Pops the earliest finished task which was not collected yet.
    fn next_finished(&mut self) -> Option<Task>;

    /// Cancels and returns all unfinished tasks.
    fn drain_unfinished(&mut self, time: f64) -> Vec<Task>;

    /// Number of unfinished tasks.
    fn task_count(&self) -> usize;
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskSchedulerKind {
    /// All ready tasks share the unit capacity equally, a single task never gets more than one core.
    TimeShared,
    /// Each task occupies one core, tasks beyond the number of cores wait in FIFO order.
    SpaceShared,
}

impl TaskSchedulerKind {
    pub fn build(&self, cores: u32) -> Box<dyn TaskScheduler> {
        match self {
            TaskSchedulerKind::TimeShared => Box::new(ExecutionQueue::time_shared(cores as usize)),
            TaskSchedulerKind::SpaceShared => Box::new(ExecutionQueue::space_shared(cores as usize)),
        }
    }
}
