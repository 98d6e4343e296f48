//! Task execution engine behind both scheduler kinds.

use std::collections::VecDeque;

use crate::core::task::{Task, TaskStatus};
use crate::core::task_scheduler::TaskScheduler;

/// Remaining work (in MI) below which a task is considered finished.
const WORK_EPSILON: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Sharing {
    Time,
    Space,
}

struct TaskEntry {
    seq: u64,
    task: Task,
    remaining: f64,
    /// Time when input files are delivered and the task may start.
    ready_time: f64,
}

/// Executes tasks on a compute unit with `cores` cores sharing the granted MIPS.
///
/// Each running task gets `mips / max(cores, running)` MIPS. In space-shared mode at most `cores` tasks run at
/// once, the rest wait in submission order. Tasks waiting for input files do not take a share.
pub struct ExecutionQueue {
    sharing: Sharing,
    cores: usize,
    mips: f64,
    last_update: f64,
    next_seq: u64,
    // ordered by seq
    executing: Vec<TaskEntry>,
    paused: Vec<TaskEntry>,
    finished: VecDeque<Task>,
}

impl ExecutionQueue {
    pub fn time_shared(cores: usize) -> Self {
        Self::new(Sharing::Time, cores)
    }

    pub fn space_shared(cores: usize) -> Self {
        Self::new(Sharing::Space, cores)
    }

    fn new(sharing: Sharing, cores: usize) -> Self {
        Self {
            sharing,
            cores: cores.max(1),
            mips: 0.,
            last_update: 0.,
            next_seq: 0,
            executing: Vec::new(),
            paused: Vec::new(),
            finished: VecDeque::new(),
        }
    }

    /// Indices of tasks which are running at `time`.
    fn running(&self, time: f64) -> Vec<usize> {
        let ready = self
            .executing
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.ready_time <= time)
            .map(|(idx, _)| idx);
        match self.sharing {
            Sharing::Time => ready.collect(),
            Sharing::Space => ready.take(self.cores).collect(),
        }
    }

    fn rate(&self, running: usize) -> f64 {
        self.mips / running.max(self.cores) as f64
    }

    fn next_ready_time(&self, after: f64) -> Option<f64> {
        self.executing
            .iter()
            .map(|entry| entry.ready_time)
            .filter(|&t| t > after)
            .reduce(f64::min)
    }

    fn advance(&mut self, time: f64) {
        self.collect_finished(self.last_update);
        while self.last_update < time {
            let now = self.last_update;
            let running = self.running(now);
            let next_ready = self.next_ready_time(now);
            if running.is_empty() || self.mips <= 0. {
                self.last_update = match next_ready {
                    Some(t) if t < time => t,
                    _ => time,
                };
                continue;
            }

            let rate = self.rate(running.len());
            let min_finish = running
                .iter()
                .map(|&idx| self.executing[idx].remaining / rate)
                .fold(f64::INFINITY, f64::min);
            let mut step_end = time.min(now + min_finish);
            if let Some(t) = next_ready {
                step_end = step_end.min(t);
            }
            let duration = step_end - now;
            for &idx in &running {
                let entry = &mut self.executing[idx];
                entry.task.mark_started(now);
                entry.task.set_status(TaskStatus::Executing);
                entry.task.add_cpu_time(duration);
                entry.remaining -= rate * duration;
            }
            if step_end <= now {
                // the closest completion is below time resolution
                for &idx in &running {
                    if self.executing[idx].remaining / rate <= min_finish {
                        self.executing[idx].remaining = 0.;
                    }
                }
            }
            self.last_update = step_end.max(now);
            self.collect_finished(self.last_update);
        }
        self.refresh_statuses();
    }

    fn collect_finished(&mut self, time: f64) {
        let mut idx = 0;
        while idx < self.executing.len() {
            if self.executing[idx].remaining <= WORK_EPSILON {
                let mut entry = self.executing.remove(idx);
                entry.task.mark_started(time);
                entry.task.mark_finished(time);
                self.finished.push_back(entry.task);
            } else {
                idx += 1;
            }
        }
    }

    fn refresh_statuses(&mut self) {
        let running = self.running(self.last_update);
        for (idx, entry) in self.executing.iter_mut().enumerate() {
            if running.contains(&idx) {
                entry.task.set_status(TaskStatus::Executing);
            } else {
                entry.task.set_status(TaskStatus::Queued);
            }
        }
    }

    fn next_event_time(&self) -> Option<f64> {
        let now = self.last_update;
        let running = self.running(now);
        let mut next = self.next_ready_time(now);
        if !running.is_empty() && self.mips > 0. {
            let rate = self.rate(running.len());
            let finish = running
                .iter()
                .map(|&idx| now + self.executing[idx].remaining / rate)
                .fold(f64::INFINITY, f64::min);
            next = Some(next.map_or(finish, |t| t.min(finish)));
        }
        next
    }

    fn insert_executing(&mut self, entry: TaskEntry) {
        let pos = self.executing.partition_point(|other| other.seq < entry.seq);
        self.executing.insert(pos, entry);
    }
}

impl TaskScheduler for ExecutionQueue {
    fn update_processing(&mut self, time: f64, mips: f64) -> Option<f64> {
        self.advance(time);
        self.mips = mips;
        self.next_event_time()
    }

    fn submit(&mut self, mut task: Task, transfer_time: f64, time: f64) -> f64 {
        self.advance(time);
        task.set_status(TaskStatus::Queued);
        let length = task.length;
        let entry = TaskEntry {
            seq: self.next_seq,
            task,
            remaining: length.max(0.),
            ready_time: time + transfer_time.max(0.),
        };
        self.next_seq += 1;
        self.insert_executing(entry);
        self.refresh_statuses();

        let ready = self.executing.iter().filter(|entry| entry.ready_time <= time + transfer_time).count();
        if self.sharing == Sharing::Space && ready > self.cores {
            return 0.;
        }
        if self.mips <= 0. {
            return f64::INFINITY;
        }
        length.max(0.) / self.rate(ready)
    }

    fn pause(&mut self, task_id: u32, time: f64) -> bool {
        self.advance(time);
        match self.executing.iter().position(|entry| entry.task.id == task_id) {
            Some(idx) => {
                let mut entry = self.executing.remove(idx);
                entry.task.set_status(TaskStatus::Paused);
                self.paused.push(entry);
                self.refresh_statuses();
                true
            }
            None => false,
        }
    }

    fn resume(&mut self, task_id: u32, time: f64) -> Option<f64> {
        self.advance(time);
        let idx = self.paused.iter().position(|entry| entry.task.id == task_id)?;
        let entry = self.paused.remove(idx);
        let remaining = entry.remaining;
        let ready_time = entry.ready_time.max(time);
        self.insert_executing(entry);
        self.refresh_statuses();
        if self.mips <= 0. {
            return Some(f64::INFINITY);
        }
        let running = self.running(time).len().max(1);
        Some(ready_time + remaining / self.rate(running))
    }

    fn cancel(&mut self, task_id: u32, time: f64) -> Option<Task> {
        self.advance(time);
        if let Some(idx) = self.finished.iter().position(|task| task.id == task_id) {
            return self.finished.remove(idx);
        }
        let mut entry = if let Some(idx) = self.executing.iter().position(|entry| entry.task.id == task_id) {
            self.executing.remove(idx)
        } else {
            let idx = self.paused.iter().position(|entry| entry.task.id == task_id)?;
            self.paused.remove(idx)
        };
        entry.task.set_status(TaskStatus::Cancelled);
        self.refresh_statuses();
        Some(entry.task)
    }

    fn status(&self, task_id: u32) -> Option<TaskStatus> {
        self.executing
            .iter()
            .chain(self.paused.iter())
            .map(|entry| &entry.task)
            .chain(self.finished.iter())
            .find(|task| task.id == task_id)
            .map(|task| task.status())
    }

    fn has_finished(&self) -> bool {
        !self.finished.is_empty()
    }

    fn next_finished(&mut self) -> Option<Task> {
        self.finished.pop_front()
    }

    fn drain_unfinished(&mut self, time: f64) -> Vec<Task> {
        self.advance(time);
        let mut entries: Vec<TaskEntry> = self.executing.drain(..).chain(self.paused.drain(..)).collect();
        entries.sort_by_key(|entry| entry.seq);
        entries
            .into_iter()
            .map(|mut entry| {
                entry.task.set_status(TaskStatus::Cancelled);
                entry.task
            })
            .collect()
    }

    fn task_count(&self) -> usize {
        self.executing.len() + self.paused.len()
    }
}
