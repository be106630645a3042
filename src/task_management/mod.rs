//! # Task Management System
//!
//! A fixed pool of worker threads for chunk batches.
//!
//! ## Architecture Overview
//!
//! - `TaskManager`: distributes tasks to workers and collects their results
//! - `Task`: a unit of work executed on a worker
//! - `TaskResult`: the result of a task, which can spawn additional tasks
//! - `TaskChannel`: the task queue of one worker
//!
//! Every worker owns a task channel; all workers report back through one shared
//! result channel. Tasks are handed out round-robin with at most
//! [`MAX_TASKS_IN_FLIGHT`] per worker, and everything else waits in a FIFO queue.
//!
//! ## Task Lifecycle
//! 1. Tasks are published via `TaskManager::publish_task()`
//! 2. The manager hands them to free workers, queueing the rest
//! 3. Workers process tasks and send back results
//! 4. Results are applied by `process_completed_tasks()` or `run_until_idle()`
//! 5. Results can spawn follow-up tasks, which are published right away
//!
//! Sibling tasks run in no particular order. `run_until_idle()` is the fan-in
//! point: it returns once every published task and every follow-up has finished.

pub mod task;

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};

use log::{debug, info};
use task::{PanickedTaskResult, Task, TaskContext, TaskResult};

/// The task queue of one worker thread.
#[derive(Debug)]
pub struct TaskChannel {
    task_sender: Option<Sender<Box<dyn Task + Send>>>,
    num_tasks_in_flight: usize,
    worker: Option<JoinHandle<()>>,
}

type WorkerResult = (usize, Box<dyn TaskResult + Send>);

/// Manages a pool of worker threads and coordinates task execution.
pub struct TaskManager {
    channels: Vec<TaskChannel>,
    result_receiver: Receiver<WorkerResult>,
    queued_tasks: VecDeque<Box<dyn Task + Send>>,
    current_channel: usize,
}

/// Maximum number of tasks that can be in flight per worker channel.
pub const MAX_TASKS_IN_FLIGHT: usize = 1;

impl TaskManager {
    /// Creates a new `TaskManager` with `num_workers` threads (at least one).
    ///
    /// # Panics
    /// Panics if the underlying thread creation fails.
    pub fn new(num_workers: usize) -> Self {
        let num_workers = num_workers.max(1);
        let (result_tx, result_rx) = channel::<WorkerResult>();
        let mut channels = Vec::with_capacity(num_workers);

        for worker_index in 0..num_workers {
            let (task_tx, task_rx) = channel::<Box<dyn Task + Send>>();
            let result_tx: Sender<WorkerResult> = result_tx.clone();

            let task_closure = move || {
                while let Ok(task) = task_rx.recv() {
                    let chunk = task.chunk();
                    let result = panic::catch_unwind(AssertUnwindSafe(|| task.process()))
                        .unwrap_or_else(|payload| {
                            let message = payload
                                .downcast_ref::<&str>()
                                .map(|s| s.to_string())
                                .or_else(|| payload.downcast_ref::<String>().cloned())
                                .unwrap_or_else(|| "unknown panic".to_string());
                            Box::new(PanickedTaskResult { message, chunk })
                                as Box<dyn TaskResult + Send>
                        });
                    if result_tx.send((worker_index, result)).is_err() {
                        break;
                    }
                }
            };

            let worker = thread::Builder::new()
                .name(format!("chunk-worker-{worker_index}"))
                .spawn(task_closure)
                .expect("failed to spawn worker thread");

            channels.push(TaskChannel {
                task_sender: Some(task_tx),
                num_tasks_in_flight: 0,
                worker: Some(worker),
            });
        }

        info!("task manager started with {} workers", num_workers);

        TaskManager {
            channels,
            result_receiver: result_rx,
            queued_tasks: VecDeque::new(),
            current_channel: 0,
        }
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.channels.len()
    }

    /// Tasks handed to workers whose results have not been applied yet.
    pub fn tasks_in_flight(&self) -> usize {
        self.channels
            .iter()
            .map(|channel| channel.num_tasks_in_flight)
            .sum()
    }

    /// Returns `true` when nothing is queued or running.
    pub fn is_idle(&self) -> bool {
        self.queued_tasks.is_empty() && self.tasks_in_flight() == 0
    }

    fn try_send_task(
        &mut self,
        task: Box<dyn Task + Send>,
        channel_idx: usize,
    ) -> Result<(), Box<dyn Task + Send>> {
        let channel = &mut self.channels[channel_idx];
        match &channel.task_sender {
            Some(sender) => match sender.send(task) {
                Ok(_) => {
                    channel.num_tasks_in_flight += 1;
                    Ok(())
                }
                Err(task) => Err(task.0),
            },
            None => Err(task),
        }
    }

    /// Round-robin search for a channel below [`MAX_TASKS_IN_FLIGHT`].
    fn find_available_channel(&self) -> Option<usize> {
        let count = self.channels.len();
        (0..count)
            .map(|step| (self.current_channel + step) % count)
            .find(|&idx| self.channels[idx].num_tasks_in_flight < MAX_TASKS_IN_FLIGHT)
    }

    /// Publishes a task. Returns `true` if a worker took it immediately, `false`
    /// if it was queued.
    pub fn publish_task(&mut self, task: Box<dyn Task + Send>) -> bool {
        match self.find_available_channel() {
            Some(channel_idx) => match self.try_send_task(task, channel_idx) {
                Ok(_) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                    true
                }
                Err(task) => {
                    self.queued_tasks.push_back(task);
                    false
                }
            },
            None => {
                self.queued_tasks.push_back(task);
                false
            }
        }
    }

    /// Hands queued tasks to free workers, oldest first.
    pub fn process_queued_tasks(&mut self) {
        while let Some(channel_idx) = self.find_available_channel() {
            let Some(task) = self.queued_tasks.pop_front() else {
                break;
            };
            match self.try_send_task(task, channel_idx) {
                Ok(_) => self.current_channel = (channel_idx + 1) % self.channels.len(),
                Err(task) => {
                    self.queued_tasks.push_front(task);
                    break;
                }
            }
        }
    }

    fn apply_result(&mut self, (channel_idx, result): WorkerResult, context: &mut TaskContext<'_>) {
        self.channels[channel_idx].num_tasks_in_flight -= 1;
        for task in result.handle_result(context) {
            self.publish_task(task);
        }
    }

    /// Applies every result that is already available without blocking. Returns
    /// the number of results applied.
    pub fn process_completed_tasks(&mut self, context: &mut TaskContext<'_>) -> usize {
        let mut applied = 0;
        while let Ok(result) = self.result_receiver.try_recv() {
            self.apply_result(result, context);
            applied += 1;
        }
        self.process_queued_tasks();
        applied
    }

    /// Blocks until every queued and running task, including follow-ups, has
    /// finished and its result has been applied.
    pub fn run_until_idle(&mut self, context: &mut TaskContext<'_>) {
        loop {
            self.process_queued_tasks();
            if self.tasks_in_flight() == 0 {
                if self.queued_tasks.is_empty() {
                    break;
                }
                continue;
            }
            match self.result_receiver.recv() {
                Ok(result) => self.apply_result(result, context),
                Err(_) => break,
            }
        }
        debug!("task manager idle");
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        for channel in &mut self.channels {
            channel.task_sender.take();
        }
        for channel in &mut self.channels {
            if let Some(worker) = channel.worker.take() {
                let _ = worker.join();
            }
        }
    }
}
