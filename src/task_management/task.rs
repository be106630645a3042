//! # Task System Core Traits
//!
//! This module defines the building blocks of the task system.
//!
//! ## Core Components
//! - `Task`: a unit of work executed on a worker thread
//! - `TaskResult`: the outcome of a task, applied on the calling thread
//! - `TaskContext`: the state results are applied to
//!
//! ## Task Lifecycle
//! 1. A `Task` is published via `TaskManager::publish_task()`
//! 2. The task's `process()` method runs on a worker thread
//! 3. The task returns a boxed `TaskResult`
//! 4. The result's `handle_result()` runs on the thread driving the manager
//! 5. The result can update the world, upload meshes, record failures and
//!    return follow-up tasks

use cgmath::Point3;

use crate::core::MtResource;
use crate::error::StorageError;
use crate::voxels::streaming::{ChunkStage, MeshUploader, StreamReport};
use crate::voxels::world::World;

/// A unit of work that can be executed on a worker thread.
///
/// Tasks own everything they need. Shared state is reached through
/// [`MtResource`] handles or other thread-safe types.
pub trait Task: Send {
    /// Performs the work and returns a result to be applied on the driving thread.
    ///
    /// Errors are not returned here; they travel inside the result.
    fn process(&self) -> Box<dyn TaskResult + Send>;

    /// The chunk and pipeline stage this task works on. A panic in `process` is
    /// reported as a failure of that chunk.
    fn chunk(&self) -> Option<(Point3<i32>, ChunkStage)> {
        None
    }
}

/// The result of processing a `Task`.
pub trait TaskResult: Send {
    /// Applies the result. Returns follow-up tasks, which are published
    /// immediately.
    fn handle_result(self: Box<Self>, context: &mut TaskContext<'_>) -> Vec<Box<dyn Task + Send>>;
}

/// State available to task results.
pub struct TaskContext<'a> {
    /// The world chunks are inserted into and looked up from.
    pub world: &'a MtResource<World>,
    /// Receiver of finished meshes.
    pub uploader: &'a mut dyn MeshUploader,
    /// Outcome of every chunk handled so far.
    pub report: StreamReport,
}

impl<'a> TaskContext<'a> {
    pub fn new(world: &'a MtResource<World>, uploader: &'a mut dyn MeshUploader) -> Self {
        TaskContext {
            world,
            uploader,
            report: StreamReport::default(),
        }
    }
}

/// Result produced when a task panicked on its worker.
pub(crate) struct PanickedTaskResult {
    pub message: String,
    pub chunk: Option<(Point3<i32>, ChunkStage)>,
}

impl TaskResult for PanickedTaskResult {
    fn handle_result(self: Box<Self>, context: &mut TaskContext<'_>) -> Vec<Box<dyn Task + Send>> {
        log::error!("task panicked on worker: {}", self.message);
        if let Some((position, stage)) = self.chunk {
            context
                .report
                .fail(position, stage, StorageError::Panicked(self.message));
        }
        Vec::new()
    }
}
