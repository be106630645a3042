//! # Chunk Save Task
//!
//! Writes one resident chunk to its region file.

use std::path::PathBuf;
use std::sync::Arc;

use cgmath::Point3;

use crate::core::MtResource;
use crate::error::Result;
use crate::storage::RegionFileManager;
use crate::task_management::task::{Task, TaskContext, TaskResult};
use crate::voxels::chunk::Chunk;
use crate::voxels::streaming::ChunkStage;

/// A task that persists one chunk.
pub struct ChunkSaveTask {
    regions: Arc<RegionFileManager>,
    world_path: PathBuf,
    chunk: MtResource<Chunk>,
    position: Point3<i32>,
}

impl ChunkSaveTask {
    pub fn new(
        regions: Arc<RegionFileManager>,
        world_path: PathBuf,
        chunk: MtResource<Chunk>,
        position: Point3<i32>,
    ) -> Self {
        ChunkSaveTask {
            regions,
            world_path,
            chunk,
            position,
        }
    }
}

impl Task for ChunkSaveTask {
    fn chunk(&self) -> Option<(Point3<i32>, ChunkStage)> {
        Some((self.position, ChunkStage::Save))
    }

    fn process(&self) -> Box<dyn TaskResult + Send> {
        let chunk = self.chunk.get();
        let outcome = chunk
            .grid()
            .map(|grid| self.regions.save_chunk(&self.world_path, self.position, grid));

        Box::new(ChunkSaveTaskResult {
            chunk: self.chunk.clone(),
            position: self.position,
            outcome,
        })
    }
}

/// Result of a save, `None` if the chunk had no resident data.
pub struct ChunkSaveTaskResult {
    chunk: MtResource<Chunk>,
    position: Point3<i32>,
    outcome: Option<Result<()>>,
}

impl TaskResult for ChunkSaveTaskResult {
    fn handle_result(self: Box<Self>, context: &mut TaskContext<'_>) -> Vec<Box<dyn Task + Send>> {
        match self.outcome {
            Some(Ok(())) => {
                self.chunk.get_mut().dirty = false;
                context.report.completed.push(self.position);
            }
            Some(Err(error)) => context.report.fail(self.position, ChunkStage::Save, error),
            None => context.report.skipped.push(self.position),
        }
        Vec::new()
    }
}
