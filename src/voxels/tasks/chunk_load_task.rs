//! # Chunk Load Task
//!
//! Reads one chunk from its region file and inserts it into the world.

use std::path::PathBuf;
use std::sync::Arc;

use cgmath::Point3;

use crate::error::Result;
use crate::storage::RegionFileManager;
use crate::task_management::task::{Task, TaskContext, TaskResult};
use crate::voxels::chunk::{BlockGrid, Chunk};
use crate::voxels::streaming::ChunkStage;

/// A task that loads one chunk from disk.
pub struct ChunkLoadTask {
    regions: Arc<RegionFileManager>,
    world_path: PathBuf,
    position: Point3<i32>,
}

impl ChunkLoadTask {
    pub fn new(
        regions: Arc<RegionFileManager>,
        world_path: PathBuf,
        position: Point3<i32>,
    ) -> Self {
        ChunkLoadTask {
            regions,
            world_path,
            position,
        }
    }
}

impl Task for ChunkLoadTask {
    fn chunk(&self) -> Option<(Point3<i32>, ChunkStage)> {
        Some((self.position, ChunkStage::Load))
    }

    fn process(&self) -> Box<dyn TaskResult + Send> {
        Box::new(ChunkLoadTaskResult {
            position: self.position,
            grid: self.regions.load_chunk(&self.world_path, self.position),
        })
    }
}

/// The grid read for one chunk, or why it could not be read.
pub struct ChunkLoadTaskResult {
    position: Point3<i32>,
    grid: Result<Option<BlockGrid>>,
}

impl TaskResult for ChunkLoadTaskResult {
    /// Inserts the loaded chunk into the world, replacing whatever was there.
    fn handle_result(self: Box<Self>, context: &mut TaskContext<'_>) -> Vec<Box<dyn Task + Send>> {
        match self.grid {
            Ok(Some(grid)) => {
                context
                    .world
                    .get_mut()
                    .insert_chunk(Chunk::loaded(self.position, grid));
                context.report.completed.push(self.position);
            }
            Ok(None) => context.report.skipped.push(self.position),
            Err(error) => context.report.fail(self.position, ChunkStage::Load, error),
        }
        Vec::new()
    }
}
