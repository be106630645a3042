//! # Chunk Streaming
//!
//! Drives chunks between disk, memory and the GPU in batches.
//!
//! ## Pipeline
//!
//! * [`ChunkStreamer::load_chunks`] reads chunks from their region files and inserts
//!   them into the world as resident (`OnCpu`) chunks.
//! * [`ChunkStreamer::mesh_chunks`] builds meshes for resident chunks and hands them
//!   to a [`MeshUploader`]. Once the whole batch is meshed, clean chunks drop their
//!   CPU data and become `OnGpu` unless configured otherwise.
//! * [`ChunkStreamer::save_chunks`] writes resident chunks back to disk.
//! * [`ChunkStreamer::unload_chunks`] saves dirty chunks, then removes them from the
//!   world and from the GPU.
//!
//! Every batch fans out one task per chunk over the [`TaskManager`] and returns once
//! all of them have finished. Per-chunk failures never abort a batch; they are
//! returned in the [`StreamReport`] so the caller can regenerate, skip, or give up.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cgmath::Point3;
use log::{debug, warn};

use crate::config::EngineConfig;
use crate::core::MtResource;
use crate::error::StorageError;
use crate::storage::RegionFileManager;
use crate::task_management::task::TaskContext;
use crate::task_management::TaskManager;

use super::tasks::chunk_load_task::ChunkLoadTask;
use super::tasks::chunk_mesh_task::ChunkMeshTask;
use super::tasks::chunk_save_task::ChunkSaveTask;
use super::world::World;

/// Receiver of finished chunk meshes, usually a GPU buffer manager.
pub trait MeshUploader {
    /// Uploads `bytes` as the vertex buffer of the chunk at `position`, replacing any
    /// previous one. `vertex_count` is the number of vertices to draw.
    fn upload(&mut self, position: Point3<i32>, bytes: &[u8], vertex_count: u32);

    /// Frees the buffer of the chunk at `position`.
    fn unload(&mut self, position: Point3<i32>);
}

/// A mesh as received by [`RecordingUploader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMesh {
    pub bytes: Vec<u8>,
    pub vertex_count: u32,
}

/// A [`MeshUploader`] that keeps every upload in memory. Useful without a GPU.
#[derive(Debug, Default)]
pub struct RecordingUploader {
    pub meshes: HashMap<Point3<i32>, UploadedMesh>,
    pub uploads: usize,
    pub unloaded: Vec<Point3<i32>>,
}

impl MeshUploader for RecordingUploader {
    fn upload(&mut self, position: Point3<i32>, bytes: &[u8], vertex_count: u32) {
        self.uploads += 1;
        self.meshes.insert(
            position,
            UploadedMesh {
                bytes: bytes.to_vec(),
                vertex_count,
            },
        );
    }

    fn unload(&mut self, position: Point3<i32>) {
        self.meshes.remove(&position);
        self.unloaded.push(position);
    }
}

/// The step of the pipeline a chunk failed in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChunkStage {
    Load,
    Mesh,
    Save,
}

/// A chunk that could not be processed.
#[derive(Debug)]
pub struct ChunkFailure {
    pub position: Point3<i32>,
    pub stage: ChunkStage,
    pub error: StorageError,
}

/// Outcome of a batch.
#[derive(Debug, Default)]
pub struct StreamReport {
    /// Chunks the batch finished successfully.
    pub completed: Vec<Point3<i32>>,
    /// Chunks that had nothing to work on: never saved when loading, not resident
    /// when meshing or saving.
    pub skipped: Vec<Point3<i32>>,
    pub failures: Vec<ChunkFailure>,
}

impl StreamReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn fail(&mut self, position: Point3<i32>, stage: ChunkStage, error: StorageError) {
        warn!("chunk {:?} failed during {:?}: {}", position, stage, error);
        self.failures.push(ChunkFailure {
            position,
            stage,
            error,
        });
    }
}

/// Batch driver for loading, meshing, saving and unloading chunks.
pub struct ChunkStreamer {
    world: MtResource<World>,
    regions: Arc<RegionFileManager>,
    tasks: TaskManager,
    world_path: PathBuf,
    retain_cpu_data_after_mesh: bool,
}

impl ChunkStreamer {
    /// Creates a streamer with its own region pool and worker pool.
    pub fn new(config: &EngineConfig, world: MtResource<World>) -> Self {
        Self::with_regions(config, world, Arc::new(RegionFileManager::from_config(config)))
    }

    /// Creates a streamer sharing an existing region pool.
    pub fn with_regions(
        config: &EngineConfig,
        world: MtResource<World>,
        regions: Arc<RegionFileManager>,
    ) -> Self {
        ChunkStreamer {
            world,
            regions,
            tasks: TaskManager::new(config.worker_count),
            world_path: config.world_path.clone(),
            retain_cpu_data_after_mesh: config.retain_cpu_data_after_mesh,
        }
    }

    pub fn world(&self) -> &MtResource<World> {
        &self.world
    }

    pub fn regions(&self) -> &Arc<RegionFileManager> {
        &self.regions
    }

    pub fn world_path(&self) -> &Path {
        &self.world_path
    }

    fn run_batch(&mut self, uploader: &mut dyn MeshUploader) -> StreamReport {
        let mut context = TaskContext::new(&self.world, uploader);
        self.tasks.run_until_idle(&mut context);
        context.report
    }

    /// Reads the chunks at `positions` from disk into the world.
    ///
    /// Chunks never written to disk are reported as skipped and left out of the
    /// world.
    pub fn load_chunks(
        &mut self,
        positions: &[Point3<i32>],
        uploader: &mut dyn MeshUploader,
    ) -> StreamReport {
        for &position in positions {
            self.tasks.publish_task(Box::new(ChunkLoadTask::new(
                self.regions.clone(),
                self.world_path.clone(),
                position,
            )));
        }
        let report = self.run_batch(uploader);
        debug!(
            "loaded {} chunks, {} not on disk, {} failed",
            report.completed.len(),
            report.skipped.len(),
            report.failures.len()
        );
        report
    }

    /// Meshes the resident chunks at `positions` and uploads the results.
    pub fn mesh_chunks(
        &mut self,
        positions: &[Point3<i32>],
        uploader: &mut dyn MeshUploader,
    ) -> StreamReport {
        for &position in positions {
            let chunk = self.world.get().get_chunk_at(position);
            match chunk {
                Some(chunk) => {
                    self.tasks.publish_task(Box::new(ChunkMeshTask::new(
                        self.world.clone(),
                        chunk,
                        position,
                    )));
                }
                None => debug!("no chunk at {:?} to mesh", position),
            }
        }
        let report = self.run_batch(uploader);

        if !self.retain_cpu_data_after_mesh {
            let world = self.world.get();
            for position in &report.completed {
                if let Some(chunk) = world.get_chunk_at(*position) {
                    chunk.get_mut().release_to_gpu();
                }
            }
        }
        report
    }

    /// Writes the resident chunks at `positions` to disk.
    pub fn save_chunks(
        &mut self,
        positions: &[Point3<i32>],
        uploader: &mut dyn MeshUploader,
    ) -> StreamReport {
        for &position in positions {
            let chunk = self.world.get().get_chunk_at(position);
            if let Some(chunk) = chunk {
                self.tasks.publish_task(Box::new(ChunkSaveTask::new(
                    self.regions.clone(),
                    self.world_path.clone(),
                    chunk,
                    position,
                )));
            }
        }
        self.run_batch(uploader)
    }

    /// Saves dirty chunks, then removes every chunk at `positions` from the world
    /// and frees its mesh. Chunks that fail to save stay loaded.
    pub fn unload_chunks(
        &mut self,
        positions: &[Point3<i32>],
        uploader: &mut dyn MeshUploader,
    ) -> StreamReport {
        let dirty: Vec<Point3<i32>> = {
            let world = self.world.get();
            positions
                .iter()
                .copied()
                .filter(|position| {
                    world
                        .get_chunk_at(*position)
                        .is_some_and(|chunk| chunk.get().dirty)
                })
                .collect()
        };

        let mut report = self.save_chunks(&dirty, uploader);

        let mut world = self.world.get_mut();
        for &position in positions {
            if report.failures.iter().any(|failure| failure.position == position) {
                continue;
            }
            if let Some(chunk) = world.remove_chunk(position) {
                chunk.get_mut().release_to_disk();
                uploader.unload(position);
                if !report.completed.contains(&position) {
                    report.completed.push(position);
                }
            }
        }
        report
    }

    /// Flushes every open region file.
    pub fn flush(&self) -> crate::error::Result<()> {
        self.regions.flush_all()
    }
}
