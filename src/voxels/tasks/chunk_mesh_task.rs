//! # Chunk Mesh Task
//!
//! Builds the mesh of one resident chunk and hands it to the uploader.
//!
//! Only read locks are taken on worker threads: one on the chunk itself and one on
//! each present neighbour. Neighbours that are not resident contribute nothing and
//! their shared faces are drawn.

use cgmath::Point3;
use log::trace;

use crate::core::MtResource;
use crate::meshing::{ChunkMesh, ChunkMesher, NeighborGuards};
use crate::task_management::task::{Task, TaskContext, TaskResult};
use crate::voxels::chunk::Chunk;
use crate::voxels::streaming::ChunkStage;
use crate::voxels::world::World;

/// A task that meshes one chunk.
pub struct ChunkMeshTask {
    world: MtResource<World>,
    chunk: MtResource<Chunk>,
    position: Point3<i32>,
}

impl ChunkMeshTask {
    pub fn new(world: MtResource<World>, chunk: MtResource<Chunk>, position: Point3<i32>) -> Self {
        ChunkMeshTask {
            world,
            chunk,
            position,
        }
    }
}

impl Task for ChunkMeshTask {
    fn chunk(&self) -> Option<(Point3<i32>, ChunkStage)> {
        Some((self.position, ChunkStage::Mesh))
    }

    fn process(&self) -> Box<dyn TaskResult + Send> {
        let neighbors = self.world.get().neighbors(self.position);
        let guards = NeighborGuards::lock(&neighbors);
        let chunk = self.chunk.get();

        let mesh = chunk.grid().map(|grid| {
            let mut mesher = ChunkMesher::new();
            mesher.mesh(grid, &guards.grids(), chunk.last_vertex_count)
        });

        Box::new(ChunkMeshTaskResult {
            chunk: self.chunk.clone(),
            position: self.position,
            mesh,
        })
    }
}

/// A finished mesh, `None` if the chunk was not resident.
pub struct ChunkMeshTaskResult {
    chunk: MtResource<Chunk>,
    position: Point3<i32>,
    mesh: Option<ChunkMesh>,
}

impl TaskResult for ChunkMeshTaskResult {
    /// Uploads the mesh and records its size on the chunk.
    fn handle_result(self: Box<Self>, context: &mut TaskContext<'_>) -> Vec<Box<dyn Task + Send>> {
        match self.mesh {
            Some(mesh) => {
                let vertex_count = mesh.vertex_count();
                trace!("uploading {} vertices for chunk {:?}", vertex_count, self.position);
                context
                    .uploader
                    .upload(self.position, mesh.as_bytes(), vertex_count as u32);
                self.chunk.get_mut().last_vertex_count = vertex_count;
                context.report.completed.push(self.position);
            }
            None => context.report.skipped.push(self.position),
        }
        Vec::new()
    }
}
