//! Mesh generation for chunks.
//!
//! This module turns the block grid of one chunk into a flat list of packed vertex
//! words ready to be uploaded as a GPU vertex buffer. Faces between cells of the
//! same block type are culled, and coplanar faces of identical blocks are merged
//! into larger quads by the greedy mesher.
//!
//! # Architecture
//! - [`ChunkMesher`]: the greedy mesher, reusable across chunks
//! - [`ChunkMesh`]: the resulting vertex words, six per quad, no index buffer
//! - [`PackedVertex`]: the bit-packed vertex word and its field accessors
//!
//! # Usage
//! ```
//! use cgmath::Point3;
//! use voxel_world_core::meshing::ChunkMesher;
//! use voxel_world_core::voxels::chunk::Chunk;
//!
//! let chunk = Chunk::solid(Point3::new(0, 0, 0), 1);
//! let mut mesher = ChunkMesher::new();
//! let mesh = mesher.mesh(chunk.grid().unwrap(), &[None; 6], 0);
//! assert_eq!(mesh.quad_count(), 6);
//! ```

mod face;
mod greedy;
pub mod vertex;

use std::sync::RwLockReadGuard;

pub use greedy::{face_visible, ChunkMesher, GROW_WORDS, MIN_RESERVED_WORDS, RESERVE_SLACK_WORDS};
pub use vertex::PackedVertex;

use crate::core::MtResource;
use crate::voxels::chunk::{BlockGrid, Chunk};

/// Resident grids of the six face neighbours, indexed by
/// [`BlockSide`](crate::voxels::block::block_side::BlockSide) tag.
pub type ChunkNeighbors<'a> = [Option<&'a BlockGrid>; 6];

/// The vertex words of one chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkMesh {
    pub vertices: Vec<PackedVertex>,
}

impl ChunkMesh {
    /// Number of vertex words, the count passed to the draw call.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 6
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// The mesh as the raw byte buffer handed to the uploader.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

/// Read guards on a chunk's neighbours, kept alive while meshing.
///
/// Only resident neighbours contribute a grid; the rest read as air.
pub struct NeighborGuards<'a> {
    guards: Vec<Option<RwLockReadGuard<'a, Chunk>>>,
}

impl<'a> NeighborGuards<'a> {
    /// Locks every present neighbour for reading.
    pub fn lock(neighbors: &'a [Option<MtResource<Chunk>>; 6]) -> Self {
        NeighborGuards {
            guards: neighbors
                .iter()
                .map(|neighbor| neighbor.as_ref().map(|chunk| chunk.get()))
                .collect(),
        }
    }

    /// Borrowed grids in side order.
    pub fn grids(&self) -> ChunkNeighbors<'_> {
        let mut grids: ChunkNeighbors<'_> = [None; 6];
        for (slot, guard) in grids.iter_mut().zip(&self.guards) {
            *slot = guard.as_ref().and_then(|chunk| chunk.grid());
        }
        grids
    }
}
