//! # Chunk Module
//!
//! This module provides the `Chunk` struct, the unit in which the world is loaded,
//! meshed and persisted. A chunk covers 32x32x32 blocks.
//!
//! ## Residency
//!
//! Block data is only kept in memory while it is needed. The [`ChunkState`] of a
//! chunk says where its data currently lives:
//!
//! * `None` - nothing has been loaded or generated yet
//! * `OnDisk` - persisted in a region file, not resident
//! * `OnCpu` - the [`BlockGrid`] is resident and can be read or edited
//! * `OnGpu` - a mesh has been uploaded and the CPU copy was released
//!
//! Only `OnCpu` chunks carry a grid. Neighbour lookups treat every other state as
//! air, so meshing a chunk next to a non-resident one draws the boundary faces.
//!
//! Chunks hold no reference back to the world; neighbours are found by coordinate
//! through [`World::get_chunk_at`](crate::voxels::world::World::get_chunk_at).

use cgmath::Point3;

use super::block::{Block, BlockTypeSize};

pub mod block_grid;
pub mod chunk_iteration;

pub use block_grid::BlockGrid;

/// The dimension (width, height, depth) of a chunk in blocks.
pub const CHUNK_DIMENSION: usize = 32;
/// The number of vertical columns in a chunk (CHUNK_DIMENSION²).
pub const CHUNK_COLUMN_COUNT: usize = CHUNK_DIMENSION * CHUNK_DIMENSION;
/// The total number of blocks in a chunk (CHUNK_DIMENSION³).
pub const CHUNK_SIZE: usize = CHUNK_COLUMN_COUNT * CHUNK_DIMENSION;

/// Where the data of a chunk currently lives.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum ChunkState {
    /// Never loaded or generated.
    #[default]
    None,
    /// Persisted, not resident.
    OnDisk,
    /// Mesh uploaded, CPU data released.
    OnGpu,
    /// Block data resident in memory.
    OnCpu,
}

/// A 32x32x32 region of the world.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// The position of this chunk in chunk coordinates (not block coordinates).
    pub position: Point3<i32>,
    /// Residency of the block data.
    pub state: ChunkState,
    /// Block data, present only while the chunk is `OnCpu`.
    pub grid: Option<Box<BlockGrid>>,
    /// Vertex words produced by the previous mesh of this chunk, used as a
    /// capacity hint for the next one.
    pub last_vertex_count: usize,
    /// The grid differs from what is persisted on disk.
    pub dirty: bool,
}

impl Chunk {
    /// Creates a placeholder chunk with no data and state `None`.
    pub fn unloaded(position: Point3<i32>) -> Self {
        Chunk {
            position,
            state: ChunkState::None,
            grid: None,
            last_vertex_count: 0,
            dirty: false,
        }
    }

    /// Creates a resident chunk that owns `grid`. The chunk starts dirty since its
    /// data has not been saved yet.
    pub fn with_grid(position: Point3<i32>, grid: BlockGrid) -> Self {
        Chunk {
            position,
            state: ChunkState::OnCpu,
            grid: Some(Box::new(grid)),
            last_vertex_count: 0,
            dirty: true,
        }
    }

    /// Creates a resident chunk from data just read from disk.
    pub fn loaded(position: Point3<i32>, grid: BlockGrid) -> Self {
        Chunk {
            dirty: false,
            ..Self::with_grid(position, grid)
        }
    }

    /// Creates a new, completely empty resident chunk (all blocks are air).
    pub fn empty(position: Point3<i32>) -> Self {
        Self::with_grid(position, BlockGrid::new())
    }

    /// Creates a resident chunk completely filled with `block_type`.
    pub fn solid(position: Point3<i32>, block_type: BlockTypeSize) -> Self {
        Self::with_grid(position, BlockGrid::filled(Block::new(block_type)))
    }

    /// Creates a resident chunk with a 3D checkerboard pattern of `block_type`.
    pub fn checkerboard(position: Point3<i32>, block_type: BlockTypeSize) -> Self {
        Self::with_grid(position, BlockGrid::checkerboard(Block::new(block_type)))
    }

    /// Creates a resident chunk with random blocks.
    ///
    /// The seed is mixed with the position so neighbouring chunks differ while the
    /// whole world stays reproducible.
    pub fn random(position: Point3<i32>, seed: u64) -> Self {
        let mixed = seed
            ^ (position.x as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ (position.y as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
            ^ (position.z as u64).wrapping_mul(0x1656_67B1_9E37_79F9);
        Self::with_grid(position, BlockGrid::random(mixed, 0.1, 8))
    }

    /// Returns `true` if the block data is resident and readable.
    #[inline]
    pub fn is_resident(&self) -> bool {
        self.state == ChunkState::OnCpu && self.grid.is_some()
    }

    /// The resident grid, `None` for any chunk not `OnCpu`.
    pub fn grid(&self) -> Option<&BlockGrid> {
        if self.state == ChunkState::OnCpu {
            self.grid.as_deref()
        } else {
            None
        }
    }

    /// Mutable access to the resident grid.
    pub fn grid_mut(&mut self) -> Option<&mut BlockGrid> {
        if self.state == ChunkState::OnCpu {
            self.grid.as_deref_mut()
        } else {
            None
        }
    }

    /// Gets the block at the specified chunk-relative coordinates, air if the chunk
    /// is not resident.
    ///
    /// # Panics
    /// Panics if the coordinates are out of bounds.
    pub fn get_block_at(&self, x: usize, y: usize, z: usize) -> Block {
        self.grid()
            .map(|grid| grid.get(x, y, z))
            .unwrap_or(Block::EMPTY)
    }

    /// Sets a block in a resident chunk. Returns `false` if the chunk has no data.
    pub fn set_block_at(&mut self, x: usize, y: usize, z: usize, block: Block) -> bool {
        match self.grid_mut() {
            Some(grid) => {
                grid.set(x, y, z, block);
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Drops the CPU copy after its mesh reached the GPU. Dirty chunks keep their
    /// data; returns `false` in that case.
    pub fn release_to_gpu(&mut self) -> bool {
        if self.dirty {
            return false;
        }
        self.grid = None;
        self.state = ChunkState::OnGpu;
        true
    }

    /// Drops the CPU copy after the data was persisted.
    pub fn release_to_disk(&mut self) {
        self.grid = None;
        self.state = ChunkState::OnDisk;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_resident_chunks_expose_data() {
        let mut chunk = Chunk::loaded(Point3::new(0, 0, 0), BlockGrid::filled(Block::new(1)));
        assert!(chunk.is_resident());
        assert_eq!(chunk.get_block_at(3, 3, 3), Block::new(1));

        assert!(chunk.release_to_gpu());
        assert_eq!(chunk.state, ChunkState::OnGpu);
        assert!(chunk.grid().is_none());
        assert_eq!(chunk.get_block_at(3, 3, 3), Block::EMPTY);
        assert!(!chunk.set_block_at(0, 0, 0, Block::new(2)));
    }

    #[test]
    fn random_chunks_depend_on_position() {
        let a = Chunk::random(Point3::new(0, 0, 0), 1);
        let b = Chunk::random(Point3::new(1, 0, 0), 1);
        let c = Chunk::random(Point3::new(0, 0, 0), 1);
        assert_ne!(a.grid, b.grid);
        assert_eq!(a.grid, c.grid);
    }

    #[test]
    fn dirty_chunks_keep_their_data() {
        let mut chunk = Chunk::loaded(Point3::new(0, 0, 0), BlockGrid::new());
        assert!(!chunk.dirty);
        assert!(chunk.set_block_at(1, 2, 3, Block::new(4)));
        assert!(chunk.dirty);
        assert!(!chunk.release_to_gpu());
        assert!(chunk.is_resident());
    }

    #[test]
    fn unloaded_chunk_is_none() {
        let chunk = Chunk::unloaded(Point3::new(4, 5, 6));
        assert_eq!(chunk.state, ChunkState::None);
        assert!(!chunk.is_resident());
    }
}
