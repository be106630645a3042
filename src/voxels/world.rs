//! # World Module
//!
//! This module provides the `World` struct which manages the collection of chunks
//! currently known to the engine.
//!
//! ## Architecture
//!
//! The world is a sparse map from chunk coordinates to shared chunk handles. Chunks
//! never point back at the world or at each other: anything that needs a neighbour
//! asks the world for the chunk at `position + offset`. Chunks that are not in the
//! map, or not resident, are treated as air by their neighbours.

use std::collections::HashMap;

use cgmath::Point3;

use crate::core::MtResource;
use crate::voxels::block::block_side::BlockSide;
use crate::voxels::block::Block;
use crate::voxels::chunk::{Chunk, CHUNK_DIMENSION};

/// A voxel world composed of chunks.
///
/// # Examples
///
/// ```
/// use cgmath::Point3;
/// use voxel_world_core::voxels::chunk::Chunk;
/// use voxel_world_core::voxels::world::World;
///
/// let mut world = World::new();
/// world.insert_chunk(Chunk::solid(Point3::new(0, 0, 0), 1));
///
/// let chunk = world.get_chunk_at(Point3::new(0, 0, 0)).unwrap();
/// assert!(chunk.get().is_resident());
/// assert!(world.get_chunk_at(Point3::new(1, 0, 0)).is_none());
/// ```
#[derive(Default)]
pub struct World {
    /// A mapping from chunk coordinates to chunk data.
    pub chunks: HashMap<Point3<i32>, MtResource<Chunk>>,
}

impl World {
    /// Creates a new, empty world.
    pub fn new() -> Self {
        World {
            chunks: HashMap::new(),
        }
    }

    /// Adds `chunk` at its own position, replacing any chunk already there.
    ///
    /// Returns the shared handle now stored in the world.
    pub fn insert_chunk(&mut self, chunk: Chunk) -> MtResource<Chunk> {
        let position = chunk.position;
        let resource = MtResource::new(chunk);
        self.chunks.insert(position, resource.clone());
        resource
    }

    /// Retrieves the chunk at the specified chunk coordinates.
    pub fn get_chunk_at(&self, pos: Point3<i32>) -> Option<MtResource<Chunk>> {
        self.chunks.get(&pos).cloned()
    }

    /// Removes the chunk at `pos` from the world.
    pub fn remove_chunk(&mut self, pos: Point3<i32>) -> Option<MtResource<Chunk>> {
        self.chunks.remove(&pos)
    }

    /// The six face neighbours of `pos`, indexed by [`BlockSide`] tag.
    pub fn neighbors(&self, pos: Point3<i32>) -> [Option<MtResource<Chunk>>; 6] {
        BlockSide::all().map(|side| self.get_chunk_at(pos + side.offset()))
    }

    /// Positions of every chunk currently in the world.
    pub fn chunk_positions(&self) -> Vec<Point3<i32>> {
        self.chunks.keys().copied().collect()
    }

    /// Number of chunks in the world.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns `true` if the world holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Splits a world block coordinate into the chunk position and the
    /// chunk-relative coordinate.
    pub fn split_block_position(block: Point3<i32>) -> (Point3<i32>, Point3<usize>) {
        let size = CHUNK_DIMENSION as i32;
        let chunk = Point3::new(
            block.x.div_euclid(size),
            block.y.div_euclid(size),
            block.z.div_euclid(size),
        );
        let local = Point3::new(
            block.x.rem_euclid(size) as usize,
            block.y.rem_euclid(size) as usize,
            block.z.rem_euclid(size) as usize,
        );
        (chunk, local)
    }

    /// Block at a world block coordinate, `None` if its chunk is missing or not
    /// resident.
    pub fn block_at(&self, block: Point3<i32>) -> Option<Block> {
        let (chunk_pos, local) = Self::split_block_position(block);
        let chunk = self.get_chunk_at(chunk_pos)?;
        let guard = chunk.get();
        guard.grid().map(|grid| grid.get(local.x, local.y, local.z))
    }

    /// Writes a block at a world block coordinate. Returns `false` if the chunk is
    /// missing or not resident.
    pub fn set_block_at(&self, block: Point3<i32>, value: Block) -> bool {
        let (chunk_pos, local) = Self::split_block_position(block);
        match self.get_chunk_at(chunk_pos) {
            Some(chunk) => chunk.get_mut().set_block_at(local.x, local.y, local.z, value),
            None => false,
        }
    }
}
