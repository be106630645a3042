//! Greedy meshing of a single chunk.
//!
//! The mesher walks the grid in storage order (Z, then X, then Y over each column's
//! occupied range). For every solid cell it tries each of the six faces; a face that
//! is visible and not yet covered seeds a rectangle which is grown first along the
//! `u` axis of its plane and then row by row along `v`. Cells join the rectangle
//! only while they hold the same block (type and health), show the same face, and
//! have not been covered yet. Every covered face is recorded in a per-side bit mask
//! so it is emitted exactly once.

use bitvec::prelude::BitVec;
use log::trace;
use web_time::Instant;

use crate::voxels::block::block_side::BlockSide;
use crate::voxels::block::Block;
use crate::voxels::chunk::{BlockGrid, CHUNK_DIMENSION, CHUNK_SIZE};

use super::face::{plane_axes, to_cell, Quad};
use super::vertex::PackedVertex;
use super::{ChunkMesh, ChunkNeighbors};

/// Minimum number of words reserved before meshing starts.
pub const MIN_RESERVED_WORDS: usize = 4096;
/// Slack added on top of the previous mesh size when reserving.
pub const RESERVE_SLACK_WORDS: usize = 1024;
/// Extra words reserved whenever the buffer runs out of room for a quad.
pub const GROW_WORDS: usize = 2048;

const WORDS_PER_QUAD: usize = 6;

/// Reusable greedy mesher. Keeps its visited masks between calls.
pub struct ChunkMesher {
    visited: BitVec,
}

impl Default for ChunkMesher {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkMesher {
    pub fn new() -> Self {
        ChunkMesher {
            visited: BitVec::repeat(false, 6 * CHUNK_SIZE),
        }
    }

    /// Meshes `grid`, consulting `neighbors` at the chunk boundary.
    ///
    /// `previous_words` is the size of the last mesh built for the same chunk and
    /// only affects the initial reservation.
    pub fn mesh(
        &mut self,
        grid: &BlockGrid,
        neighbors: &ChunkNeighbors<'_>,
        previous_words: usize,
    ) -> ChunkMesh {
        if grid.is_empty() {
            return ChunkMesh::default();
        }

        let start = Instant::now();
        self.visited.fill(false);

        let mut vertices: Vec<PackedVertex> =
            Vec::with_capacity(MIN_RESERVED_WORDS.max(previous_words + RESERVE_SLACK_WORDS));

        for z in 0..CHUNK_DIMENSION {
            for x in 0..CHUNK_DIMENSION {
                for y in grid.column_range(x, z) {
                    let block = grid.get(x, y, z);
                    if block.is_empty() {
                        continue;
                    }

                    for side in BlockSide::all() {
                        let index = BlockGrid::index(x, y, z);
                        if self.is_visited(side, index)
                            || !face_visible(grid, neighbors, [x, y, z], side)
                        {
                            continue;
                        }

                        let quad = self.grow(grid, neighbors, [x, y, z], side, block);
                        if vertices.capacity() - vertices.len() < WORDS_PER_QUAD {
                            vertices.reserve_exact(GROW_WORDS);
                        }
                        quad.emit(&mut vertices);
                    }
                }
            }
        }

        trace!(
            "meshed {} blocks into {} quads in {:?}",
            grid.block_count(),
            vertices.len() / WORDS_PER_QUAD,
            start.elapsed()
        );

        ChunkMesh { vertices }
    }

    #[inline]
    fn is_visited(&self, side: BlockSide, index: usize) -> bool {
        self.visited[side as usize * CHUNK_SIZE + index]
    }

    #[inline]
    fn mark_visited(&mut self, side: BlockSide, index: usize) {
        self.visited.set(side as usize * CHUNK_SIZE + index, true);
    }

    fn can_merge(
        &self,
        grid: &BlockGrid,
        neighbors: &ChunkNeighbors<'_>,
        cell: [usize; 3],
        side: BlockSide,
        block: Block,
    ) -> bool {
        let [x, y, z] = cell;
        grid.get(x, y, z) == block
            && !self.is_visited(side, BlockGrid::index(x, y, z))
            && face_visible(grid, neighbors, cell, side)
    }

    fn grow(
        &mut self,
        grid: &BlockGrid,
        neighbors: &ChunkNeighbors<'_>,
        seed: [usize; 3],
        side: BlockSide,
        block: Block,
    ) -> Quad {
        let (u_axis, v_axis) = plane_axes(side);
        let layer = seed[side.axis()];
        let u0 = seed[u_axis];
        let v0 = seed[v_axis];

        let mut u1 = u0 + 1;
        while u1 < CHUNK_DIMENSION
            && self.can_merge(grid, neighbors, to_cell(side, layer, u1, v0), side, block)
        {
            u1 += 1;
        }

        let mut v1 = v0 + 1;
        while v1 < CHUNK_DIMENSION
            && (u0..u1).all(|u| {
                self.can_merge(grid, neighbors, to_cell(side, layer, u, v1), side, block)
            })
        {
            v1 += 1;
        }

        for v in v0..v1 {
            for u in u0..u1 {
                let [x, y, z] = to_cell(side, layer, u, v);
                self.mark_visited(side, BlockGrid::index(x, y, z));
            }
        }

        Quad {
            side,
            layer,
            u0,
            v0,
            u1,
            v1,
            block,
        }
    }
}

/// Returns `true` if the `side` face of the solid cell at `cell` must be drawn.
///
/// The face is hidden only by a neighbour of the same block type. Outside the chunk
/// the neighbour comes from the matching entry of `neighbors`; a missing entry
/// exposes the face.
pub fn face_visible(
    grid: &BlockGrid,
    neighbors: &ChunkNeighbors<'_>,
    cell: [usize; 3],
    side: BlockSide,
) -> bool {
    let own_type = grid.get(cell[0], cell[1], cell[2]).block_type;
    let offset = side.offset();
    let target = [
        cell[0] as i32 + offset.x,
        cell[1] as i32 + offset.y,
        cell[2] as i32 + offset.z,
    ];

    let size = CHUNK_DIMENSION as i32;
    let inside = target.iter().all(|&c| (0..size).contains(&c));

    let neighbor_block = if inside {
        grid.get(target[0] as usize, target[1] as usize, target[2] as usize)
    } else {
        match neighbors[side as usize] {
            Some(neighbor) => neighbor.get(
                target[0].rem_euclid(size) as usize,
                target[1].rem_euclid(size) as usize,
                target[2].rem_euclid(size) as usize,
            ),
            None => return true,
        }
    };

    neighbor_block.is_empty() || neighbor_block.block_type != own_type
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_meshes_fit_the_initial_reservation() {
        let grid = BlockGrid::filled(Block::new(1));
        let mesh = ChunkMesher::new().mesh(&grid, &[None; 6], 0);
        assert_eq!(mesh.vertex_count(), 36);
        assert_eq!(mesh.vertices.capacity(), MIN_RESERVED_WORDS);
    }

    #[test]
    fn buffer_grows_in_fixed_steps() {
        let grid = BlockGrid::checkerboard(Block::new(1));
        let mesh = ChunkMesher::new().mesh(&grid, &[None; 6], 0);

        assert_eq!(mesh.quad_count(), grid.block_count() as usize * 6);
        assert!(mesh.vertex_count() > MIN_RESERVED_WORDS);
        let slack = mesh.vertices.capacity() - mesh.vertex_count();
        assert!(slack <= GROW_WORDS, "slack of {slack} words");
    }

    #[test]
    fn previous_size_raises_the_reservation() {
        let grid = BlockGrid::filled(Block::new(1));
        let mesh = ChunkMesher::new().mesh(&grid, &[None; 6], 10_000);
        assert_eq!(mesh.vertices.capacity(), 10_000 + RESERVE_SLACK_WORDS);
    }
}
