//! # Block Grid
//!
//! Dense storage for the blocks of one chunk plus two per-column height maps.
//!
//! ## Layout
//!
//! Blocks are stored in a flat vector addressed by `((z * S + x) * S) + y`, so each
//! vertical column is contiguous in memory. Both the mesher and the record codec
//! walk columns bottom-to-top, which makes this the cache-friendly order for them.
//!
//! ## Height maps
//!
//! `min_y[col]` and `max_y[col]` bound the occupied part of column `col = z * S + x`
//! as the half-open range `[min_y, max_y)`. An empty column stores `min_y == S` and
//! `max_y == 0`, so loops over the range do nothing. The maps are kept conservative:
//! every non-air block of a column lies inside its range, and the range is shrunk
//! back to the exact extent when the lowest or highest block is removed.

use std::ops::Range;

use crate::voxels::block::{Block, BlockTypeSize};

use super::{CHUNK_COLUMN_COUNT, CHUNK_DIMENSION, CHUNK_SIZE};

/// Block storage for one chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockGrid {
    data: Vec<Block>,
    min_y: Vec<u8>,
    max_y: Vec<u8>,
    block_count: u32,
}

impl Default for BlockGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockGrid {
    /// Creates a grid filled with air.
    pub fn new() -> Self {
        BlockGrid {
            data: vec![Block::EMPTY; CHUNK_SIZE],
            min_y: vec![CHUNK_DIMENSION as u8; CHUNK_COLUMN_COUNT],
            max_y: vec![0; CHUNK_COLUMN_COUNT],
            block_count: 0,
        }
    }

    /// Creates a grid where every cell holds `block`.
    pub fn filled(block: Block) -> Self {
        let mut grid = Self::new();
        if block.is_empty() {
            return grid;
        }
        grid.data.fill(block);
        grid.min_y.fill(0);
        grid.max_y.fill(CHUNK_DIMENSION as u8);
        grid.block_count = CHUNK_SIZE as u32;
        grid
    }

    /// Creates a 3D checkerboard of `block` and air.
    pub fn checkerboard(block: Block) -> Self {
        let mut grid = Self::new();
        for z in 0..CHUNK_DIMENSION {
            for x in 0..CHUNK_DIMENSION {
                for y in 0..CHUNK_DIMENSION {
                    if (x + y + z) % 2 == 0 {
                        grid.set(x, y, z, block);
                    }
                }
            }
        }
        grid
    }

    /// Creates a reproducible random grid.
    ///
    /// Each cell is solid with probability `density`; solid cells pick a type from
    /// `1..=max_type` and a random health so that merging and health loss both get
    /// exercised.
    pub fn random(seed: u64, density: f64, max_type: BlockTypeSize) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);
        let mut grid = Self::new();
        for z in 0..CHUNK_DIMENSION {
            for x in 0..CHUNK_DIMENSION {
                for y in 0..CHUNK_DIMENSION {
                    if rng.f64() < density {
                        let block_type = rng.u16(1..=max_type.max(1));
                        let health = if rng.bool() { u8::MAX } else { rng.u8(..) };
                        grid.set(x, y, z, Block::with_health(block_type, health));
                    }
                }
            }
        }
        grid
    }

    /// Flat index of the cell at `(x, y, z)`.
    #[inline]
    pub fn index(x: usize, y: usize, z: usize) -> usize {
        ((z * CHUNK_DIMENSION + x) * CHUNK_DIMENSION) + y
    }

    /// Index of the `(x, z)` column in the height maps.
    #[inline]
    pub fn column_index(x: usize, z: usize) -> usize {
        z * CHUNK_DIMENSION + x
    }

    /// Inverse of [`BlockGrid::index`].
    #[inline]
    pub fn coordinates(index: usize) -> (usize, usize, usize) {
        let y = index % CHUNK_DIMENSION;
        let column = index / CHUNK_DIMENSION;
        let x = column % CHUNK_DIMENSION;
        let z = column / CHUNK_DIMENSION;
        (x, y, z)
    }

    /// Block at `(x, y, z)`.
    ///
    /// # Panics
    /// Panics if any coordinate is outside `0..CHUNK_DIMENSION`.
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> Block {
        self.data[Self::index(x, y, z)]
    }

    /// Stores `block` at `(x, y, z)`, keeping the height maps and block count in sync.
    pub fn set(&mut self, x: usize, y: usize, z: usize, block: Block) {
        let index = Self::index(x, y, z);
        let column = Self::column_index(x, z);
        let previous = std::mem::replace(&mut self.data[index], block);

        match (previous.is_empty(), block.is_empty()) {
            (true, false) => {
                self.block_count += 1;
                self.min_y[column] = self.min_y[column].min(y as u8);
                self.max_y[column] = self.max_y[column].max(y as u8 + 1);
            }
            (false, true) => {
                self.block_count -= 1;
                if y as u8 == self.min_y[column] || y as u8 + 1 == self.max_y[column] {
                    self.recompute_column(column);
                }
            }
            _ => {}
        }
    }

    fn recompute_column(&mut self, column: usize) {
        let base = column * CHUNK_DIMENSION;
        let cells = &self.data[base..base + CHUNK_DIMENSION];
        match cells.iter().position(|block| !block.is_empty()) {
            Some(low) => {
                let high = cells.iter().rposition(|block| !block.is_empty()).unwrap_or(low);
                self.min_y[column] = low as u8;
                self.max_y[column] = high as u8 + 1;
            }
            None => {
                self.min_y[column] = CHUNK_DIMENSION as u8;
                self.max_y[column] = 0;
            }
        }
    }

    /// Occupied `y` range of the `(x, z)` column; empty when the column holds only air.
    #[inline]
    pub fn column_range(&self, x: usize, z: usize) -> Range<usize> {
        let column = Self::column_index(x, z);
        let low = self.min_y[column] as usize;
        let high = self.max_y[column] as usize;
        if low >= high {
            0..0
        } else {
            low..high
        }
    }

    /// Lower height map, one byte per column.
    pub fn min_heights(&self) -> &[u8] {
        &self.min_y
    }

    /// Upper (exclusive) height map, one byte per column.
    pub fn max_heights(&self) -> &[u8] {
        &self.max_y
    }

    /// Number of non-air cells.
    #[inline]
    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    /// `true` if the grid contains only air.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.block_count == 0
    }

    /// Builds an all-air grid carrying the given height maps. Used by the codec, which
    /// fills runs afterwards with [`BlockGrid::fill_run`].
    pub(crate) fn with_heights(min_y: &[u8], max_y: &[u8]) -> Self {
        BlockGrid {
            data: vec![Block::EMPTY; CHUNK_SIZE],
            min_y: min_y.to_vec(),
            max_y: max_y.to_vec(),
            block_count: 0,
        }
    }

    /// Writes `count` copies of `block` starting at a flat index without touching the
    /// height maps. The caller guarantees the run stays inside one column's range.
    pub(crate) fn fill_run(&mut self, start: usize, count: usize, block: Block) {
        for cell in &mut self.data[start..start + count] {
            if cell.is_empty() && !block.is_empty() {
                self.block_count += 1;
            }
            *cell = block;
        }
    }

    /// Iterates over the non-air cells in storage order.
    pub fn iter_blocks(&self) -> super::chunk_iteration::ColumnBlockIterator<'_> {
        super::chunk_iteration::ColumnBlockIterator::new(self)
    }
}
