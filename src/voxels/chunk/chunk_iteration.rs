//! # Chunk Iteration Module
//!
//! An iterator over the non-air blocks of a [`BlockGrid`].
//!
//! ## Height-Bounded Iteration
//!
//! The `ColumnBlockIterator` walks columns in Z→X order and, inside a column, only
//! visits the `[min_y, max_y)` range recorded in the height maps. Columns that hold
//! nothing but air are skipped without touching the block data at all.

use cgmath::Point3;

use crate::voxels::block::Block;

use super::block_grid::BlockGrid;
use super::{CHUNK_COLUMN_COUNT, CHUNK_DIMENSION};

/// An iterator over all non-air blocks in a grid, in storage order.
pub struct ColumnBlockIterator<'a> {
    /// Grid being iterated over
    grid: &'a BlockGrid,
    /// Current column (`z * S + x`)
    column: usize,
    /// Next `y` to inspect in the current column
    y: usize,
    /// Exclusive end of the current column's range
    end_y: usize,
}

impl<'a> ColumnBlockIterator<'a> {
    /// Creates an iterator positioned before the first column.
    pub fn new(grid: &'a BlockGrid) -> Self {
        let mut iterator = ColumnBlockIterator {
            grid,
            column: 0,
            y: 0,
            end_y: 0,
        };
        iterator.enter_column();
        iterator
    }

    fn enter_column(&mut self) {
        while self.column < CHUNK_COLUMN_COUNT {
            let x = self.column % CHUNK_DIMENSION;
            let z = self.column / CHUNK_DIMENSION;
            let range = self.grid.column_range(x, z);
            if !range.is_empty() {
                self.y = range.start;
                self.end_y = range.end;
                return;
            }
            self.column += 1;
        }
    }
}

impl Iterator for ColumnBlockIterator<'_> {
    type Item = (Point3<usize>, Block);

    fn next(&mut self) -> Option<Self::Item> {
        while self.column < CHUNK_COLUMN_COUNT {
            let x = self.column % CHUNK_DIMENSION;
            let z = self.column / CHUNK_DIMENSION;

            while self.y < self.end_y {
                let y = self.y;
                self.y += 1;
                let block = self.grid.get(x, y, z);
                if !block.is_empty() {
                    return Some((Point3::new(x, y, z), block));
                }
            }

            self.column += 1;
            self.enter_column();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visits_only_solid_blocks_in_storage_order() {
        let mut grid = BlockGrid::new();
        grid.set(1, 3, 0, Block::new(2));
        grid.set(0, 7, 1, Block::new(1));
        grid.set(0, 5, 1, Block::new(1));
        grid.set(1, 4, 0, Block::new(3));

        let visited: Vec<_> = grid.iter_blocks().map(|(pos, _)| pos).collect();
        assert_eq!(
            visited,
            vec![
                Point3::new(1, 3, 0),
                Point3::new(1, 4, 0),
                Point3::new(0, 5, 1),
                Point3::new(0, 7, 1),
            ]
        );
    }

    #[test]
    fn empty_grid_yields_nothing() {
        assert_eq!(BlockGrid::new().iter_blocks().count(), 0);
    }

    #[test]
    fn count_matches_block_count() {
        let grid = BlockGrid::random(4, 0.2, 3);
        assert_eq!(grid.iter_blocks().count() as u32, grid.block_count());
    }
}
