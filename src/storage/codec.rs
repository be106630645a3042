//! Run-length record codec for block grids.
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! [record_count: i32]
//! [min_y: 1024 bytes][max_y: 1024 bytes]
//! [record_count x { index: u16, count: u16, block_type: u16 }]
//! ```
//!
//! Records are produced column by column in storage order. Each one covers a
//! maximal vertical run of the same non-air block type inside the column's
//! `[min_y, max_y)` range; `index` is the flat grid index of its lowest cell.
//! Air is never written. Health is not part of the format, so decoded blocks are
//! always at full health.

use crate::error::{Result, StorageError};
use crate::voxels::block::{Block, BlockTypeSize};
use crate::voxels::chunk::{BlockGrid, CHUNK_COLUMN_COUNT, CHUNK_DIMENSION, CHUNK_SIZE};

/// Bytes taken by the record count.
const COUNT_BYTES: usize = 4;
/// Bytes taken by the count and both height maps.
pub const HEADER_BYTES: usize = COUNT_BYTES + 2 * CHUNK_COLUMN_COUNT;
/// Bytes per run record.
pub const RECORD_BYTES: usize = 6;

/// One vertical run of identical block types.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RunRecord {
    pub index: u16,
    pub count: u16,
    pub block_type: BlockTypeSize,
}

/// Splits the grid into run records in storage order.
///
/// A run continues while the next solid cell directly follows it in the same
/// column and has the same type. Air ends a run.
pub fn runs(grid: &BlockGrid) -> Vec<RunRecord> {
    let mut records = Vec::new();
    let mut current: Option<RunRecord> = None;

    for (position, block) in grid.iter_blocks() {
        let index = BlockGrid::index(position.x, position.y, position.z);
        if let Some(run) = current.as_mut() {
            let next = run.index as usize + run.count as usize;
            let same_column = index / CHUNK_DIMENSION == run.index as usize / CHUNK_DIMENSION;
            if index == next && same_column && run.block_type == block.block_type {
                run.count += 1;
                continue;
            }
            records.push(*run);
        }
        current = Some(RunRecord {
            index: index as u16,
            count: 1,
            block_type: block.block_type,
        });
    }

    if let Some(run) = current {
        records.push(run);
    }
    records
}

/// Serializes `grid`.
pub fn encode(grid: &BlockGrid) -> Vec<u8> {
    let records = runs(grid);
    let mut out = Vec::with_capacity(HEADER_BYTES + records.len() * RECORD_BYTES);

    out.extend_from_slice(&(records.len() as i32).to_le_bytes());
    out.extend_from_slice(grid.min_heights());
    out.extend_from_slice(grid.max_heights());

    for record in &records {
        out.extend_from_slice(&record.index.to_le_bytes());
        out.extend_from_slice(&record.count.to_le_bytes());
        out.extend_from_slice(&record.block_type.to_le_bytes());
    }

    out
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

/// Rebuilds a grid from bytes produced by [`encode`].
pub fn decode(bytes: &[u8]) -> Result<BlockGrid> {
    if bytes.len() < HEADER_BYTES {
        return Err(StorageError::ShortRead {
            needed: HEADER_BYTES,
            available: bytes.len(),
        });
    }

    let record_count = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if record_count < 0 {
        return Err(StorageError::Corrupt(format!(
            "negative record count {record_count}"
        )));
    }
    let record_count = record_count as usize;

    let min_y = &bytes[COUNT_BYTES..COUNT_BYTES + CHUNK_COLUMN_COUNT];
    let max_y = &bytes[COUNT_BYTES + CHUNK_COLUMN_COUNT..HEADER_BYTES];
    validate_heights(min_y, max_y)?;

    let needed = HEADER_BYTES + record_count * RECORD_BYTES;
    if bytes.len() < needed {
        return Err(StorageError::ShortRead {
            needed,
            available: bytes.len(),
        });
    }
    if bytes.len() != needed {
        return Err(StorageError::Corrupt(format!(
            "{} trailing bytes after {record_count} records",
            bytes.len() - needed
        )));
    }

    let mut grid = BlockGrid::with_heights(min_y, max_y);
    if record_count == 0 {
        return Ok(grid);
    }

    for record_bytes in bytes[HEADER_BYTES..].chunks_exact(RECORD_BYTES) {
        let index = read_u16(record_bytes, 0) as usize;
        let count = read_u16(record_bytes, 2) as usize;
        let block_type = read_u16(record_bytes, 4);

        check_run(index, count, block_type, min_y, max_y)?;
        grid.fill_run(index, count, Block::new(block_type));
    }

    Ok(grid)
}

fn validate_heights(min_y: &[u8], max_y: &[u8]) -> Result<()> {
    let size = CHUNK_DIMENSION as u8;
    for (column, (&low, &high)) in min_y.iter().zip(max_y).enumerate() {
        let empty = low == size && high == 0;
        if !empty && (low >= high || high > size) {
            return Err(StorageError::Corrupt(format!(
                "column {column} has invalid height range {low}..{high}"
            )));
        }
    }
    Ok(())
}

fn check_run(
    index: usize,
    count: usize,
    block_type: BlockTypeSize,
    min_y: &[u8],
    max_y: &[u8],
) -> Result<()> {
    if count == 0 || block_type == 0 || index >= CHUNK_SIZE {
        return Err(StorageError::Corrupt(format!(
            "invalid run at {index}: count {count}, type {block_type}"
        )));
    }

    let column = index / CHUNK_DIMENSION;
    let y = index % CHUNK_DIMENSION;
    let low = min_y[column] as usize;
    let high = max_y[column] as usize;

    if y < low || y + count > high {
        return Err(StorageError::Corrupt(format!(
            "run {index}+{count} leaves column range {low}..{high}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxels::block::FULL_HEALTH;

    #[test]
    fn empty_grid_is_header_only() {
        let bytes = encode(&BlockGrid::new());
        assert_eq!(bytes.len(), HEADER_BYTES);
        assert_eq!(&bytes[..4], &0i32.to_le_bytes());
        assert!(decode(&bytes).unwrap().is_empty());
    }

    #[test]
    fn runs_split_on_type_and_gaps() {
        let mut grid = BlockGrid::new();
        for y in 0..4 {
            grid.set(0, y, 0, Block::new(1));
        }
        grid.set(0, 4, 0, Block::new(2));
        grid.set(0, 6, 0, Block::new(2));

        let records = runs(&grid);
        assert_eq!(
            records,
            vec![
                RunRecord { index: 0, count: 4, block_type: 1 },
                RunRecord { index: 4, count: 1, block_type: 2 },
                RunRecord { index: 6, count: 1, block_type: 2 },
            ]
        );
    }

    #[test]
    fn health_is_not_persisted() {
        let mut grid = BlockGrid::new();
        grid.set(1, 2, 3, Block::with_health(5, 10));
        grid.set(1, 3, 3, Block::new(5));

        let decoded = decode(&encode(&grid)).unwrap();
        assert_eq!(runs(&grid).len(), 1);
        assert_eq!(decoded.get(1, 2, 3), Block::with_health(5, FULL_HEALTH));
        assert_eq!(decoded.block_count(), 2);
        assert_eq!(decoded.column_range(1, 3), 2..4);
    }

    #[test]
    fn negative_count_is_corrupt() {
        let mut bytes = encode(&BlockGrid::new());
        bytes[..4].copy_from_slice(&(-1i32).to_le_bytes());
        assert!(matches!(decode(&bytes), Err(StorageError::Corrupt(_))));
    }

    #[test]
    fn truncated_input_is_short_read() {
        assert!(matches!(
            decode(&[0, 0]),
            Err(StorageError::ShortRead { needed: HEADER_BYTES, available: 2 })
        ));

        let mut grid = BlockGrid::new();
        grid.set(0, 0, 0, Block::new(1));
        let bytes = encode(&grid);
        assert!(matches!(
            decode(&bytes[..bytes.len() - 1]),
            Err(StorageError::ShortRead { .. })
        ));
    }

    #[test]
    fn trailing_bytes_are_corrupt() {
        let mut bytes = encode(&BlockGrid::new());
        bytes.push(0);
        assert!(matches!(decode(&bytes), Err(StorageError::Corrupt(_))));
    }

    #[test]
    fn run_outside_column_range_is_corrupt() {
        let mut grid = BlockGrid::new();
        grid.set(0, 0, 0, Block::new(1));
        let mut bytes = encode(&grid);
        // stretch the only run past max_y
        bytes[HEADER_BYTES + 2..HEADER_BYTES + 4].copy_from_slice(&3u16.to_le_bytes());
        assert!(matches!(decode(&bytes), Err(StorageError::Corrupt(_))));
    }

    #[test]
    fn bad_heights_are_corrupt() {
        let mut bytes = encode(&BlockGrid::new());
        bytes[COUNT_BYTES] = 40;
        assert!(matches!(decode(&bytes), Err(StorageError::Corrupt(_))));
    }
}
