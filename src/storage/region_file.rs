//! A single region file on disk.
//!
//! ## Layout
//!
//! ```text
//! [magic "VOXREGN": 7 bytes][version: u32 LE]
//! [seek table: 1024 x { block_offset: i64, block_count: i32 }]
//! [payload: 8192-byte blocks]
//! ```
//!
//! Each chunk occupies a contiguous span of payload blocks holding its compressed
//! record stream, zero padded to the end of the last block. The payload is kept
//! packed in ascending offset order: when a chunk changes size, every span after it
//! is shifted so that no gaps remain and the file shrinks or grows accordingly.
//!
//! ## Failure model
//!
//! An I/O error in the middle of a structural write can leave the on-disk table and
//! the in-memory table disagreeing. The file is then flagged as desynchronised and
//! refuses further work until it is reopened.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{debug, trace, warn};

use crate::error::{Result, StorageError};
use crate::voxels::chunk::BlockGrid;

use super::codec;
use super::compression;
use super::seek_table::{SeekEntry, SeekTable, SEEK_TABLE_BYTES};

/// Identifies region files.
pub const REGION_MAGIC: &[u8; 7] = b"VOXREGN";
/// Format version written by this crate.
pub const REGION_VERSION: u32 = 1;
/// Bytes before the seek table.
pub const REGION_HEADER_BYTES: u64 = REGION_MAGIC.len() as u64 + 4;
/// File offset of payload block 0.
pub const PAYLOAD_START: u64 = REGION_HEADER_BYTES + SEEK_TABLE_BYTES as u64;
/// Size of a payload block.
pub const PAYLOAD_BLOCK_BYTES: u64 = 8192;

/// An open region file and its seek table.
pub struct RegionFile {
    path: PathBuf,
    file: File,
    table: SeekTable,
    compression_level: i32,
    desynchronized: bool,
}

impl std::fmt::Debug for RegionFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionFile")
            .field("path", &self.path)
            .field("desynchronized", &self.desynchronized)
            .finish_non_exhaustive()
    }
}

impl RegionFile {
    /// Opens the region at `path`, creating and initialising it when it does not
    /// exist or is empty.
    pub fn open<P: AsRef<Path>>(path: P, compression_level: i32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let length = file.metadata()?.len();
        let table = if length == 0 {
            let table = SeekTable::new();
            file.write_all(&header_bytes())?;
            file.write_all(&table.to_bytes())?;
            file.flush()?;
            debug!("created region file {:?}", path);
            table
        } else {
            let table = read_header(&mut file, &path, length)?;
            debug!("opened region file {:?} ({} bytes)", path, length);
            table
        };

        let region = RegionFile {
            path,
            file,
            table,
            compression_level,
            desynchronized: false,
        };
        region.validate()?;
        Ok(region)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// In-memory snapshot of the seek table.
    pub fn table(&self) -> &SeekTable {
        &self.table
    }

    pub fn is_desynchronized(&self) -> bool {
        self.desynchronized
    }

    /// Flags the file as out of sync with the disk. Every later operation fails with
    /// [`StorageError::Desynchronized`].
    pub fn mark_desynchronized(&mut self) {
        self.desynchronized = true;
    }

    /// Returns `true` if `slot` has data on disk.
    pub fn contains_chunk(&self, slot: usize) -> bool {
        self.table.get(slot).is_written()
    }

    /// Payload blocks currently in the file, derived from its length.
    pub fn payload_blocks(&self) -> Result<i64> {
        let length = self.file.metadata()?.len();
        if length < PAYLOAD_START {
            return Err(StorageError::ShortRead {
                needed: PAYLOAD_START as usize,
                available: length as usize,
            });
        }
        let payload = length - PAYLOAD_START;
        if payload % PAYLOAD_BLOCK_BYTES != 0 {
            return Err(StorageError::Corrupt(format!(
                "payload of {payload} bytes is not a whole number of blocks"
            )));
        }
        Ok((payload / PAYLOAD_BLOCK_BYTES) as i64)
    }

    /// Bounds and overlap check of the seek table against the file length.
    pub fn validate(&self) -> Result<()> {
        let blocks = self.payload_blocks()?;
        self.table.validate(blocks)
    }

    fn ensure_synchronized(&self) -> Result<()> {
        if self.desynchronized {
            return Err(StorageError::Desynchronized {
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    fn guarded<T>(&mut self, operation: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.ensure_synchronized()?;
        let result = operation(self);
        if let Err(error) = &result {
            warn!("region file {:?} desynchronised: {}", self.path, error);
            self.desynchronized = true;
        }
        result
    }

    /// Reads the chunk stored in `slot`, `None` if it was never written.
    pub fn read_chunk(&mut self, slot: usize) -> Result<Option<BlockGrid>> {
        self.ensure_synchronized()?;
        let entry = self.table.get(slot);
        if !entry.is_written() {
            return Ok(None);
        }

        let span = entry.block_count as u64 * PAYLOAD_BLOCK_BYTES;
        self.file
            .seek(SeekFrom::Start(block_position(entry.block_offset)?))?;
        let mut raw = Vec::with_capacity(span as usize);
        (&mut self.file).take(span).read_to_end(&mut raw)?;
        if (raw.len() as u64) < span {
            return Err(StorageError::ShortRead {
                needed: span as usize,
                available: raw.len(),
            });
        }

        let bytes = compression::decompress(&raw)?;
        codec::decode(&bytes).map(Some)
    }

    /// Writes `grid` to `slot`, moving later chunks if its size in blocks changes.
    pub fn write_chunk(&mut self, slot: usize, grid: &BlockGrid) -> Result<()> {
        self.ensure_synchronized()?;
        let payload = compression::compress(&codec::encode(grid), self.compression_level)?;
        let required = (payload.len() as u64).div_ceil(PAYLOAD_BLOCK_BYTES);
        if required > i32::MAX as u64 {
            return Err(StorageError::ChunkTooLarge {
                blocks: required as usize,
            });
        }
        let required = required as i32;

        self.guarded(|region| {
            let entry = region.table.get(slot);

            if !entry.is_written() {
                let offset = region.table.payload_end();
                region.write_blocks(offset, &payload, required)?;
                region.table.set(
                    slot,
                    SeekEntry {
                        block_offset: offset,
                        block_count: required,
                    },
                );
                region.truncate_to_payload()?;
                return region.write_table();
            }

            if entry.block_count == required {
                return region.write_blocks(entry.block_offset, &payload, required);
            }

            let delta = required as i64 - entry.block_count as i64;
            region.shift_following(entry, delta)?;
            region.write_blocks(entry.block_offset, &payload, required)?;
            region.table.set(
                slot,
                SeekEntry {
                    block_offset: entry.block_offset,
                    block_count: required,
                },
            );
            region.table.shift_after(entry.block_offset, delta);
            region.truncate_to_payload()?;
            region.write_table()
        })
    }

    /// Removes the chunk in `slot` and closes the gap it leaves.
    pub fn delete_chunk(&mut self, slot: usize) -> Result<()> {
        self.ensure_synchronized()?;
        let entry = self.table.get(slot);
        if !entry.is_written() {
            return Ok(());
        }

        self.guarded(|region| {
            let delta = -(entry.block_count as i64);
            region.shift_following(entry, delta)?;
            region.table.set(slot, SeekEntry::UNWRITTEN);
            region.table.shift_after(entry.block_offset, delta);
            region.truncate_to_payload()?;
            region.write_table()
        })
    }

    /// Rewrites the header and seek table from memory and syncs the file.
    pub fn flush(&mut self) -> Result<()> {
        self.guarded(|region| {
            region.file.seek(SeekFrom::Start(0))?;
            region.file.write_all(&header_bytes())?;
            region.file.write_all(&region.table.to_bytes())?;
            region.file.flush()?;
            region.file.sync_data()?;
            Ok(())
        })
    }

    fn write_table(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(REGION_HEADER_BYTES))?;
        self.file.write_all(&self.table.to_bytes())?;
        Ok(())
    }

    fn write_blocks(&mut self, offset: i64, payload: &[u8], blocks: i32) -> Result<()> {
        let span = blocks as usize * PAYLOAD_BLOCK_BYTES as usize;
        self.file.seek(SeekFrom::Start(block_position(offset)?))?;
        self.file.write_all(payload)?;
        let padding = vec![0u8; span - payload.len()];
        self.file.write_all(&padding)?;
        Ok(())
    }

    fn truncate_to_payload(&mut self) -> Result<()> {
        let end = self.table.payload_end();
        self.file.set_len(block_position(end)?)?;
        Ok(())
    }

    /// Moves every payload block after `entry` by `delta` blocks through a single
    /// block-sized staging buffer. Blocks are copied front to back when moving
    /// down and back to front when moving up so no source is overwritten before
    /// it has been read.
    fn shift_following(&mut self, entry: SeekEntry, delta: i64) -> Result<()> {
        let first = entry.end();
        let end = self.table.payload_end();
        if delta == 0 || first >= end {
            return Ok(());
        }

        trace!(
            "region {:?}: moving blocks {}..{} by {}",
            self.path,
            first,
            end,
            delta
        );

        let mut staging = vec![0u8; PAYLOAD_BLOCK_BYTES as usize];
        let mut move_block = |file: &mut File, block: i64| -> Result<()> {
            file.seek(SeekFrom::Start(block_position(block)?))?;
            file.read_exact(&mut staging)?;
            file.seek(SeekFrom::Start(block_position(block + delta)?))?;
            file.write_all(&staging)?;
            Ok(())
        };

        if delta < 0 {
            for block in first..end {
                move_block(&mut self.file, block)?;
            }
        } else {
            for block in (first..end).rev() {
                move_block(&mut self.file, block)?;
            }
        }
        Ok(())
    }
}

/// Byte position of payload block `block`. Negative or out-of-range blocks are
/// reported as corruption.
#[inline]
fn block_position(block: i64) -> Result<u64> {
    u64::try_from(block)
        .ok()
        .and_then(|block| block.checked_mul(PAYLOAD_BLOCK_BYTES))
        .and_then(|bytes| bytes.checked_add(PAYLOAD_START))
        .ok_or_else(|| StorageError::Corrupt(format!("payload block {block} is out of range")))
}

fn header_bytes() -> Vec<u8> {
    let mut header = Vec::with_capacity(REGION_HEADER_BYTES as usize);
    header.extend_from_slice(REGION_MAGIC);
    header.extend_from_slice(&REGION_VERSION.to_le_bytes());
    header
}

fn read_header(file: &mut File, path: &Path, length: u64) -> Result<SeekTable> {
    file.seek(SeekFrom::Start(0))?;

    let mut magic = [0u8; 7];
    let magic_len = (length as usize).min(magic.len());
    file.read_exact(&mut magic[..magic_len])?;
    if magic_len < magic.len() || &magic != REGION_MAGIC {
        return Err(StorageError::BadMagic {
            path: path.to_path_buf(),
        });
    }

    if length < PAYLOAD_START {
        return Err(StorageError::ShortRead {
            needed: PAYLOAD_START as usize,
            available: length as usize,
        });
    }

    let mut version = [0u8; 4];
    file.read_exact(&mut version)?;
    let version = u32::from_le_bytes(version);
    if version != REGION_VERSION {
        return Err(StorageError::UnsupportedVersion {
            found: version,
            expected: REGION_VERSION,
        });
    }

    let mut table = vec![0u8; SEEK_TABLE_BYTES];
    file.read_exact(&mut table)?;
    SeekTable::from_bytes(&table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxels::block::Block;

    fn temp_region(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("region-file-{}-{}", name, fastrand::u64(..)));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("r.0.0.0.vxr")
    }

    #[test]
    fn new_file_has_header_and_empty_table() {
        let path = temp_region("new");
        let region = RegionFile::open(&path, 3).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), PAYLOAD_START);
        assert_eq!(region.table(), &SeekTable::new());
        assert_eq!(region.payload_blocks().unwrap(), 0);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let path = temp_region("magic");
        std::fs::write(&path, b"NOTAREGIONFILE").unwrap();
        assert!(matches!(
            RegionFile::open(&path, 3),
            Err(StorageError::BadMagic { .. })
        ));
    }

    #[test]
    fn wrong_version_is_rejected() {
        let path = temp_region("version");
        drop(RegionFile::open(&path, 3).unwrap());
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[7..11].copy_from_slice(&7u32.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();
        assert!(matches!(
            RegionFile::open(&path, 3),
            Err(StorageError::UnsupportedVersion { found: 7, expected: 1 })
        ));
    }

    #[test]
    fn unwritten_slot_reads_none() {
        let path = temp_region("none");
        let mut region = RegionFile::open(&path, 3).unwrap();
        assert!(region.read_chunk(12).unwrap().is_none());
    }

    #[test]
    fn desynchronized_region_refuses_work() {
        let path = temp_region("desync");
        let mut region = RegionFile::open(&path, 3).unwrap();
        region.mark_desynchronized();
        let grid = BlockGrid::filled(Block::new(1));
        assert!(matches!(
            region.write_chunk(0, &grid),
            Err(StorageError::Desynchronized { .. })
        ));
        assert!(matches!(
            region.read_chunk(0),
            Err(StorageError::Desynchronized { .. })
        ));
    }

    #[test]
    fn overflowing_table_entry_is_corrupt() {
        let path = temp_region("overflow");
        drop(RegionFile::open(&path, 3).unwrap());

        let mut bytes = std::fs::read(&path).unwrap();
        let slot = REGION_HEADER_BYTES as usize;
        bytes[slot..slot + 8].copy_from_slice(&i64::MAX.to_le_bytes());
        bytes[slot + 8..slot + 12].copy_from_slice(&1i32.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();

        assert!(matches!(
            RegionFile::open(&path, 3),
            Err(StorageError::Corrupt(_))
        ));
    }

    #[test]
    fn block_positions_are_checked() {
        assert_eq!(block_position(0).unwrap(), PAYLOAD_START);
        assert_eq!(
            block_position(2).unwrap(),
            PAYLOAD_START + 2 * PAYLOAD_BLOCK_BYTES
        );
        assert!(matches!(block_position(-1), Err(StorageError::Corrupt(_))));
        assert!(matches!(
            block_position(i64::MAX),
            Err(StorageError::Corrupt(_))
        ));
    }
}
