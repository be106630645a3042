//! The seek table at the head of every region file.
//!
//! One entry per chunk slot: the first payload block of the chunk and the number of
//! blocks it spans. A never-written slot has `block_offset == -1` and
//! `block_count == 0`. The table is the only record of the payload layout.

use crate::error::{Result, StorageError};

use super::region_pos::REGION_CHUNK_COUNT;

/// Serialized size of one entry: `i64` offset plus `i32` count.
pub const SEEK_ENTRY_BYTES: usize = 12;
/// Serialized size of the whole table.
pub const SEEK_TABLE_BYTES: usize = REGION_CHUNK_COUNT * SEEK_ENTRY_BYTES;

/// Location of one chunk's payload, in payload blocks.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SeekEntry {
    pub block_offset: i64,
    pub block_count: i32,
}

impl SeekEntry {
    pub const UNWRITTEN: SeekEntry = SeekEntry {
        block_offset: -1,
        block_count: 0,
    };

    #[inline]
    pub fn is_written(&self) -> bool {
        self.block_offset >= 0
    }

    /// Exclusive end block of the span, saturating at `i64::MAX`.
    #[inline]
    pub fn end(&self) -> i64 {
        self.block_offset.saturating_add(self.block_count as i64)
    }
}

/// All entries of a region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeekTable {
    entries: Vec<SeekEntry>,
}

impl Default for SeekTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SeekTable {
    /// A table with every slot unwritten.
    pub fn new() -> Self {
        SeekTable {
            entries: vec![SeekEntry::UNWRITTEN; REGION_CHUNK_COUNT],
        }
    }

    #[inline]
    pub fn get(&self, slot: usize) -> SeekEntry {
        self.entries[slot]
    }

    #[inline]
    pub fn set(&mut self, slot: usize, entry: SeekEntry) {
        self.entries[slot] = entry;
    }

    pub fn entries(&self) -> &[SeekEntry] {
        &self.entries
    }

    /// Moves every span that starts after `after` by `delta` blocks.
    pub fn shift_after(&mut self, after: i64, delta: i64) {
        for entry in self.entries.iter_mut() {
            if entry.is_written() && entry.block_offset > after {
                entry.block_offset += delta;
            }
        }
    }

    /// Number of payload blocks in use.
    pub fn total_blocks(&self) -> i64 {
        self.entries
            .iter()
            .filter(|entry| entry.is_written())
            .map(|entry| entry.block_count as i64)
            .sum()
    }

    /// End of the highest span, 0 for an empty table.
    pub fn payload_end(&self) -> i64 {
        self.entries
            .iter()
            .filter(|entry| entry.is_written())
            .map(SeekEntry::end)
            .max()
            .unwrap_or(0)
    }

    /// Written spans sorted by offset, with their slot numbers.
    pub fn spans(&self) -> Vec<(usize, SeekEntry)> {
        let mut spans: Vec<_> = self
            .entries
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, entry)| entry.is_written())
            .collect();
        spans.sort_by_key(|(_, entry)| entry.block_offset);
        spans
    }

    /// Checks that written spans are well formed, lie inside `payload_blocks` and
    /// do not overlap.
    pub fn validate(&self, payload_blocks: i64) -> Result<()> {
        for (slot, entry) in self.entries.iter().enumerate() {
            if entry.is_written() {
                if entry.block_count <= 0 {
                    return Err(StorageError::Corrupt(format!(
                        "slot {slot} has block count {}",
                        entry.block_count
                    )));
                }
                if entry.block_offset > payload_blocks
                    || entry.block_count as i64 > payload_blocks - entry.block_offset
                {
                    return Err(StorageError::Corrupt(format!(
                        "slot {slot} spans blocks {}+{} past the payload ({payload_blocks} blocks)",
                        entry.block_offset, entry.block_count
                    )));
                }
            } else if entry.block_offset != -1 || entry.block_count != 0 {
                return Err(StorageError::Corrupt(format!(
                    "slot {slot} has invalid entry {entry:?}"
                )));
            }
        }

        let spans = self.spans();
        for pair in spans.windows(2) {
            let (first_slot, first) = pair[0];
            let (second_slot, second) = pair[1];
            if first.end() > second.block_offset {
                return Err(StorageError::Corrupt(format!(
                    "slots {first_slot} and {second_slot} overlap"
                )));
            }
        }
        Ok(())
    }

    /// Little-endian serialization.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SEEK_TABLE_BYTES);
        for entry in &self.entries {
            out.extend_from_slice(&entry.block_offset.to_le_bytes());
            out.extend_from_slice(&entry.block_count.to_le_bytes());
        }
        out
    }

    /// Parses a table written by [`SeekTable::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < SEEK_TABLE_BYTES {
            return Err(StorageError::ShortRead {
                needed: SEEK_TABLE_BYTES,
                available: bytes.len(),
            });
        }

        let entries = bytes[..SEEK_TABLE_BYTES]
            .chunks_exact(SEEK_ENTRY_BYTES)
            .map(|raw| {
                let mut offset = [0u8; 8];
                let mut count = [0u8; 4];
                offset.copy_from_slice(&raw[..8]);
                count.copy_from_slice(&raw[8..]);
                SeekEntry {
                    block_offset: i64::from_le_bytes(offset),
                    block_count: i32::from_le_bytes(count),
                }
            })
            .collect();

        Ok(SeekTable { entries })
    }
}
