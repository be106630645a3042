//! # Block Module
//!
//! The block record stored in every grid cell, and the six face directions used by
//! the mesher and the chunk grid.

pub mod block_side;

/// The underlying integer type used to represent block types in memory and on disk.
pub type BlockTypeSize = u16;

/// Block type id reserved for empty space.
pub const AIR: BlockTypeSize = 0;

/// Health value given to newly created and freshly loaded blocks.
pub const FULL_HEALTH: u8 = u8::MAX;

/// A single voxel: a type id plus a health byte.
///
/// Two blocks are equal only if both the type and the health match. The mesher
/// relies on this when deciding whether neighbouring faces can share a quad,
/// so a damaged block never merges with an intact one.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Block {
    /// Type id, `AIR` for empty cells.
    pub block_type: BlockTypeSize,
    /// Remaining health, `FULL_HEALTH` when undamaged.
    pub health: u8,
}

impl Block {
    /// The empty block.
    pub const EMPTY: Block = Block {
        block_type: AIR,
        health: 0,
    };

    /// Creates an undamaged block of the given type.
    pub fn new(block_type: BlockTypeSize) -> Self {
        Block {
            block_type,
            health: FULL_HEALTH,
        }
    }

    /// Creates a block with an explicit health value.
    pub fn with_health(block_type: BlockTypeSize, health: u8) -> Self {
        Block { block_type, health }
    }

    /// Returns `true` for air.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.block_type == AIR
    }

    /// Coarse damage stage in `0..=3`, 0 being intact.
    #[inline]
    pub fn damage_stage(&self) -> u8 {
        (FULL_HEALTH - self.health) >> 6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_uses_health() {
        assert_eq!(Block::new(3), Block::with_health(3, FULL_HEALTH));
        assert_ne!(Block::new(3), Block::with_health(3, 10));
    }

    #[test]
    fn damage_stages() {
        assert_eq!(Block::new(1).damage_stage(), 0);
        assert_eq!(Block::with_health(1, 128).damage_stage(), 1);
        assert_eq!(Block::with_health(1, 0).damage_stage(), 3);
    }
}
