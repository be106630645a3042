//! Packed vertex words for chunk meshes.
//!
//! Every vertex is a single `u32`, handed to the GPU as-is:
//!
//! | bits    | field                                   |
//! |---------|-----------------------------------------|
//! | 0..6    | x (0..=32)                              |
//! | 6..12   | y (0..=32)                              |
//! | 12..18  | z (0..=32)                              |
//! | 18..21  | face tag ([`BlockSide`] discriminant)   |
//! | 21..27  | texture (low 6 bits of the block type)  |
//! | 27..29  | damage stage (0 = intact ..= 3)         |
//! | 29..32  | light level (0..=7)                     |
//!
//! Fields are packed and unpacked with shifts and masks only, so the layout does not
//! depend on struct layout or endianness of the host.

use num_traits::FromPrimitive;

use crate::voxels::block::block_side::BlockSide;

const POSITION_BITS: u32 = 6;
const POSITION_MASK: u32 = (1 << POSITION_BITS) - 1;

const X_SHIFT: u32 = 0;
const Y_SHIFT: u32 = 6;
const Z_SHIFT: u32 = 12;
const FACE_SHIFT: u32 = 18;
const FACE_MASK: u32 = 0b111;
const TEXTURE_SHIFT: u32 = 21;
/// Mask applied to block types before they are stored as a texture index.
pub const TEXTURE_MASK: u32 = 0x3F;
const DAMAGE_SHIFT: u32 = 27;
const DAMAGE_MASK: u32 = 0b11;
const LIGHT_SHIFT: u32 = 29;
const LIGHT_MASK: u32 = 0b111;

/// A single bit-packed vertex.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PackedVertex(pub u32);

impl PackedVertex {
    /// Packs a vertex. Values wider than their field are truncated to it.
    pub fn new(
        x: u32,
        y: u32,
        z: u32,
        side: BlockSide,
        texture: u32,
        damage: u32,
        light: u32,
    ) -> Self {
        PackedVertex(
            (x & POSITION_MASK) << X_SHIFT
                | (y & POSITION_MASK) << Y_SHIFT
                | (z & POSITION_MASK) << Z_SHIFT
                | (side as u32 & FACE_MASK) << FACE_SHIFT
                | (texture & TEXTURE_MASK) << TEXTURE_SHIFT
                | (damage & DAMAGE_MASK) << DAMAGE_SHIFT
                | (light & LIGHT_MASK) << LIGHT_SHIFT,
        )
    }

    #[inline]
    pub fn x(self) -> u32 {
        (self.0 >> X_SHIFT) & POSITION_MASK
    }

    #[inline]
    pub fn y(self) -> u32 {
        (self.0 >> Y_SHIFT) & POSITION_MASK
    }

    #[inline]
    pub fn z(self) -> u32 {
        (self.0 >> Z_SHIFT) & POSITION_MASK
    }

    /// Face the vertex belongs to; `None` only for words not produced by the mesher.
    #[inline]
    pub fn side(self) -> Option<BlockSide> {
        BlockSide::from_u32((self.0 >> FACE_SHIFT) & FACE_MASK)
    }

    #[inline]
    pub fn texture(self) -> u32 {
        (self.0 >> TEXTURE_SHIFT) & TEXTURE_MASK
    }

    #[inline]
    pub fn damage(self) -> u32 {
        (self.0 >> DAMAGE_SHIFT) & DAMAGE_MASK
    }

    #[inline]
    pub fn light(self) -> u32 {
        (self.0 >> LIGHT_SHIFT) & LIGHT_MASK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_do_not_overlap() {
        let vertex = PackedVertex::new(32, 17, 1, BlockSide::FRONT, 63, 3, 7);
        assert_eq!(vertex.x(), 32);
        assert_eq!(vertex.y(), 17);
        assert_eq!(vertex.z(), 1);
        assert_eq!(vertex.side(), Some(BlockSide::FRONT));
        assert_eq!(vertex.texture(), 63);
        assert_eq!(vertex.damage(), 3);
        assert_eq!(vertex.light(), 7);
    }

    #[test]
    fn texture_keeps_low_bits_only() {
        let vertex = PackedVertex::new(0, 0, 0, BlockSide::LEFT, 65, 0, 0);
        assert_eq!(vertex.texture(), 1);
        assert_eq!(vertex.damage(), 0);
    }

    #[test]
    fn top_bits_hold_light() {
        let vertex = PackedVertex::new(0, 0, 0, BlockSide::LEFT, 0, 0, 7);
        assert_eq!(vertex.0, 0b111 << 29);
    }
}
