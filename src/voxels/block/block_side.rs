//! # Block Side Module
//!
//! The six faces of a voxel. The discriminants double as the face tag stored in
//! packed vertex words and as the index into neighbour arrays, in the order
//! `-X, +X, -Y, +Y, -Z, +Z`.

use cgmath::Vector3;
use num_derive::FromPrimitive;

/// One of the six axis-aligned directions a block face can point in.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug, FromPrimitive)]
pub enum BlockSide {
    /// Facing negative X
    LEFT = 0,
    /// Facing positive X
    RIGHT = 1,
    /// Facing negative Y
    BOTTOM = 2,
    /// Facing positive Y
    TOP = 3,
    /// Facing negative Z
    BACK = 4,
    /// Facing positive Z
    FRONT = 5,
}

impl BlockSide {
    /// All six sides in tag order.
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::LEFT,
            BlockSide::RIGHT,
            BlockSide::BOTTOM,
            BlockSide::TOP,
            BlockSide::BACK,
            BlockSide::FRONT,
        ]
    }

    /// Axis the face is perpendicular to: 0 = X, 1 = Y, 2 = Z.
    #[inline]
    pub fn axis(self) -> usize {
        self as usize / 2
    }

    /// `true` if the face points along the positive direction of its axis.
    #[inline]
    pub fn is_positive(self) -> bool {
        self as usize % 2 == 1
    }

    /// The face on the other side of the same plane.
    pub fn opposite(self) -> BlockSide {
        match self {
            BlockSide::LEFT => BlockSide::RIGHT,
            BlockSide::RIGHT => BlockSide::LEFT,
            BlockSide::BOTTOM => BlockSide::TOP,
            BlockSide::TOP => BlockSide::BOTTOM,
            BlockSide::BACK => BlockSide::FRONT,
            BlockSide::FRONT => BlockSide::BACK,
        }
    }

    /// Unit step towards the neighbouring cell behind this face.
    pub fn offset(self) -> Vector3<i32> {
        match self {
            BlockSide::LEFT => Vector3::new(-1, 0, 0),
            BlockSide::RIGHT => Vector3::new(1, 0, 0),
            BlockSide::BOTTOM => Vector3::new(0, -1, 0),
            BlockSide::TOP => Vector3::new(0, 1, 0),
            BlockSide::BACK => Vector3::new(0, 0, -1),
            BlockSide::FRONT => Vector3::new(0, 0, 1),
        }
    }

    /// Directional shade baked into the light bits of a vertex (0..=7).
    pub fn light_level(self) -> u8 {
        match self {
            BlockSide::TOP => 7,
            BlockSide::LEFT | BlockSide::RIGHT => 5,
            BlockSide::BACK | BlockSide::FRONT => 6,
            BlockSide::BOTTOM => 3,
        }
    }
}
