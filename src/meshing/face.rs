use crate::voxels::block::block_side::BlockSide;
use crate::voxels::block::Block;

use super::vertex::PackedVertex;

/// A merged rectangle of coplanar faces, expressed in the plane of its side.
///
/// `layer` is the cell coordinate along the face normal; `(u0, v0)` and `(u1, v1)`
/// are the inclusive-exclusive corners of the rectangle along the in-plane axes
/// returned by [`plane_axes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quad {
    pub side: BlockSide,
    pub layer: usize,
    pub u0: usize,
    pub v0: usize,
    pub u1: usize,
    pub v1: usize,
    pub block: Block,
}

/// In-plane axes `(u, v)` for faces of `side`, as indices into `[x, y, z]`.
///
/// Faces are grown along `u` first. Side faces use `y` as `u` so that tall walls
/// merge along the contiguous column direction of the grid.
#[inline]
pub fn plane_axes(side: BlockSide) -> (usize, usize) {
    match side {
        BlockSide::LEFT | BlockSide::RIGHT => (1, 2),
        BlockSide::BOTTOM | BlockSide::TOP => (0, 2),
        BlockSide::BACK | BlockSide::FRONT => (1, 0),
    }
}

/// Converts plane coordinates back to chunk-relative `[x, y, z]`.
#[inline]
pub fn to_cell(side: BlockSide, layer: usize, u: usize, v: usize) -> [usize; 3] {
    let (u_axis, v_axis) = plane_axes(side);
    let mut cell = [0; 3];
    cell[side.axis()] = layer;
    cell[u_axis] = u;
    cell[v_axis] = v;
    cell
}

impl Quad {
    /// Appends the six vertex words of this quad to `out`.
    ///
    /// Corners are `p0 = (u0, v0)`, `p1 = (u1, v0)`, `p2 = (u1, v1)`, `p3 = (u0, v1)`.
    /// `(p0, p1, p2), (p0, p2, p3)` is counter-clockwise when seen from the outside
    /// for `RIGHT`, `BOTTOM` and `BACK`; the other three sides use the reverse order.
    pub fn emit(&self, out: &mut Vec<PackedVertex>) {
        let plane = if self.side.is_positive() {
            self.layer + 1
        } else {
            self.layer
        };

        let texture = self.block.block_type as u32;
        let damage = self.block.damage_stage() as u32;
        let light = self.side.light_level() as u32;

        let corner = |u: usize, v: usize| {
            let [x, y, z] = to_cell(self.side, plane, u, v);
            PackedVertex::new(
                x as u32, y as u32, z as u32, self.side, texture, damage, light,
            )
        };

        let p0 = corner(self.u0, self.v0);
        let p1 = corner(self.u1, self.v0);
        let p2 = corner(self.u1, self.v1);
        let p3 = corner(self.u0, self.v1);

        match self.side {
            BlockSide::RIGHT | BlockSide::BOTTOM | BlockSide::BACK => {
                out.extend_from_slice(&[p0, p1, p2, p0, p2, p3]);
            }
            BlockSide::LEFT | BlockSide::TOP | BlockSide::FRONT => {
                out.extend_from_slice(&[p0, p2, p1, p0, p3, p2]);
            }
        }
    }
}
